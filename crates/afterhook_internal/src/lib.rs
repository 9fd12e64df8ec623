//! # afterhook Internal Library
//!
//! Re-exports the core afterhook crates for convenience.

/// Layer 1: Service registry and plugin lifecycle.
pub use afterhook_system;

/// Layer 1: Clock and logging plugins.
pub use afterhook_core_plugins;

/// Layer 2: Hook metadata and dispatch.
pub use afterhook_dispatch;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use afterhook_core_plugins::{
        Clock, ClockProvider, DefaultPlugins, MinimalPlugins, Stopwatch, TimePlugin, TracingFormat,
        TracingPlugin,
    };
    pub use afterhook_dispatch::prelude::*;
    pub use afterhook_system::prelude::*;
}
