//! Core infrastructure plugins for afterhook.
//!
//! - [`TimePlugin`] - The [`Clock`] service used to time invocations
//! - [`TracingPlugin`] - Logging via the `tracing` crate
//! - [`DefaultPlugins`] - Both of the above
//! - [`MinimalPlugins`] - Time only, for tests that want quiet output
//!
//! # Feature Flags
//!
//! - `test-utils` - Enables [`MockClock`] for deterministic durations
//!
//! # Example
//!
//! ```
//! use afterhook_core_plugins::{TimePlugin, TracingPlugin};
//! use afterhook_system::server::Server;
//! use tracing::Level;
//!
//! let mut server = Server::new();
//! server
//!     .add_plugins(TimePlugin::default())
//!     .add_plugins(TracingPlugin::default().with_level(Level::DEBUG));
//! server.finish();
//! ```

mod time;
mod tracing_plugin;

pub use time::{Clock, ClockProvider, Stopwatch, TimePlugin};
pub use tracing_plugin::{TracingConfig, TracingFormat, TracingPlugin};

#[cfg(any(test, feature = "test-utils"))]
pub use time::MockClock;

use afterhook_system::plugin::{PluginGroup, PluginGroupBuilder};

/// Default plugins for most applications: time and logging.
///
/// ```ignore
/// Server::new()
///     .add_plugins(DefaultPlugins.build().disable::<TracingPlugin>())
///     .finish();
/// ```
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(TimePlugin::default())
            .add(TracingPlugin::default())
    }
}

/// Time only. Installs no subscriber.
pub struct MinimalPlugins;

impl PluginGroup for MinimalPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new().add(TimePlugin::default())
    }
}
