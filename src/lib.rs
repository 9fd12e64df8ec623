//! Post-execution hooks for Rust services.
//!

pub use afterhook_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use afterhook_internal::prelude::*;
}
