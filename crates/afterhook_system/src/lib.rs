//! The foundational layer of afterhook (Layer 1).
//!
//! `afterhook_system` provides the runtime primitives the hook engine is
//! assembled from:
//!
//! - [`api`] - API trait for build-time capability registries
//! - [`plugin`] - Plugin trait for extensible functionality
//! - [`service`] - Typed service registry (capability lookup by type token)
//! - [`server`] - Server runtime for plugin orchestration
//!
//! # Architecture
//!
//! - **Layer 1** (`afterhook_system`, `afterhook_core_plugins`): registry,
//!   plugins, logging and time infrastructure (this crate)
//! - **Layer 2** (`afterhook_dispatch`): execution records, hook metadata and
//!   the dispatch engine
//!
//! # Example
//!
//! ```
//! use afterhook_system::plugin::Plugin;
//! use afterhook_system::server::Server;
//!
//! #[derive(Default)]
//! struct AuditSink { prefix: String }
//!
//! struct AuditPlugin;
//!
//! impl Plugin for AuditPlugin {
//!     fn build(&self, server: &mut Server) {
//!         server.insert_service(AuditSink::default());
//!     }
//! }
//!
//! let mut server = Server::new();
//! server.add_plugins(AuditPlugin);
//! server.finish();
//! assert!(server.contains_service::<AuditSink>());
//! ```

/// API trait for capability registration.
pub mod api;

/// Plugin trait for extensible functionality.
pub mod plugin;

/// Server runtime for plugin orchestration.
pub mod server;

/// Typed service registry.
pub mod service;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::api::*;
    pub use crate::plugin::*;
    pub use crate::server::*;
    pub use crate::service::*;
}
