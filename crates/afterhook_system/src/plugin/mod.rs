//! Plugin system for extensible server functionality.
//!
//! Everything a server knows about comes from a plugin: the hook metadata
//! store, runtime settings, logging, the clock, and every declaration of a
//! hooked operation. A plugin's `build()` is the explicit registration pass
//! that replaces scanning annotations at runtime.
//!
//! # Example
//!
//! ```
//! use afterhook_system::plugin::{Plugin, PluginId};
//! use afterhook_system::server::Server;
//!
//! struct LedgerPlugin;
//! impl Plugin for LedgerPlugin {
//!     fn build(&self, _server: &mut Server) {}
//! }
//!
//! struct AuditSink { target: String }
//!
//! struct AuditPlugin { target: String }
//!
//! impl Plugin for AuditPlugin {
//!     fn build(&self, server: &mut Server) {
//!         server.insert_service(AuditSink { target: self.target.clone() });
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<LedgerPlugin>()]
//!     }
//! }
//!
//! Server::new()
//!     .add_plugins(LedgerPlugin)
//!     .add_plugins(AuditPlugin { target: "audit.log".into() })
//!     .finish();
//! ```

mod group;

pub use group::{PluginGroup, PluginGroupBuilder};

use core::any::TypeId;

use crate::server::Server;

/// Unique identifier for a plugin type.
///
/// Used for dependency resolution and duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId {
    type_id: TypeId,
    type_name: &'static str,
}

impl PluginId {
    /// Creates a `PluginId` for the given plugin type.
    #[must_use]
    pub fn of<P: Plugin>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: core::any::type_name::<P>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A unit of registration that extends a server.
///
/// The server drives every plugin through the same lifecycle:
///
/// 1. **Build** - `build()` in dependency order
/// 2. **Ready** - `ready()` in dependency order, once everything is built
/// 3. **Cleanup** - `cleanup()` in reverse dependency order
///
/// Hook declarations belong in `build()`; validation that needs every other
/// plugin's registrations belongs in `ready()`.
pub trait Plugin: Send + Sync + 'static {
    /// Registers services, APIs and declarations. Called once.
    fn build(&self, server: &mut Server);

    /// Called after all plugins have been built.
    fn ready(&self, _server: &mut Server) {}

    /// Called when the server is shutting down, in reverse dependency order.
    fn cleanup(&self, _server: &mut Server) {}

    /// Returns the plugin's name for debugging and error messages.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Declares plugins that must be built before this one.
    ///
    /// The server panics in `finish()` if a dependency was never added.
    fn dependencies(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Returns true if this plugin can only be added once (the default).
    fn is_unique(&self) -> bool {
        true
    }
}

/// Types accepted by [`Server::add_plugins`]: single plugins and groups.
pub trait Plugins {
    /// Adds these plugins to the server.
    fn add_to_server(self, server: &mut Server);
}

impl<P: Plugin> Plugins for P {
    fn add_to_server(self, server: &mut Server) {
        // Capture the id while the concrete type is still known
        server.add_plugin_boxed(PluginId::of::<P>(), Box::new(self));
    }
}

impl Plugins for PluginGroupBuilder {
    fn add_to_server(self, server: &mut Server) {
        for (id, plugin) in self.into_entries() {
            server.add_plugin_boxed(id, plugin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Metadata;
    impl Plugin for Metadata {
        fn build(&self, _server: &mut Server) {}
    }

    struct CheckoutHooks;
    impl Plugin for CheckoutHooks {
        fn build(&self, _server: &mut Server) {}
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<Metadata>()]
        }
        fn is_unique(&self) -> bool {
            false
        }
    }

    #[test]
    fn ids_are_per_type() {
        assert_eq!(PluginId::of::<Metadata>(), PluginId::of::<Metadata>());
        assert_ne!(PluginId::of::<Metadata>(), PluginId::of::<CheckoutHooks>());
        assert_eq!(PluginId::of::<Metadata>().type_id(), TypeId::of::<Metadata>());
    }

    #[test]
    fn defaults_name_the_type_and_stand_alone() {
        assert!(Metadata.name().ends_with("Metadata"));
        assert!(Metadata.is_unique());
        assert!(Metadata.dependencies().is_empty());
    }

    #[test]
    fn declaring_plugins_name_their_store() {
        let deps = CheckoutHooks.dependencies();
        assert_eq!(deps, [PluginId::of::<Metadata>()]);
        assert!(deps[0].type_name().ends_with("Metadata"));
        assert!(!CheckoutHooks.is_unique());
    }
}
