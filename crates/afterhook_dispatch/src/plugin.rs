//! Provides the [`HooksAPI`] and the [`HookSettings`] global service.

use std::time::Duration;

use afterhook_system::plugin::Plugin;
use afterhook_system::server::Server;

use crate::api::HooksAPI;
use crate::error::SettingsError;
use crate::settings::{ErrorPolicy, HookSettings};

/// Plugin that sets up hook dispatch for a server.
///
/// # Lifecycle
///
/// 1. **`build()`**: inserts an empty [`HooksAPI`] (unless another plugin
///    already did) and the [`HookSettings`] service. Plugins that declare
///    hooks list `HooksPlugin` as a dependency and register during their own
///    `build()`.
/// 2. **`ready()`**: every plugin has registered, so bindings whose handler
///    type or member was never registered are reported. They are not fatal;
///    dispatch fails those bindings under the usual error policy.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use afterhook_dispatch::plugin::HooksPlugin;
/// use afterhook_dispatch::settings::{ErrorPolicy, HookSettings};
/// use afterhook_system::server::Server;
///
/// let mut server = Server::new();
/// server.add_plugins(
///     HooksPlugin::default()
///         .hook_timeout(Duration::from_secs(2))
///         .default_error_policy(ErrorPolicy::RethrowAfterAllHooks),
/// );
/// server.finish();
///
/// let settings = server.get_service::<HookSettings>().unwrap();
/// assert_eq!(settings.hook_timeout, Some(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct HooksPlugin {
    settings: HookSettings,
}

impl HooksPlugin {
    /// Creates the plugin with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the plugin with settings read from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self::with_settings(HookSettings::from_env()?))
    }

    /// Creates the plugin with the given settings.
    #[must_use]
    pub fn with_settings(settings: HookSettings) -> Self {
        Self { settings }
    }

    /// Sets production mode.
    #[must_use]
    pub fn production(mut self, production: bool) -> Self {
        self.settings.production = production;
        self
    }

    /// Bounds every handler invocation.
    ///
    /// Requires a tokio runtime with the time driver; see
    /// [`HookSettings::hook_timeout`].
    #[must_use]
    pub fn hook_timeout(mut self, timeout: Duration) -> Self {
        self.settings.hook_timeout = Some(timeout);
        self
    }

    /// Enables or disables constructing unregistered handler instances.
    #[must_use]
    pub fn auto_create_handlers(mut self, enabled: bool) -> Self {
        self.settings.auto_create_handlers = enabled;
        self
    }

    /// Enables or disables binding parameters from services.
    #[must_use]
    pub fn auto_resolve_parameters(mut self, enabled: bool) -> Self {
        self.settings.auto_resolve_parameters = enabled;
        self
    }

    /// Sets the fallback policy for bindings without a continue-on-error flag.
    #[must_use]
    pub fn default_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.settings.default_error_policy = policy;
        self
    }

    /// Returns the settings this plugin installs.
    #[must_use]
    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }
}

impl Plugin for HooksPlugin {
    fn build(&self, server: &mut Server) {
        if !server.contains_api::<HooksAPI>() {
            server.insert_api(HooksAPI::new());
        }
        server.insert_service(self.settings.clone());
    }

    fn ready(&self, server: &mut Server) {
        let Some(hooks) = server.api::<HooksAPI>() else {
            return;
        };

        for (operation, handler) in hooks.unresolved_bindings() {
            tracing::warn!(
                operation = %operation,
                handler = %handler,
                "hook binding targets an unregistered handler"
            );
        }

        tracing::debug!(
            operations = hooks.operation_count(),
            production = self.settings.production,
            policy = ?self.settings.default_error_policy,
            "hooks ready"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{HandlerRef, HookBinding, OperationHooks};
    use crate::record::OperationId;
    use afterhook_system::plugin::PluginId;

    struct Shop;

    struct ShopHooks;

    impl Plugin for ShopHooks {
        fn build(&self, server: &mut Server) {
            server
                .api::<HooksAPI>()
                .expect("HooksPlugin builds first")
                .declare(
                    OperationHooks::new(OperationId::of::<Shop>("checkout"))
                        .hook(HookBinding::new(HandlerRef::new("Missing", "audit"))),
                )
                .expect("declared once");
        }

        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<HooksPlugin>()]
        }
    }

    #[test]
    fn build_inserts_api_and_settings() {
        let mut server = Server::new();
        server.add_plugins(
            HooksPlugin::new()
                .production(true)
                .auto_create_handlers(false)
                .auto_resolve_parameters(false)
                .default_error_policy(ErrorPolicy::StopExecutingHooks),
        );
        server.finish();

        assert!(server.contains_api::<HooksAPI>());
        let settings = server.get_service::<HookSettings>().expect("inserted");
        assert!(settings.production);
        assert!(!settings.auto_create_handlers);
        assert!(!settings.auto_resolve_parameters);
        assert_eq!(settings.default_error_policy, ErrorPolicy::StopExecutingHooks);
    }

    #[test]
    fn keeps_an_existing_api() {
        let mut server = Server::new();
        let existing = HooksAPI::new();
        existing
            .declare(OperationHooks::new(OperationId::of::<Shop>("refund")))
            .expect("declared once");
        server.insert_api(existing);

        server.add_plugins(HooksPlugin::default());
        server.finish();

        let hooks = server.api::<HooksAPI>().expect("present");
        assert!(hooks.contains_operation(&OperationId::of::<Shop>("refund")));
    }

    #[test]
    fn unresolved_bindings_do_not_fail_ready() {
        let mut server = Server::new();
        server.add_plugins(ShopHooks).add_plugins(HooksPlugin::default());
        server.finish();

        let hooks = server.api::<HooksAPI>().expect("present");
        assert_eq!(hooks.unresolved_bindings().len(), 1);
    }
}
