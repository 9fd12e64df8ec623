//! Runtime configuration for hook dispatch.
//!
//! [`HookSettings`] is a global service inserted by
//! [`HooksPlugin`](crate::plugin::HooksPlugin). It can be built in code,
//! parsed from JSON, or read from the environment:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `AFTERHOOK_ENV` | `production` or `prod` enables production mode |
//! | `AFTERHOOK_HOOK_TIMEOUT_MS` | Per-handler timeout in milliseconds |
//! | `AFTERHOOK_ERROR_POLICY` | One of the [`ErrorPolicy`] names in snake case |

use core::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

const ENV_VAR: &str = "AFTERHOOK_ENV";
const TIMEOUT_VAR: &str = "AFTERHOOK_HOOK_TIMEOUT_MS";
const POLICY_VAR: &str = "AFTERHOOK_ERROR_POLICY";

/// What dispatch does when a binding without its own continue-on-error flag
/// fails.
///
/// A binding's explicit flag always wins: `true` continues and `false`
/// aborts, whatever the policy says.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the failure and run the next binding.
    #[default]
    ContinueWithNextHook,
    /// Abort the dispatch with [`DispatchError::Aborted`](crate::error::DispatchError::Aborted).
    StopExecutingHooks,
    /// Run every binding, then report all failures with
    /// [`DispatchError::Deferred`](crate::error::DispatchError::Deferred).
    RethrowAfterAllHooks,
}

/// The action dispatch takes after a binding fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureAction {
    Continue,
    Abort,
    Defer,
}

impl ErrorPolicy {
    /// Combines a binding's explicit flag with this policy.
    pub(crate) fn resolve(self, continue_on_error: Option<bool>) -> FailureAction {
        match (continue_on_error, self) {
            (Some(true), _) | (None, Self::ContinueWithNextHook) => FailureAction::Continue,
            (Some(false), _) | (None, Self::StopExecutingHooks) => FailureAction::Abort,
            (None, Self::RethrowAfterAllHooks) => FailureAction::Defer,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::ContinueWithNextHook => "continue_with_next_hook",
            Self::StopExecutingHooks => "stop_executing_hooks",
            Self::RethrowAfterAllHooks => "rethrow_after_all_hooks",
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::ContinueWithNextHook,
            Self::StopExecutingHooks,
            Self::RethrowAfterAllHooks,
        ]
        .into_iter()
        .find(|policy| policy.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| SettingsError::UnknownPolicy(s.to_string()))
    }
}

/// Configuration consumed by the dispatcher and binder.
///
/// ```
/// use afterhook_dispatch::settings::{ErrorPolicy, HookSettings};
///
/// let settings = HookSettings::from_json(
///     r#"{ "production": true, "hook_timeout_ms": 250 }"#,
/// ).unwrap();
///
/// assert!(settings.production);
/// assert_eq!(settings.hook_timeout, Some(std::time::Duration::from_millis(250)));
/// assert_eq!(settings.default_error_policy, ErrorPolicy::ContinueWithNextHook);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSettings {
    /// Construct handler instances that are not registered as services.
    pub auto_create_handlers: bool,
    /// Bind handler parameters from registered services.
    pub auto_resolve_parameters: bool,
    /// Production mode; honors skip-in-production markers.
    pub production: bool,
    /// Upper bound on each handler invocation.
    ///
    /// Enforced with `tokio::time`, so dispatch must run inside a tokio
    /// runtime with the time driver enabled. Under any other executor, such
    /// as `futures::executor::block_on`, a set timeout panics with "no
    /// reactor running". A member that blocks without yielding is still
    /// reported as timed out once it returns.
    #[serde(rename = "hook_timeout_ms", with = "timeout_ms")]
    pub hook_timeout: Option<Duration>,
    /// Fallback for bindings without an explicit continue-on-error flag.
    pub default_error_policy: ErrorPolicy,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            auto_create_handlers: true,
            auto_resolve_parameters: true,
            production: false,
            hook_timeout: None,
            default_error_policy: ErrorPolicy::default(),
        }
    }
}

impl HookSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Reads settings through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(env) = lookup(ENV_VAR) {
            let env = env.trim();
            settings.production =
                env.eq_ignore_ascii_case("production") || env.eq_ignore_ascii_case("prod");
        }

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|source| SettingsError::InvalidTimeout {
                    variable: TIMEOUT_VAR,
                    value: raw.clone(),
                    source,
                })?;
            settings.hook_timeout = Some(Duration::from_millis(millis));
        }

        if let Some(raw) = lookup(POLICY_VAR) {
            settings.default_error_policy = raw.parse()?;
        }

        Ok(settings)
    }
}

mod timeout_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        timeout: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match timeout {
            Some(limit) => {
                serializer.serialize_some(&u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_behavior() {
        let settings = HookSettings::default();
        assert!(settings.auto_create_handlers);
        assert!(settings.auto_resolve_parameters);
        assert!(!settings.production);
        assert!(settings.hook_timeout.is_none());
        assert_eq!(settings.default_error_policy, ErrorPolicy::ContinueWithNextHook);
    }

    #[test]
    fn per_binding_flag_overrides_policy() {
        for policy in [
            ErrorPolicy::ContinueWithNextHook,
            ErrorPolicy::StopExecutingHooks,
            ErrorPolicy::RethrowAfterAllHooks,
        ] {
            assert_eq!(policy.resolve(Some(true)), FailureAction::Continue);
            assert_eq!(policy.resolve(Some(false)), FailureAction::Abort);
        }
    }

    #[test]
    fn policy_applies_without_flag() {
        assert_eq!(
            ErrorPolicy::ContinueWithNextHook.resolve(None),
            FailureAction::Continue
        );
        assert_eq!(ErrorPolicy::StopExecutingHooks.resolve(None), FailureAction::Abort);
        assert_eq!(
            ErrorPolicy::RethrowAfterAllHooks.resolve(None),
            FailureAction::Defer
        );
    }

    #[test]
    fn json_round_trip_uses_snake_case() {
        let settings = HookSettings {
            hook_timeout: Some(Duration::from_millis(1500)),
            default_error_policy: ErrorPolicy::RethrowAfterAllHooks,
            ..HookSettings::default()
        };

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["hook_timeout_ms"], 1500);
        assert_eq!(json["default_error_policy"], "rethrow_after_all_hooks");

        let back = HookSettings::from_json(&json.to_string()).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = HookSettings::from_json(r#"{ "production": "yes" }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn env_vars_configure_settings() {
        let settings = HookSettings::from_vars(vars(&[
            ("AFTERHOOK_ENV", "Prod"),
            ("AFTERHOOK_HOOK_TIMEOUT_MS", " 75 "),
            ("AFTERHOOK_ERROR_POLICY", "stop_executing_hooks"),
        ]))
        .unwrap();

        assert!(settings.production);
        assert_eq!(settings.hook_timeout, Some(Duration::from_millis(75)));
        assert_eq!(settings.default_error_policy, ErrorPolicy::StopExecutingHooks);

        let staging = HookSettings::from_vars(vars(&[("AFTERHOOK_ENV", "staging")])).unwrap();
        assert!(!staging.production);
    }

    #[test]
    fn bad_env_values_are_errors() {
        let err = HookSettings::from_vars(vars(&[("AFTERHOOK_HOOK_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidTimeout { .. }));

        let err =
            HookSettings::from_vars(vars(&[("AFTERHOOK_ERROR_POLICY", "retry")])).unwrap_err();
        assert!(matches!(err, SettingsError::UnknownPolicy(_)));
    }
}
