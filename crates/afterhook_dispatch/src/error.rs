//! Error types for hook registration and dispatch.
//!
//! Failures of the intercepted operation itself never appear here. They are
//! recorded in the [`ExecutionRecord`](crate::record::ExecutionRecord) and
//! handed back to the caller as-is.

use std::time::Duration;

use crate::metadata::HandlerRef;
use crate::record::OperationId;

/// Boxed error returned by user-supplied handlers and guards.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// Broad category of a [`HookError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookErrorKind {
    /// The handler type, member, or instance could not be found.
    Resolution,
    /// The guard was missing or failed while evaluating.
    Guard,
    /// The handler failed, panicked, or timed out.
    Invocation,
}

/// Why one binding failed.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// No handler type with this name is registered.
    #[error("handler type `{type_name}` is not registered")]
    UnknownHandlerType {
        /// The requested type name.
        type_name: String,
    },

    /// The handler type has no member with this name.
    #[error("handler type `{type_name}` has no member `{member}`")]
    UnknownMember {
        /// The handler type name.
        type_name: String,
        /// The requested member.
        member: String,
    },

    /// No instance is registered and none could be constructed.
    #[error("no instance of `{type_name}` is available (auto-create enabled: {auto_create})")]
    MissingInstance {
        /// The handler type name.
        type_name: String,
        /// Whether auto-creation was attempted.
        auto_create: bool,
    },

    /// The operation names a guard its declaring type does not register.
    #[error("guard `{name}` is not registered on `{declaring_type}`")]
    UnknownGuard {
        /// The operation's declaring type.
        declaring_type: String,
        /// The guard name.
        name: String,
    },

    /// The guard returned an error or panicked.
    #[error("guard `{name}` failed: {source}")]
    Guard {
        /// The guard name.
        name: String,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// The handler returned an error.
    #[error("handler `{handler}` failed: {source}")]
    Invocation {
        /// The failing handler.
        handler: HandlerRef,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// The handler panicked.
    #[error("handler `{handler}` panicked: {message}")]
    Panicked {
        /// The failing handler.
        handler: HandlerRef,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// The handler did not finish within the configured timeout.
    #[error("handler `{handler}` timed out after {timeout:?}")]
    Timeout {
        /// The slow handler.
        handler: HandlerRef,
        /// The configured limit.
        timeout: Duration,
    },
}

impl HookError {
    /// Returns the broad category of this error.
    #[must_use]
    pub fn kind(&self) -> HookErrorKind {
        match self {
            Self::UnknownHandlerType { .. }
            | Self::UnknownMember { .. }
            | Self::MissingInstance { .. } => HookErrorKind::Resolution,
            Self::UnknownGuard { .. } | Self::Guard { .. } => HookErrorKind::Guard,
            Self::Invocation { .. } | Self::Panicked { .. } | Self::Timeout { .. } => {
                HookErrorKind::Invocation
            }
        }
    }
}

/// A binding failure that dispatch continued past.
#[derive(Debug, thiserror::Error)]
#[error("hook `{handler}` (order {order}) failed: {error}")]
pub struct HookFailure {
    /// The binding's handler.
    pub handler: HandlerRef,
    /// The binding's order key.
    pub order: i32,
    /// What went wrong.
    #[source]
    pub error: HookError,
}

/// Dispatch-level error surfaced past the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A binding that must not fail did; later bindings were not run.
    #[error("dispatch for `{operation}` aborted by `{handler}`: {source}")]
    Aborted {
        /// The hooked operation.
        operation: OperationId,
        /// The binding that aborted dispatch.
        handler: HandlerRef,
        /// The binding's failure.
        #[source]
        source: HookError,
    },

    /// Every binding ran, and at least one failure must be re-raised.
    #[error("{} hook(s) failed during dispatch for `{operation}`", .failures.len())]
    Deferred {
        /// The hooked operation.
        operation: OperationId,
        /// Every failure recorded during the dispatch.
        failures: Vec<HookFailure>,
    },
}

/// Errors that can occur while declaring hook metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookRegistrationError {
    /// The operation already has a declaration.
    #[error("operation `{0}` already has hooks declared")]
    DuplicateOperation(OperationId),

    /// A handler type with this name is already registered.
    #[error("handler type `{0}` is already registered")]
    DuplicateHandler(String),

    /// A handler type declares the same member twice.
    #[error("handler type `{type_name}` declares member `{member}` more than once")]
    DuplicateMember {
        /// The handler type name.
        type_name: String,
        /// The repeated member.
        member: String,
    },

    /// The declaring type already registers a guard with this name.
    #[error("guard `{name}` is already registered on `{declaring_type}`")]
    DuplicateGuard {
        /// The declaring type.
        declaring_type: String,
        /// The guard name.
        name: String,
    },
}

/// Errors that can occur while loading [`HookSettings`](crate::settings::HookSettings).
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The JSON document could not be parsed.
    #[error("invalid hook settings: {0}")]
    Json(#[from] serde_json::Error),

    /// A timeout variable was not a whole number of milliseconds.
    #[error("invalid value `{value}` for {variable}")]
    InvalidTimeout {
        /// The environment variable.
        variable: &'static str,
        /// The rejected value.
        value: String,
        /// The parse failure.
        #[source]
        source: core::num::ParseIntError,
    },

    /// An error policy name was not recognized.
    #[error("unknown error policy `{0}`")]
    UnknownPolicy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> HandlerRef {
        HandlerRef::new("AuditHooks", "record")
    }

    #[test]
    fn kinds_group_variants() {
        let resolution = HookError::UnknownMember {
            type_name: "AuditHooks".into(),
            member: "nope".into(),
        };
        let guard = HookError::Guard {
            name: "enabled".into(),
            source: "flag store offline".into(),
        };
        let timeout = HookError::Timeout {
            handler: handler(),
            timeout: Duration::from_millis(50),
        };

        assert_eq!(resolution.kind(), HookErrorKind::Resolution);
        assert_eq!(guard.kind(), HookErrorKind::Guard);
        assert_eq!(timeout.kind(), HookErrorKind::Invocation);
    }

    #[test]
    fn messages_identify_handler_and_operation() {
        let error = DispatchError::Aborted {
            operation: OperationId::new("Calculator", "add"),
            handler: handler(),
            source: HookError::Invocation {
                handler: handler(),
                source: "log failed".into(),
            },
        };
        let text = error.to_string();
        assert!(text.contains("Calculator::add"));
        assert!(text.contains("AuditHooks::record"));
        assert!(text.contains("log failed"));

        let deferred = DispatchError::Deferred {
            operation: OperationId::new("Calculator", "add"),
            failures: Vec::new(),
        };
        assert_eq!(
            deferred.to_string(),
            "0 hook(s) failed during dispatch for `Calculator::add`"
        );
    }
}
