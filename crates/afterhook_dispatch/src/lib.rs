//! Post-execution hook dispatch for afterhook (Layer 2).
//!
//! `afterhook_dispatch` runs user-declared hooks after an intercepted
//! operation finishes. Every invocation produces one sealed
//! [`ExecutionRecord`](record::ExecutionRecord); the dispatcher then runs the
//! operation's bindings against it, in order, without ever changing what the
//! original caller receives.
//!
//! # Core Concepts
//!
//! - [`Interceptor`](adapter::Interceptor) - Runs the real operation (sync or
//!   async), seals the record and dispatches exactly once
//! - [`HookDispatcher`](dispatcher::HookDispatcher) - Guard, resolve, bind and
//!   invoke each binding, honoring continue-on-error and the global policy
//! - [`HooksAPI`](api::HooksAPI) - Declarations, handler types, guards and
//!   production markers, registered by plugins during `build()`
//! - [`HookSettings`](settings::HookSettings) - Auto-creation, service
//!   resolution, production mode, timeout and error policy
//!
//! # Example
//!
//! ```ignore
//! let mut server = Server::new();
//! server
//!     .add_plugins(DefaultPlugins)
//!     .add_plugins(HooksPlugin::default())
//!     .add_plugins(CalculatorHooks);
//! server.finish();
//!
//! let interceptor = Interceptor::new(&server);
//! let sum = interceptor
//!     .call(
//!         Invocation::new(OperationId::of::<Calculator>("add")).arg(2_i64).arg(3_i64),
//!         || Ok::<_, CalcError>(2 + 3),
//!     )
//!     .await?;
//! ```
//!
//! # Architecture
//!
//! - **Layer 1** (`afterhook_system`, `afterhook_core_plugins`): services,
//!   plugins, clock and logging
//! - **Layer 2** (`afterhook_dispatch`): hook metadata and dispatch (this crate)

/// Result adapter: run the operation, seal the record, dispatch once.
pub mod adapter;

/// Hook metadata store.
pub mod api;

/// Handler parameter binding.
pub mod binder;

/// The hook dispatcher.
pub mod dispatcher;

/// Error types.
pub mod error;

/// Handler registration and invocation.
pub mod handler;

/// Declarative hook metadata.
pub mod metadata;

/// The plugin that installs hook dispatch.
pub mod plugin;

/// Execution records.
pub mod record;

/// Runtime configuration.
pub mod settings;

/// Type-erased values.
pub mod value;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::adapter::{Intercepted, Interceptor};
    pub use crate::api::HooksAPI;
    pub use crate::binder::{RECORD_NAMES, RETURN_VALUE_NAMES};
    pub use crate::dispatcher::{DispatchReport, HookDispatcher};
    pub use crate::error::{
        BoxError, DispatchError, HookError, HookErrorKind, HookFailure, HookRegistrationError,
        SettingsError,
    };
    pub use crate::handler::{BoundArg, HandlerParam, HandlerType, HookArgs, HookCall};
    pub use crate::metadata::{HandlerRef, HookBinding, MappingDirective, OperationHooks};
    pub use crate::plugin::HooksPlugin;
    pub use crate::record::{
        CallerInfo, ExecutionRecord, Failure, Invocation, InvocationId, OperationId, Outcome,
        PendingInvocation, ReturnShape,
    };
    pub use crate::settings::{ErrorPolicy, HookSettings};
    pub use crate::value::Value;
}
