//! The result adapter.
//!
//! An [`Interceptor`] wraps one call to a hooked operation: it runs the real
//! operation, seals exactly one [`ExecutionRecord`] from its outcome, hands the
//! record to the [`HookDispatcher`] once, and gives the caller back the
//! operation's own value or error untouched.
//!
//! Three call shapes are supported, all through `async` entry points so that
//! awaiting an asynchronous operation never blocks the calling thread:
//!
//! | Entry point | Operation | Return shape |
//! |-------------|-----------|--------------|
//! | [`run_value`](Interceptor::run_value) | `FnOnce() -> T` | `Sync` |
//! | [`run_sync`](Interceptor::run_sync) | `FnOnce() -> Result<T, E>` | `Sync` |
//! | [`run_async`](Interceptor::run_async) | `IntoFuture<Output = Result<T, E>>` | `AsyncUnit` when `T = ()`, else `AsyncValue` |
//!
//! Hook failures never replace the operation's outcome. Callers that want to
//! observe them use [`Intercepted::dispatch`]; otherwise they are logged.
//!
//! # Example
//!
//! ```
//! use afterhook_dispatch::adapter::Interceptor;
//! use afterhook_dispatch::plugin::HooksPlugin;
//! use afterhook_dispatch::record::{Invocation, OperationId};
//! use afterhook_system::server::Server;
//!
//! struct Calculator;
//!
//! let mut server = Server::new();
//! server.add_plugins(HooksPlugin::default());
//! server.finish();
//!
//! # tokio_test::block_on(async {
//! let interceptor = Interceptor::new(&server);
//! let sum = interceptor
//!     .call(
//!         Invocation::new(OperationId::of::<Calculator>("add")).arg(2_i64).arg(3_i64),
//!         || Ok::<_, String>(2_i64 + 3),
//!     )
//!     .await;
//!
//! assert_eq!(sum, Ok(5));
//! # });
//! ```

use core::any::{Any, TypeId};
use core::convert::Infallible;
use core::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use afterhook_core_plugins::Clock;
use afterhook_system::server::Server;
use afterhook_system::service::Services;

use crate::api::HooksAPI;
use crate::dispatcher::{DispatchReport, HookDispatcher};
use crate::error::DispatchError;
use crate::record::{ExecutionRecord, Failure, Invocation, Outcome, PendingInvocation, ReturnShape};
use crate::settings::HookSettings;
use crate::value::Value;

/// Runs hooked operations and dispatches their hooks.
#[derive(Debug, Clone)]
pub struct Interceptor<'s> {
    hooks: Option<&'s HooksAPI>,
    services: &'s Services,
    settings: Arc<HookSettings>,
    clock: Clock,
}

impl<'s> Interceptor<'s> {
    /// Creates an interceptor over a finished server.
    ///
    /// Uses the server's [`HookSettings`] and [`Clock`] services when present,
    /// their defaults otherwise. Without a [`HooksAPI`], every dispatch is a
    /// no-op.
    #[must_use]
    pub fn new(server: &'s Server) -> Self {
        Self {
            hooks: server.api::<HooksAPI>(),
            services: server.services(),
            settings: server.get_service::<HookSettings>().unwrap_or_default(),
            clock: server
                .get_service::<Clock>()
                .map(|clock| (*clock).clone())
                .unwrap_or_default(),
        }
    }

    /// Creates an interceptor from its parts.
    #[must_use]
    pub fn from_parts(
        hooks: &'s HooksAPI,
        services: &'s Services,
        settings: Arc<HookSettings>,
        clock: Clock,
    ) -> Self {
        Self {
            hooks: Some(hooks),
            services,
            settings,
            clock,
        }
    }

    /// Returns the settings in effect.
    #[must_use]
    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }

    /// Runs an operation that returns a plain value.
    pub async fn run_value<T, F>(&self, invocation: Invocation, operation: F) -> Intercepted<T>
    where
        T: Clone + Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let pending = PendingInvocation::start(invocation, ReturnShape::Sync, &self.clock);
        let outcome = Ok(operation());
        self.complete(pending, outcome).await
    }

    /// Runs a synchronous operation that may fail.
    pub async fn run_sync<T, E, F>(&self, invocation: Invocation, operation: F) -> Intercepted<T, E>
    where
        T: Clone + Any + Send + Sync,
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        let pending = PendingInvocation::start(invocation, ReturnShape::Sync, &self.clock);
        let outcome = operation();
        self.complete(pending, outcome).await
    }

    /// Awaits an asynchronous operation, then dispatches.
    ///
    /// The record's duration covers the whole await.
    pub async fn run_async<T, E, Fut>(
        &self,
        invocation: Invocation,
        operation: Fut,
    ) -> Intercepted<T, E>
    where
        T: Clone + Any + Send + Sync,
        E: fmt::Display,
        Fut: IntoFuture<Output = Result<T, E>>,
    {
        let shape = if TypeId::of::<T>() == TypeId::of::<()>() {
            ReturnShape::AsyncUnit
        } else {
            ReturnShape::AsyncValue
        };
        let pending = PendingInvocation::start(invocation, shape, &self.clock);
        let outcome = operation.await;
        self.complete(pending, outcome).await
    }

    /// Like [`run_sync`](Self::run_sync), returning only the operation's
    /// outcome. Dispatch errors are logged.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, unchanged.
    pub async fn call<T, E, F>(&self, invocation: Invocation, operation: F) -> Result<T, E>
    where
        T: Clone + Any + Send + Sync,
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        self.run_sync(invocation, operation).await.into_outcome()
    }

    /// Like [`run_async`](Self::run_async), returning only the operation's
    /// outcome. Dispatch errors are logged.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, unchanged.
    pub async fn call_async<T, E, Fut>(&self, invocation: Invocation, operation: Fut) -> Result<T, E>
    where
        T: Clone + Any + Send + Sync,
        E: fmt::Display,
        Fut: IntoFuture<Output = Result<T, E>>,
    {
        self.run_async(invocation, operation).await.into_outcome()
    }

    async fn complete<T, E>(&self, pending: PendingInvocation, outcome: Result<T, E>) -> Intercepted<T, E>
    where
        T: Clone + Any + Send + Sync,
        E: fmt::Display,
    {
        let captured = match &outcome {
            Ok(_) if TypeId::of::<T>() == TypeId::of::<()>() => Outcome::Returned(None),
            Ok(value) => Outcome::Returned(Some(Value::new(value.clone()))),
            Err(error) => Outcome::Failed(Failure::capture(error)),
        };
        let record = pending.seal(captured);

        let dispatch = match self.hooks {
            Some(hooks) => {
                HookDispatcher::new(hooks, self.services, &self.settings)
                    .dispatch(&record)
                    .await
            }
            None => {
                tracing::trace!(operation = %record.operation(), "no hooks api, dispatch skipped");
                Ok(DispatchReport::default())
            }
        };

        Intercepted {
            outcome,
            dispatch,
            record,
        }
    }
}

/// The outcome of an intercepted call together with its dispatch result.
#[must_use = "the operation's outcome is inside"]
pub struct Intercepted<T, E = Infallible> {
    outcome: Result<T, E>,
    dispatch: Result<DispatchReport, DispatchError>,
    record: ExecutionRecord,
}

impl<T, E> Intercepted<T, E> {
    /// Returns the operation's own outcome.
    pub fn outcome(&self) -> &Result<T, E> {
        &self.outcome
    }

    /// Returns the dispatch result.
    pub fn dispatch(&self) -> &Result<DispatchReport, DispatchError> {
        &self.dispatch
    }

    /// Returns the sealed record the hooks saw, bag included.
    pub fn record(&self) -> &ExecutionRecord {
        &self.record
    }

    /// Splits into the operation's outcome and the dispatch result.
    pub fn into_parts(self) -> (Result<T, E>, Result<DispatchReport, DispatchError>) {
        (self.outcome, self.dispatch)
    }

    /// Returns the operation's outcome, logging any dispatch error.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, unchanged.
    pub fn into_outcome(self) -> Result<T, E> {
        if let Err(error) = &self.dispatch {
            tracing::error!(
                operation = %self.record.operation(),
                invocation = %self.record.id(),
                error = %error,
                "hook dispatch failed"
            );
        }
        self.outcome
    }
}

impl<T> Intercepted<T, Infallible> {
    /// Returns the value of an infallible operation, logging any dispatch
    /// error.
    pub fn into_value(self) -> T {
        match self.into_outcome() {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Intercepted<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intercepted")
            .field("outcome", &self.outcome)
            .field("dispatch", &self.dispatch)
            .field("invocation", self.record.id())
            .finish()
    }
}
