//! The hook dispatcher.
//!
//! [`HookDispatcher::dispatch`] runs every applicable binding of a sealed
//! [`ExecutionRecord`], strictly one after another:
//!
//! 1. Skip everything if the operation is marked skip-in-production and the
//!    server runs in production mode
//! 2. Return immediately if the operation declares no bindings
//! 3. For each binding, in order: evaluate the guard, resolve the handler
//!    instance, bind parameters, then invoke and await the handler (bounded
//!    by the configured timeout)
//! 4. On failure, apply the binding's continue-on-error flag or, if it has
//!    none, the global [`ErrorPolicy`](crate::settings::ErrorPolicy)
//!
//! Handler panics are caught and treated like any other handler failure.

use core::any::Any;
use core::panic::AssertUnwindSafe;
use std::time::Instant;

use afterhook_system::service::{ErasedService, Services};
use futures::FutureExt;

use crate::api::HooksAPI;
use crate::binder::ParameterBinder;
use crate::error::{DispatchError, HookError, HookFailure};
use crate::handler::{HandlerEntry, HookCall};
use crate::metadata::{HookBinding, OperationHooks};
use crate::record::{ExecutionRecord, OperationId};
use crate::settings::{FailureAction, HookSettings};

/// Summary of a dispatch that did not surface an error.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Handlers that ran to completion.
    pub invoked: usize,
    /// Bindings whose guard returned `false`.
    pub skipped: usize,
    /// Failures that dispatch continued past.
    pub failures: Vec<HookFailure>,
    /// True if the whole dispatch was skipped for production.
    pub skipped_in_production: bool,
}

impl DispatchReport {
    /// Returns true if nothing ran and nothing failed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.invoked == 0 && self.skipped == 0 && self.failures.is_empty()
    }
}

enum BindingOutcome {
    Invoked,
    Skipped,
}

/// Runs the hooks of sealed execution records.
///
/// Borrows the metadata store, services and settings; cheap to create per
/// dispatch.
#[derive(Debug, Clone, Copy)]
pub struct HookDispatcher<'s> {
    hooks: &'s HooksAPI,
    services: &'s Services,
    settings: &'s HookSettings,
}

impl<'s> HookDispatcher<'s> {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(hooks: &'s HooksAPI, services: &'s Services, settings: &'s HookSettings) -> Self {
        Self {
            hooks,
            services,
            settings,
        }
    }

    /// Runs every applicable binding for `record`.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Aborted`] if a binding that must not fail did
    /// - [`DispatchError::Deferred`] if the policy re-raises failures once all
    ///   bindings have run
    pub async fn dispatch(&self, record: &ExecutionRecord) -> Result<DispatchReport, DispatchError> {
        let mut report = DispatchReport::default();

        let Some(operation) = self.hooks.operation(record.operation()) else {
            tracing::trace!(operation = %record.operation(), "no hooks declared");
            return Ok(report);
        };

        if self.settings.production && self.hooks.skips_in_production(&operation) {
            tracing::debug!(
                operation = %operation.operation(),
                bindings = operation.bindings().len(),
                "hooks skipped in production"
            );
            report.skipped_in_production = true;
            return Ok(report);
        }

        if operation.bindings().is_empty() {
            tracing::debug!(operation = %operation.operation(), "no bindings");
            return Ok(report);
        }

        let binder = ParameterBinder::new(
            &operation,
            self.services,
            self.settings.auto_resolve_parameters,
        );
        let mut deferred = false;

        for binding in operation.bindings() {
            match self.run_binding(&operation, binding, &binder, record).await {
                Ok(BindingOutcome::Invoked) => report.invoked += 1,
                Ok(BindingOutcome::Skipped) => report.skipped += 1,
                Err(error) => {
                    tracing::warn!(
                        operation = %operation.operation(),
                        handler = %binding.handler(),
                        order = binding.order(),
                        kind = ?error.kind(),
                        error = %error,
                        "hook failed"
                    );

                    match self
                        .settings
                        .default_error_policy
                        .resolve(binding.continue_on_error())
                    {
                        FailureAction::Continue => {}
                        FailureAction::Defer => deferred = true,
                        FailureAction::Abort => {
                            return Err(DispatchError::Aborted {
                                operation: operation.operation().clone(),
                                handler: binding.handler().clone(),
                                source: error,
                            });
                        }
                    }

                    report.failures.push(HookFailure {
                        handler: binding.handler().clone(),
                        order: binding.order(),
                        error,
                    });
                }
            }
        }

        if deferred {
            return Err(DispatchError::Deferred {
                operation: operation.operation().clone(),
                failures: report.failures,
            });
        }

        Ok(report)
    }

    async fn run_binding(
        &self,
        operation: &OperationHooks,
        binding: &HookBinding,
        binder: &ParameterBinder<'_>,
        record: &ExecutionRecord,
    ) -> Result<BindingOutcome, HookError> {
        if let Some(guard) = operation.guard_name()
            && !self.evaluate_guard(operation.operation(), guard, record)?
        {
            tracing::debug!(
                operation = %operation.operation(),
                handler = %binding.handler(),
                guard,
                "guard declined hook"
            );
            return Ok(BindingOutcome::Skipped);
        }

        let handler = binding.handler();
        let entry = self.hooks.handler_type(handler.type_name()).ok_or_else(|| {
            HookError::UnknownHandlerType {
                type_name: handler.type_name().to_string(),
            }
        })?;
        let member = entry
            .member(handler.member())
            .ok_or_else(|| HookError::UnknownMember {
                type_name: handler.type_name().to_string(),
                member: handler.member().to_string(),
            })?;

        let instance = if member.is_static {
            None
        } else {
            Some(self.resolve_instance(&entry)?)
        };

        let call = HookCall::new(record, binder.bind(binding, &member.params, record));
        let invoke = member.invoke.clone();
        // Build the future inside the guarded block so panics raised before
        // the first poll are caught too
        let invocation = AssertUnwindSafe(async move { invoke(instance, call).await }).catch_unwind();

        let result = match self.settings.hook_timeout {
            Some(limit) => {
                let timed_out = || HookError::Timeout {
                    handler: handler.clone(),
                    timeout: limit,
                };
                // The deadline is only checked between polls, so a member
                // that blocks inside its first poll is caught by the stopwatch
                let started = Instant::now();
                let result = tokio::time::timeout(limit, invocation)
                    .await
                    .map_err(|_| timed_out())?;
                if started.elapsed() > limit {
                    return Err(timed_out());
                }
                result
            }
            None => invocation.await,
        };

        match result {
            Ok(Ok(())) => Ok(BindingOutcome::Invoked),
            Ok(Err(source)) => Err(HookError::Invocation {
                handler: handler.clone(),
                source,
            }),
            Err(payload) => Err(HookError::Panicked {
                handler: handler.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn evaluate_guard(
        &self,
        operation: &OperationId,
        name: &str,
        record: &ExecutionRecord,
    ) -> Result<bool, HookError> {
        let guard = self
            .hooks
            .guard(operation.declaring_type(), name)
            .ok_or_else(|| HookError::UnknownGuard {
                declaring_type: operation.declaring_type().to_string(),
                name: name.to_string(),
            })?;

        match std::panic::catch_unwind(AssertUnwindSafe(|| guard(record))) {
            Ok(Ok(pass)) => Ok(pass),
            Ok(Err(source)) => Err(HookError::Guard {
                name: name.to_string(),
                source,
            }),
            Err(payload) => Err(HookError::Guard {
                name: name.to_string(),
                source: format!("panicked: {}", panic_message(payload.as_ref())).into(),
            }),
        }
    }

    /// Registered instance first, then best-effort construction if allowed.
    fn resolve_instance(&self, entry: &HandlerEntry) -> Result<ErasedService, HookError> {
        if let Some(instance) = self.services.get_by_type_id(entry.type_id()) {
            return Ok(instance);
        }

        let auto_create = self.settings.auto_create_handlers;
        let constructed = if auto_create {
            entry.construct(self.services)
        } else {
            None
        };

        constructed.ok_or_else(|| HookError::MissingInstance {
            type_name: entry.type_name().to_string(),
            auto_create,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
