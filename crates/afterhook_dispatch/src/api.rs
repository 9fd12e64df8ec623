//! Hook metadata store.
//!
//! The [`HooksAPI`] is where plugins declare, during `build()`, everything the
//! dispatcher needs at runtime:
//!
//! - **Operations** ([`declare`](HooksAPI::declare)): bindings, directives,
//!   guard and production marker for one hooked operation
//! - **Handlers** ([`register_handler`](HooksAPI::register_handler)): handler
//!   types, their constructors and members
//! - **Guards** ([`register_guard`](HooksAPI::register_guard)): named predicates
//!   on an operation's declaring type
//! - **Production markers** ([`skip_in_production`](HooksAPI::skip_in_production)):
//!   declaring types whose hooks never run in production
//!
//! # Example
//!
//! ```ignore
//! impl Plugin for CalculatorHooks {
//!     fn build(&self, server: &mut Server) {
//!         let hooks = server
//!             .api::<HooksAPI>()
//!             .expect("HooksPlugin must be added first");
//!
//!         hooks
//!             .register_handler(HandlerType::<AuditHooks>::with_default().method(
//!                 "record_sum",
//!                 [HandlerParam::of::<i64>("sum")],
//!                 |audit, call| async move { audit.record(call.get::<i64>("sum")); Ok(()) }.boxed(),
//!             ))
//!             .expect("registered once");
//!
//!         hooks
//!             .declare(
//!                 OperationHooks::new(OperationId::of::<Calculator>("add"))
//!                     .parameters(["a", "b"])
//!                     .hook(HookBinding::new(HandlerRef::of::<AuditHooks>("record_sum")))
//!                     .directive(MappingDirective::return_value("sum")),
//!             )
//!             .expect("declared once");
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<HooksPlugin>()]
//!     }
//! }
//! ```
//!
//! # Thread Safety
//!
//! Registries sit behind [`RwLock`]s. Readers get `Arc` snapshots, so no lock
//! is ever held while a handler runs.

use std::sync::Arc;

use afterhook_system::api::API;
use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;

use crate::error::{BoxError, HookRegistrationError};
use crate::handler::{HandlerEntry, HandlerType};
use crate::metadata::{HandlerRef, OperationHooks};
use crate::record::{ExecutionRecord, OperationId};

/// Shared guard predicate.
pub(crate) type Guard = Arc<dyn Fn(&ExecutionRecord) -> Result<bool, BoxError> + Send + Sync>;

/// Registry of hook declarations, handler types and guards.
#[derive(Default)]
pub struct HooksAPI {
    operations: RwLock<HashMap<OperationId, Arc<OperationHooks>>>,
    handlers: RwLock<HashMap<Arc<str>, Arc<HandlerEntry>>>,
    // declaring type → guard name → predicate
    guards: RwLock<HashMap<Arc<str>, HashMap<Arc<str>, Guard>>>,
    production_skipped: RwLock<HashSet<Arc<str>>>,
}

impl API for HooksAPI {}

impl core::fmt::Debug for HooksAPI {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HooksAPI")
            .field("operations", &self.operations.read().len())
            .field("handlers", &self.handlers.read().len())
            .field("guards", &self.guards.read().values().map(HashMap::len).sum::<usize>())
            .finish_non_exhaustive()
    }
}

impl HooksAPI {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Declares the hooks of one operation.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateOperation`] if the operation
    /// was already declared.
    pub fn declare(&self, hooks: OperationHooks) -> Result<&Self, HookRegistrationError> {
        let mut operations = self.operations.write();
        if operations.contains_key(hooks.operation()) {
            return Err(HookRegistrationError::DuplicateOperation(
                hooks.operation().clone(),
            ));
        }
        operations.insert(hooks.operation().clone(), Arc::new(hooks));
        Ok(self)
    }

    /// Returns the declaration for an operation.
    #[must_use]
    pub fn operation(&self, id: &OperationId) -> Option<Arc<OperationHooks>> {
        self.operations.read().get(id).cloned()
    }

    /// Returns true if the operation has a declaration.
    #[must_use]
    pub fn contains_operation(&self, id: &OperationId) -> bool {
        self.operations.read().contains_key(id)
    }

    /// Returns the number of declared operations.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.read().len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Handlers
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a handler type and its members.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is already registered or declares a
    /// member twice.
    pub fn register_handler<H: Send + Sync + 'static>(
        &self,
        handler: HandlerType<H>,
    ) -> Result<&Self, HookRegistrationError> {
        let entry = handler.into_entry();
        let type_name = entry.type_name();

        {
            let mut seen = HashSet::new();
            for member in entry.members() {
                if !seen.insert(&*member.name) {
                    return Err(HookRegistrationError::DuplicateMember {
                        type_name: type_name.to_string(),
                        member: member.name.to_string(),
                    });
                }
            }
        }

        let mut handlers = self.handlers.write();
        if handlers.contains_key(type_name) {
            return Err(HookRegistrationError::DuplicateHandler(type_name.to_string()));
        }
        handlers.insert(Arc::from(type_name), Arc::new(entry));
        Ok(self)
    }

    pub(crate) fn handler_type(&self, type_name: &str) -> Option<Arc<HandlerEntry>> {
        self.handlers.read().get(type_name).cloned()
    }

    /// Returns true if a handler type with this name is registered.
    #[must_use]
    pub fn contains_handler(&self, type_name: &str) -> bool {
        self.handlers.read().contains_key(type_name)
    }

    /// Returns true if the referenced handler type and member are registered.
    #[must_use]
    pub fn resolves(&self, handler: &HandlerRef) -> bool {
        self.handler_type(handler.type_name())
            .is_some_and(|entry| entry.member(handler.member()).is_some())
    }

    /// Lists bindings whose handler cannot currently be resolved.
    ///
    /// Resolution is lazy, so these are not errors until dispatch.
    #[must_use]
    pub fn unresolved_bindings(&self) -> Vec<(OperationId, HandlerRef)> {
        let operations: Vec<Arc<OperationHooks>> =
            self.operations.read().values().cloned().collect();

        operations
            .iter()
            .flat_map(|op| {
                op.bindings()
                    .iter()
                    .filter(|binding| !self.resolves(binding.handler()))
                    .map(|binding| (op.operation().clone(), binding.handler().clone()))
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guards
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a named guard on a declaring type.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateGuard`] if the name is taken.
    pub fn register_guard<F>(
        &self,
        declaring_type: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        guard: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        F: Fn(&ExecutionRecord) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        let declaring_type = declaring_type.into();
        let name = name.into();
        let mut guards = self.guards.write();
        let scope = guards.entry(Arc::clone(&declaring_type)).or_default();
        if scope.contains_key(&name) {
            return Err(HookRegistrationError::DuplicateGuard {
                declaring_type: declaring_type.to_string(),
                name: name.to_string(),
            });
        }
        scope.insert(name, Arc::new(guard));
        Ok(self)
    }

    /// Registers a named guard on `T`, using `T`'s type name.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateGuard`] if the name is taken.
    pub fn register_guard_on<T: ?Sized, F>(
        &self,
        name: impl Into<Arc<str>>,
        guard: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        F: Fn(&ExecutionRecord) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.register_guard(core::any::type_name::<T>(), name, guard)
    }

    pub(crate) fn guard(&self, declaring_type: &str, name: &str) -> Option<Guard> {
        self.guards.read().get(declaring_type)?.get(name).cloned()
    }

    /// Returns true if the declaring type registers a guard with this name.
    #[must_use]
    pub fn contains_guard(&self, declaring_type: &str, name: &str) -> bool {
        self.guard(declaring_type, name).is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Production markers
    // ─────────────────────────────────────────────────────────────────────────

    /// Marks every operation of a declaring type as skip-in-production.
    pub fn skip_in_production(&self, declaring_type: impl Into<Arc<str>>) -> &Self {
        self.production_skipped.write().insert(declaring_type.into());
        self
    }

    /// Marks every operation of `T` as skip-in-production.
    pub fn skip_in_production_for<T: ?Sized>(&self) -> &Self {
        self.skip_in_production(core::any::type_name::<T>())
    }

    /// Returns true if the operation, or its declaring type, is marked
    /// skip-in-production.
    #[must_use]
    pub fn skips_in_production(&self, hooks: &OperationHooks) -> bool {
        hooks.skips_in_production()
            || self
                .production_skipped
                .read()
                .contains(hooks.operation().declaring_type())
    }
}
