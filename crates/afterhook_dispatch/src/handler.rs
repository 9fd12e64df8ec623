//! Hook handler registration and invocation.
//!
//! Handlers are registered explicitly through a [`HandlerType`]: a typed
//! description of one handler type, how to construct it, and its members.
//! Each member declares its formal parameters as [`HandlerParam`]s so the
//! binder can resolve them by name and type.
//!
//! A member receives a [`HookCall`]: the sealed record plus the bound
//! arguments. Members return a boxed future and are always awaited, so
//! synchronous work simply returns a ready future.
//!
//! ```
//! use std::sync::Arc;
//! use afterhook_dispatch::handler::{HandlerParam, HandlerType};
//! use futures::FutureExt;
//!
//! #[derive(Default)]
//! struct AuditHooks;
//!
//! impl AuditHooks {
//!     fn note(&self, sum: i64) {
//!         let _ = sum;
//!     }
//! }
//!
//! let handler = HandlerType::<AuditHooks>::with_default().method(
//!     "record_sum",
//!     [HandlerParam::of::<i64>("sum")],
//!     |hooks, call| {
//!         async move {
//!             if let Some(sum) = call.get::<i64>("sum") {
//!                 hooks.note(*sum);
//!             }
//!             Ok(())
//!         }
//!         .boxed()
//!     },
//! );
//! ```

use core::any::{Any, TypeId};
use core::fmt;
use core::marker::PhantomData;
use std::sync::Arc;

use afterhook_system::service::{ErasedService, Services};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::BoxError;
use crate::record::ExecutionRecord;
use crate::value::Value;

/// Type-erased member invocation.
pub(crate) type ErasedMember = Arc<
    dyn for<'a> Fn(Option<ErasedService>, HookCall<'a>) -> BoxFuture<'a, Result<(), BoxError>>
        + Send
        + Sync,
>;

type Constructor = Arc<dyn Fn(&Services) -> Option<ErasedService> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Parameters and arguments
// ─────────────────────────────────────────────────────────────────────────────

/// A formal parameter of a handler member.
#[derive(Debug, Clone)]
pub struct HandlerParam {
    name: Arc<str>,
    type_id: Option<TypeId>,
    type_name: &'static str,
    default: Option<Value>,
}

impl HandlerParam {
    /// Declares a parameter of type `T`.
    ///
    /// The type is used for service resolution when nothing else binds it.
    #[must_use]
    pub fn of<T: Any + Send + Sync>(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            type_id: Some(TypeId::of::<T>()),
            type_name: core::any::type_name::<T>(),
            default: None,
        }
    }

    /// Declares a parameter that receives the execution record itself.
    ///
    /// Only binds when named `record` or `context`.
    #[must_use]
    pub fn record(name: impl Into<Arc<str>>) -> Self {
        Self::of::<ExecutionRecord>(name)
    }

    /// Declares a parameter without a type. It is never service-resolved.
    #[must_use]
    pub fn any(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            type_id: None,
            type_name: "_",
            default: None,
        }
    }

    /// Sets the value used when nothing else binds this parameter.
    #[must_use]
    pub fn with_default<T: Any + Send + Sync>(mut self, default: T) -> Self {
        self.default = Some(Value::new(default));
        self
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type, if any.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    /// Returns the declared type name, `_` when untyped.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the declared default.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub(crate) fn is_record(&self) -> bool {
        self.type_id == Some(TypeId::of::<ExecutionRecord>())
    }

    pub(crate) fn name_key(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

/// What a handler parameter was bound to.
#[derive(Debug, Clone)]
pub enum BoundArg {
    /// A concrete value.
    Value(Value),
    /// The execution record being dispatched.
    Record,
    /// Nothing bound. Not an error.
    Absent,
}

/// Bound arguments for one handler invocation, in declared parameter order.
#[derive(Debug, Clone, Default)]
pub struct HookArgs {
    slots: Vec<(Arc<str>, BoundArg)>,
}

impl HookArgs {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: Arc<str>, arg: BoundArg) {
        self.slots.push((name, arg));
    }

    /// Returns what the named parameter was bound to.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&BoundArg> {
        self.slots
            .iter()
            .find(|(slot, _)| &**slot == name)
            .map(|(_, arg)| arg)
    }

    /// Returns the named value, or `None` if absent or bound to the record.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.slot(name)? {
            BoundArg::Value(value) => Some(value),
            BoundArg::Record | BoundArg::Absent => None,
        }
    }

    /// Returns the named value downcast to `T`.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.value(name)?.downcast_ref::<T>()
    }

    /// Returns true if the named parameter received something.
    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        !matches!(self.slot(name), None | Some(BoundArg::Absent))
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the member declares no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over `(name, binding)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundArg)> {
        self.slots.iter().map(|(name, arg)| (&**name, arg))
    }
}

/// Everything a handler member receives.
pub struct HookCall<'a> {
    record: &'a ExecutionRecord,
    args: HookArgs,
}

impl<'a> HookCall<'a> {
    pub(crate) fn new(record: &'a ExecutionRecord, args: HookArgs) -> Self {
        Self { record, args }
    }

    /// Returns the execution record. Always available, bound or not.
    #[must_use]
    pub fn record(&self) -> &'a ExecutionRecord {
        self.record
    }

    /// Returns the bound arguments.
    #[must_use]
    pub fn args(&self) -> &HookArgs {
        &self.args
    }

    /// Returns the named argument downcast to `T`.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.args.get::<T>(name)
    }

    /// Returns the record if the named parameter was bound to it.
    #[must_use]
    pub fn record_param(&self, name: &str) -> Option<&'a ExecutionRecord> {
        matches!(self.args.slot(name), Some(BoundArg::Record)).then_some(self.record)
    }
}

impl fmt::Debug for HookCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCall")
            .field("operation", self.record.operation())
            .field("args", &self.args)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Members and types
// ─────────────────────────────────────────────────────────────────────────────

/// One invocable member of a handler type.
pub(crate) struct HandlerMember {
    pub(crate) name: Arc<str>,
    pub(crate) params: Vec<HandlerParam>,
    pub(crate) is_static: bool,
    pub(crate) invoke: ErasedMember,
}

fn erase<F>(invoke: F) -> ErasedMember
where
    F: for<'a> Fn(Option<ErasedService>, HookCall<'a>) -> BoxFuture<'a, Result<(), BoxError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(invoke)
}

/// Typed registration of a handler type `H`.
///
/// Built with [`HandlerType::new`] (instances must come from the service
/// registry), [`HandlerType::with_default`] (fallback `H::default()`), or
/// [`HandlerType::constructed_with`] (dependency-aware construction), and
/// registered with [`HooksAPI::register_handler`](crate::api::HooksAPI::register_handler).
pub struct HandlerType<H> {
    construct: Option<Constructor>,
    fallback: Option<Constructor>,
    members: Vec<HandlerMember>,
    _marker: PhantomData<fn() -> H>,
}

impl<H: Send + Sync + 'static> HandlerType<H> {
    /// Creates a handler type with no constructors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            construct: None,
            fallback: None,
            members: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Creates a handler type that falls back to `H::default()`.
    #[must_use]
    pub fn with_default() -> Self
    where
        H: Default,
    {
        let mut handler = Self::new();
        handler.fallback = Some(Arc::new(|_: &Services| {
            let instance: ErasedService = Arc::new(H::default());
            Some(instance)
        }));
        handler
    }

    /// Sets a dependency-aware constructor, tried before the default one.
    ///
    /// Returning `None` means the dependencies are not available.
    #[must_use]
    pub fn constructed_with<F>(mut self, construct: F) -> Self
    where
        F: Fn(&Services) -> Option<H> + Send + Sync + 'static,
    {
        self.construct = Some(Arc::new(move |services: &Services| {
            construct(services).map(|instance| {
                let erased: ErasedService = Arc::new(instance);
                erased
            })
        }));
        self
    }

    /// Adds an instance member.
    #[must_use]
    pub fn method<F>(
        mut self,
        name: impl Into<Arc<str>>,
        params: impl IntoIterator<Item = HandlerParam>,
        method: F,
    ) -> Self
    where
        F: for<'a> Fn(Arc<H>, HookCall<'a>) -> BoxFuture<'a, Result<(), BoxError>>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let invoke = erase(move |instance, call| {
            match instance.and_then(|erased| erased.downcast::<H>().ok()) {
                Some(handler) => method(handler, call),
                None => {
                    let error: BoxError = format!(
                        "instance is not a `{}`",
                        core::any::type_name::<H>()
                    )
                    .into();
                    futures::future::ready(Err(error)).boxed()
                }
            }
        });

        self.members.push(HandlerMember {
            name,
            params: params.into_iter().collect(),
            is_static: false,
            invoke,
        });
        self
    }

    /// Adds a static member. No instance is resolved for it.
    #[must_use]
    pub fn static_method<F>(
        mut self,
        name: impl Into<Arc<str>>,
        params: impl IntoIterator<Item = HandlerParam>,
        method: F,
    ) -> Self
    where
        F: for<'a> Fn(HookCall<'a>) -> BoxFuture<'a, Result<(), BoxError>>
            + Send
            + Sync
            + 'static,
    {
        self.members.push(HandlerMember {
            name: name.into(),
            params: params.into_iter().collect(),
            is_static: true,
            invoke: erase(move |_, call| method(call)),
        });
        self
    }

    pub(crate) fn into_entry(self) -> HandlerEntry {
        HandlerEntry {
            type_id: TypeId::of::<H>(),
            type_name: core::any::type_name::<H>(),
            construct: self.construct,
            fallback: self.fallback,
            members: self.members,
        }
    }
}

impl<H: Send + Sync + 'static> Default for HandlerType<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased handler type held by the catalog.
pub(crate) struct HandlerEntry {
    type_id: TypeId,
    type_name: &'static str,
    construct: Option<Constructor>,
    fallback: Option<Constructor>,
    members: Vec<HandlerMember>,
}

impl HandlerEntry {
    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn member(&self, name: &str) -> Option<&HandlerMember> {
        self.members.iter().find(|member| &*member.name == name)
    }

    pub(crate) fn members(&self) -> &[HandlerMember] {
        &self.members
    }

    /// Best-effort construction: dependency-aware first, then the fallback.
    pub(crate) fn construct(&self, services: &Services) -> Option<ErasedService> {
        self.construct
            .as_ref()
            .and_then(|construct| construct(services))
            .or_else(|| self.fallback.as_ref().and_then(|fallback| fallback(services)))
    }
}
