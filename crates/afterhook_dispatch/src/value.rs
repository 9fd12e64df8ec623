//! Type-erased values carried through a dispatch.

use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

use afterhook_system::service::ErasedService;

/// A shared, type-erased value.
///
/// Arguments, results, receivers, literal directive values and bag entries
/// are all `Value`s. Cloning only bumps a reference count.
///
/// ```
/// use afterhook_dispatch::value::Value;
///
/// let value = Value::new(5_i64);
/// assert_eq!(value.downcast_ref::<i64>(), Some(&5));
/// assert!(value.downcast_ref::<i32>().is_none());
/// ```
#[derive(Clone)]
pub struct Value {
    inner: ErasedService,
    type_name: &'static str,
}

impl Value {
    /// Wraps an owned value.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value without copying it.
    #[must_use]
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub(crate) fn from_erased(inner: ErasedService, type_name: &'static str) -> Self {
        Self { inner, type_name }
    }

    /// Returns a reference to the value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }

    /// Returns a shared handle to the value if it is a `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Returns true if the value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    /// Returns the `TypeId` of the wrapped value.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        // Deref first: `Arc` itself implements `Any`
        (*self.inner).type_id()
    }

    /// Returns the type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.type_name)
    }
}
