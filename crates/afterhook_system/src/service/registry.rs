//! Service storage and lookup.
//!
//! Entries are immutable once inserted: the registry hands out shared
//! `Arc` handles, and replacement requires `&mut Services`. Types that need
//! to change over time carry their own interior mutability.

use core::any::{Any, TypeId};
use std::sync::Arc;

use hashbrown::HashMap;

/// Type-erased shared service handle.
pub type ErasedService = Arc<dyn Any + Send + Sync>;

/// A value that can be stored in [`Services`].
///
/// Any type that is `Send + Sync + 'static` automatically implements `Service`.
pub trait Service: Send + Sync + 'static {
    /// Returns the type name for debugging purposes.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl<T: Send + Sync + 'static> Service for T {}

/// Type token identifying a service in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceId {
    /// Creates a `ServiceId` for the given type.
    #[must_use]
    pub fn of<T: Service>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Errors that can occur during service lookup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// No service of the requested type is registered.
    #[error("service not registered: {0}")]
    NotFound(&'static str),
}

struct ServiceEntry {
    name: &'static str,
    instance: ErasedService,
}

/// Registry of shared services keyed by type.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use afterhook_system::service::Services;
///
/// struct Counter { start: i32 }
///
/// let mut services = Services::new();
/// assert!(services.insert(Counter { start: 1 }).is_none());
///
/// // Replacing returns the previous handle.
/// let previous = services.insert(Counter { start: 2 }).unwrap();
/// assert_eq!(previous.start, 1);
///
/// let handle: Arc<Counter> = services.get().unwrap();
/// assert_eq!(handle.start, 2);
/// ```
#[derive(Default)]
pub struct Services {
    storage: HashMap<TypeId, ServiceEntry>,
}

impl Services {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: HashMap::new(),
        }
    }

    /// Inserts a service, returning the handle it replaced.
    pub fn insert<T: Service>(&mut self, service: T) -> Option<Arc<T>> {
        self.insert_arc(Arc::new(service))
    }

    /// Inserts an already shared service, returning the handle it replaced.
    pub fn insert_arc<T: Service>(&mut self, service: Arc<T>) -> Option<Arc<T>> {
        let entry = ServiceEntry {
            name: core::any::type_name::<T>(),
            instance: service,
        };
        self.storage
            .insert(TypeId::of::<T>(), entry)
            .and_then(|old| old.instance.downcast::<T>().ok())
    }

    /// Returns `true` if a service of type `T` is registered.
    #[must_use]
    pub fn contains<T: Service>(&self) -> bool {
        self.storage.contains_key(&TypeId::of::<T>())
    }

    /// Returns `true` if a service with the given `TypeId` is registered.
    #[must_use]
    pub fn contains_by_type_id(&self, type_id: TypeId) -> bool {
        self.storage.contains_key(&type_id)
    }

    /// Looks up a service by type.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no service of type `T` exists.
    pub fn get<T: Service>(&self) -> Result<Arc<T>, ServiceError> {
        let type_name = core::any::type_name::<T>();
        self.storage
            .get(&TypeId::of::<T>())
            .and_then(|entry| Arc::clone(&entry.instance).downcast::<T>().ok())
            .ok_or(ServiceError::NotFound(type_name))
    }

    /// Looks up a service by type token without knowing the concrete type.
    ///
    /// Used where the type is only known at runtime, such as binding a hook
    /// handler parameter declared with a given `TypeId`.
    #[must_use]
    pub fn get_by_type_id(&self, type_id: TypeId) -> Option<ErasedService> {
        self.storage
            .get(&type_id)
            .map(|entry| Arc::clone(&entry.instance))
    }

    /// Removes a service and returns its handle.
    pub fn remove<T: Service>(&mut self) -> Option<Arc<T>> {
        self.storage
            .remove(&TypeId::of::<T>())
            .and_then(|entry| entry.instance.downcast::<T>().ok())
    }

    /// Removes every service.
    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set()
            .entries(self.storage.values().map(|entry| entry.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter {
        value: i32,
    }

    #[derive(Debug, PartialEq)]
    struct Name(String);

    #[test]
    fn insert_and_get() {
        let mut services = Services::new();
        services.insert(Counter { value: 42 });

        let counter = services.get::<Counter>().unwrap();
        assert_eq!(counter.value, 42);
    }

    #[test]
    fn insert_replaces_existing() {
        let mut services = Services::new();
        services.insert(Counter { value: 1 });

        let old = services.insert(Counter { value: 2 });
        assert_eq!(old.as_deref(), Some(&Counter { value: 1 }));
        assert_eq!(services.get::<Counter>().unwrap().value, 2);
    }

    #[test]
    fn handles_outlive_replacement() {
        let mut services = Services::new();
        services.insert(Counter { value: 1 });

        let held = services.get::<Counter>().unwrap();
        services.insert(Counter { value: 2 });

        assert_eq!(held.value, 1, "previously handed out handle is unaffected");
    }

    #[test]
    fn missing_service_reports_type_name() {
        let services = Services::new();
        let err = services.get::<Counter>().unwrap_err();
        assert!(err.to_string().contains("Counter"));
    }

    #[test]
    fn get_by_type_id_downcasts() {
        let mut services = Services::new();
        services.insert(Name("audit".to_string()));

        let erased = services
            .get_by_type_id(TypeId::of::<Name>())
            .expect("service should be registered");
        assert_eq!(erased.downcast_ref::<Name>(), Some(&Name("audit".into())));
        assert!(services.get_by_type_id(TypeId::of::<Counter>()).is_none());
    }

    #[test]
    fn remove_and_len() {
        let mut services = Services::new();
        assert!(services.is_empty());

        services.insert(Counter { value: 1 });
        services.insert(Name("x".into()));
        assert_eq!(services.len(), 2);
        assert!(services.contains_by_type_id(TypeId::of::<Name>()));

        assert!(services.remove::<Counter>().is_some());
        assert!(services.remove::<Counter>().is_none());
        assert!(!services.contains::<Counter>());

        services.clear();
        assert!(services.is_empty());
    }

    #[test]
    fn service_id_carries_name() {
        let id = ServiceId::of::<Counter>();
        assert_eq!(id.type_id(), TypeId::of::<Counter>());
        assert!(id.type_name().contains("Counter"));
        assert_ne!(id, ServiceId::of::<Name>());
    }
}
