//! API trait for capability registration.
//!
//! APIs are build-time registries that plugins use to expose capabilities
//! to other plugins. The hook metadata store is the canonical example: a
//! plugin inserts it during `build()`, and every plugin that declares hooked
//! operations registers into it afterwards.
//!
//! # API vs Service
//!
//! | Aspect | API | Service |
//! |--------|-----|---------|
//! | **Purpose** | Registration and orchestration | Runtime collaborators |
//! | **Accessed by** | Plugins, the dispatcher | Hook handlers, parameter binding |
//! | **Access method** | `server.api::<A>()` | `server.get_service::<T>()` |
//! | **Mutation** | Interior mutability | Replaced wholesale via `&mut Server` |
//!
//! # Interior Mutability Pattern
//!
//! APIs that accept registrations use interior mutability so that any plugin
//! holding `&Server` can register:
//!
//! ```ignore
//! pub struct NotifierAPI {
//!     channels: RwLock<HashMap<String, Channel>>,
//! }
//!
//! impl API for NotifierAPI {}
//!
//! impl NotifierAPI {
//!     pub fn register(&self, name: &str, channel: Channel) {
//!         self.channels.write().insert(name.into(), channel);
//!     }
//! }
//! ```

/// Marker trait for capability APIs.
///
/// Implement this for a type to make it storable through
/// [`Server::insert_api`](crate::server::Server::insert_api):
///
/// ```
/// use afterhook_system::api::API;
///
/// pub struct MyAPI;
///
/// impl API for MyAPI {}
/// ```
pub trait API: Send + Sync + 'static {}
