//! Typed service registry.
//!
//! Services are the shared collaborators of hooked operations: handler
//! instances, sinks, configuration. They are stored once per server, looked up
//! by type token, and handed out as `Arc<T>` so callers can keep them across
//! `.await` points.
//!
//! - [`Services`] - The registry container
//! - [`Service`] - Blanket marker for storable types
//! - [`ServiceId`] - Type token used as the registry key
//!
//! # Example
//!
//! ```
//! use afterhook_system::service::Services;
//!
//! struct Mailer { host: String }
//!
//! let mut services = Services::new();
//! services.insert(Mailer { host: "smtp.local".into() });
//!
//! let mailer = services.get::<Mailer>().unwrap();
//! assert_eq!(mailer.host, "smtp.local");
//! ```

mod registry;

pub use registry::{ErasedService, Service, ServiceError, ServiceId, Services};
