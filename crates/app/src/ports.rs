//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the engine and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod clock;
pub mod device_registry;
pub mod event_bus;
pub mod metrics_store;
pub mod scheduler;

pub use clock::{Clock, SystemClock};
pub use device_registry::DeviceRegistry;
pub use event_bus::EventPublisher;
pub use metrics_store::MetricsStore;
pub use scheduler::Scheduler;
