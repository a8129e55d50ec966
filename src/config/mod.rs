//! Configuration models for throttling policy, background tasks and storage.

pub mod scheduler;

pub use scheduler::{SchedulerConfig, StoreBackendConfig};
