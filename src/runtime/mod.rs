//! Runtime adapters driving background wake-ups.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_task;

#[cfg(feature = "tokio-runtime")]
pub use tokio_task::TokioBackgroundTaskScheduler;
