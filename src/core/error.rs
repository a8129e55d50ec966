//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::types::SchedulerClientType;
use crate::infra::store::StoreError;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler has not finished initializing.
    #[error("scheduler not initialized")]
    NotInitialized,
    /// Loading persisted state failed; the scheduler is unusable.
    #[error("initialization failed: {0}")]
    InitFailed(String),
    /// The call violates the scheduler's lifecycle contract.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The request was rejected before any persistence attempt.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A pending notification already uses this guid.
    #[error("duplicate guid: {0}")]
    DuplicateGuid(String),
    /// No client is registered for the notification's client type.
    #[error("unknown client: {0}")]
    UnknownClient(SchedulerClientType),
    /// Writing to the persisted store failed.
    #[error("persistence error: {0}")]
    Persistence(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for SchedulerError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
