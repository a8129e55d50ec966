//! Keyed collection stores for pending notifications and client states.

pub mod jsonl;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use jsonl::JsonlStore;
pub use memory::InMemoryStore;

/// Errors reported by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Entry could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    /// Operation issued before `init_and_load`.
    #[error("store not initialized")]
    NotInitialized,
    /// Backend refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A keyed collection persisted by an external backend.
///
/// `add` and `update` both upsert; the split mirrors the intent of the
/// caller so that backends can index differently.
#[async_trait]
pub trait CollectionStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Open the backend and return every stored entry.
    async fn init_and_load(&self) -> Result<Vec<T>, StoreError>;
    /// Insert a new entry.
    async fn add(&self, key: &str, entry: &T) -> Result<(), StoreError>;
    /// Replace an existing entry.
    async fn update(&self, key: &str, entry: &T) -> Result<(), StoreError>;
    /// Remove an entry. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
