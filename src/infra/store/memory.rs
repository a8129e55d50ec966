//! In-memory store backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CollectionStore, StoreError};

/// Simple in-memory store for development/testing.
pub struct InMemoryStore<T> {
    entries: Mutex<BTreeMap<String, T>>,
}

impl<T> InMemoryStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create a store pre-populated with entries, as if loaded from disk.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, T)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        self.entries.lock().get(key).cloned()
    }

    /// Stored keys in order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> CollectionStore<T> for InMemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn init_and_load(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.entries.lock().values().cloned().collect())
    }

    async fn add(&self, key: &str, entry: &T) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_owned(), entry.clone());
        Ok(())
    }

    async fn update(&self, key: &str, entry: &T) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_owned(), entry.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
