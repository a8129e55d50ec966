//! File-backed store using JSON lines.
//!
//! Each line holds a `[key, entry]` pair. Inserts append; updates and
//! deletes rewrite the file from the in-memory index. When a key appears on
//! several lines the last one wins, so a crash between an append and a
//! rewrite never loses the newest value.

use std::collections::BTreeMap;
use std::fs::{create_dir_all, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use super::{CollectionStore, StoreError};

/// File-backed keyed collection.
pub struct JsonlStore<T> {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<String, T>>>,
}

impl<T> JsonlStore<T> {
    /// Create a store persisting to `path`. Nothing is read until
    /// [`CollectionStore::init_and_load`] is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: Mutex::new(None),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_from_disk(&self) -> Result<BTreeMap<String, T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let mut entries = BTreeMap::new();
        if !self.path.exists() {
            return Ok(entries);
        }
        let file = OpenOptions::new().read(true).open(&self.path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (key, entry): (String, T) = serde_json::from_str(&line)?;
            entries.insert(key, entry);
        }
        Ok(entries)
    }

    fn append_to_disk(&self, key: &str, entry: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(&(key, entry))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn rewrite_disk(&self, entries: &BTreeMap<String, T>) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        for (key, entry) in entries {
            let line = serde_json::to_string(&(key, entry))?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T> CollectionStore<T> for JsonlStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn init_and_load(&self) -> Result<Vec<T>, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let loaded = self.read_from_disk()?;
        let values = loaded.values().cloned().collect();
        *self.entries.lock() = Some(loaded);
        tracing::debug!(path = %self.path.display(), "jsonl store loaded");
        Ok(values)
    }

    async fn add(&self, key: &str, entry: &T) -> Result<(), StoreError> {
        let mut guard = self.entries.lock();
        let entries = guard.as_mut().ok_or(StoreError::NotInitialized)?;
        self.append_to_disk(key, entry)?;
        entries.insert(key.to_owned(), entry.clone());
        Ok(())
    }

    async fn update(&self, key: &str, entry: &T) -> Result<(), StoreError> {
        let mut guard = self.entries.lock();
        let entries = guard.as_mut().ok_or(StoreError::NotInitialized)?;
        let previous = entries.insert(key.to_owned(), entry.clone());
        if let Err(err) = self.rewrite_disk(entries) {
            match previous {
                Some(old) => entries.insert(key.to_owned(), old),
                None => entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock();
        let entries = guard.as_mut().ok_or(StoreError::NotInitialized)?;
        if let Some(old) = entries.remove(key) {
            if let Err(err) = self.rewrite_disk(entries) {
                entries.insert(key.to_owned(), old);
                return Err(err);
            }
        }
        Ok(())
    }
}
