//! Pending notification bookkeeping.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::core::types::{NotificationEntry, SchedulerClientType};
use crate::core::SchedulerError;
use crate::infra::store::CollectionStore;

/// Owns pending [`NotificationEntry`] records and mirrors every change into
/// the persisted store.
pub struct ScheduledNotificationManager {
    store: Arc<dyn CollectionStore<NotificationEntry>>,
    notifications: Mutex<HashMap<String, NotificationEntry>>,
}

impl ScheduledNotificationManager {
    /// Create a manager backed by `store`.
    pub fn new(store: Arc<dyn CollectionStore<NotificationEntry>>) -> Self {
        Self {
            store,
            notifications: Mutex::new(HashMap::new()),
        }
    }

    /// Load pending entries from the store.
    pub async fn init(&self) -> Result<(), SchedulerError> {
        let entries = self
            .store
            .init_and_load()
            .await
            .map_err(|e| SchedulerError::InitFailed(format!("notification store: {e}")))?;
        let mut notifications = self.notifications.lock();
        for entry in entries {
            notifications.insert(entry.guid.clone(), entry);
        }
        tracing::debug!(pending = notifications.len(), "scheduled notifications loaded");
        Ok(())
    }

    /// Add a pending entry. The in-memory copy is rolled back if the store
    /// write fails.
    pub async fn schedule_notification(
        &self,
        entry: NotificationEntry,
    ) -> Result<(), SchedulerError> {
        let guid = entry.guid.clone();
        {
            let mut notifications = self.notifications.lock();
            if notifications.contains_key(&guid) {
                return Err(SchedulerError::DuplicateGuid(guid));
            }
            notifications.insert(guid.clone(), entry.clone());
        }

        if let Err(err) = self.store.add(&guid, &entry).await {
            self.notifications.lock().remove(&guid);
            tracing::warn!(guid = %guid, "failed to persist notification: {}", err);
            return Err(err.into());
        }
        Ok(())
    }

    /// Remove and return the entry for `guid`. A failed store delete is
    /// logged; the entry is still handed out.
    pub async fn take_notification(&self, guid: &str) -> Option<NotificationEntry> {
        let entry = self.notifications.lock().remove(guid)?;
        if let Err(err) = self.store.delete(guid).await {
            tracing::warn!(guid, "failed to delete persisted notification: {}", err);
        }
        Some(entry)
    }

    /// Remove every entry of `client_type`. Returns the number removed.
    ///
    /// Stops at the first failed store delete; that entry and the ones not
    /// yet deleted are put back so memory matches the store.
    pub async fn delete_notifications(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<usize, SchedulerError> {
        let removed: Vec<NotificationEntry> = {
            let mut notifications = self.notifications.lock();
            let guids: Vec<String> = notifications
                .values()
                .filter(|e| e.client_type == client_type)
                .map(|e| e.guid.clone())
                .collect();
            guids.iter().filter_map(|guid| notifications.remove(guid)).collect()
        };
        for (index, entry) in removed.iter().enumerate() {
            if let Err(err) = self.store.delete(&entry.guid).await {
                let mut notifications = self.notifications.lock();
                for kept in &removed[index..] {
                    notifications.insert(kept.guid.clone(), kept.clone());
                }
                tracing::warn!(
                    guid = %entry.guid,
                    restored = removed.len() - index,
                    "failed to delete persisted notification: {}",
                    err
                );
                return Err(err.into());
            }
        }
        Ok(removed.len())
    }

    /// Drop entries whose delivery window ended before `now`.
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = {
            let mut notifications = self.notifications.lock();
            let guids: Vec<String> = notifications
                .values()
                .filter(|e| e.is_expired(now))
                .map(|e| e.guid.clone())
                .collect();
            for guid in &guids {
                notifications.remove(guid);
            }
            guids
        };
        for guid in &expired {
            if let Err(err) = self.store.delete(guid).await {
                tracing::warn!(guid = %guid, "failed to delete expired notification: {}", err);
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired notifications dropped");
        }
        expired.len()
    }

    /// Whether `guid` is pending.
    pub fn contains(&self, guid: &str) -> bool {
        self.notifications.lock().contains_key(guid)
    }

    /// Pending entries grouped by client, each group sorted by creation time.
    pub fn notifications_by_client(&self) -> BTreeMap<SchedulerClientType, Vec<NotificationEntry>> {
        let mut grouped: BTreeMap<SchedulerClientType, Vec<NotificationEntry>> = BTreeMap::new();
        for entry in self.notifications.lock().values() {
            grouped.entry(entry.client_type).or_default().push(entry.clone());
        }
        for entries in grouped.values_mut() {
            entries.sort_by_key(|e| e.create_time);
        }
        grouped
    }

    /// All pending entries in dispatch order: priority first, then
    /// creation time.
    pub fn pending_entries(&self) -> Vec<NotificationEntry> {
        let mut entries: Vec<NotificationEntry> =
            self.notifications.lock().values().cloned().collect();
        entries.sort_by(|a, b| {
            b.schedule_params
                .priority
                .cmp(&a.schedule_params.priority)
                .then_with(|| a.create_time.cmp(&b.create_time))
                .then_with(|| a.guid.cmp(&b.guid))
        });
        entries
    }

    /// Guids pending for `client_type`.
    pub fn guids_for(&self, client_type: SchedulerClientType) -> BTreeSet<String> {
        self.notifications
            .lock()
            .values()
            .filter(|e| e.client_type == client_type)
            .map(|e| e.guid.clone())
            .collect()
    }

    /// Number of pending entries of `client_type`.
    pub fn count_for(&self, client_type: SchedulerClientType) -> usize {
        self.notifications
            .lock()
            .values()
            .filter(|e| e.client_type == client_type)
            .count()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.notifications.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.notifications.lock().is_empty()
    }
}
