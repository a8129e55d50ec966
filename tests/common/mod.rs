//! Hand-written fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use notification_scheduler::core::{
    ClientOverview, DisplayData, NotificationData, NotificationParams, NotificationScheduler,
    NotificationSchedulerClient, ScheduleOutcome, ScheduleParams, SchedulerClientType,
    SchedulerError, SchedulerTaskTime, UserActionData,
};
use notification_scheduler::infra::{CollectionStore, InMemoryStore, StoreError};
use tokio::sync::{Mutex, Notify};

/// 2024-05-10 12:00 UTC.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

pub fn params(guid: &str, client_type: SchedulerClientType) -> NotificationParams {
    NotificationParams::new(
        client_type,
        NotificationData {
            title: format!("title {guid}"),
            message: "message".to_string(),
            ..NotificationData::default()
        },
        ScheduleParams::default(),
    )
    .with_guid(guid)
}

// Display client that records everything the scheduler tells it.
#[derive(Default)]
pub struct RecordingClient {
    shown: Mutex<Vec<DisplayData>>,
    initialized: Mutex<Vec<(bool, BTreeSet<String>)>>,
    actions: Mutex<Vec<UserActionData>>,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn shown_guids(&self) -> Vec<String> {
        self.shown.lock().await.iter().map(|d| d.guid.clone()).collect()
    }

    pub async fn shown(&self) -> Vec<DisplayData> {
        self.shown.lock().await.clone()
    }

    pub async fn initialized(&self) -> Vec<(bool, BTreeSet<String>)> {
        self.initialized.lock().await.clone()
    }

    pub async fn actions(&self) -> Vec<UserActionData> {
        self.actions.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSchedulerClient for RecordingClient {
    async fn show_notification(&self, data: DisplayData) {
        self.shown.lock().await.push(data);
    }

    async fn on_scheduler_initialized(&self, success: bool, guids: BTreeSet<String>) {
        self.initialized.lock().await.push((success, guids));
    }

    async fn on_user_action(&self, action: &UserActionData) {
        self.actions.lock().await.push(action.clone());
    }
}

// Store that can be told to fail loading or writing.
pub struct FailingStore<T> {
    inner: InMemoryStore<T>,
    fail_load: bool,
    fail_writes: AtomicBool,
}

impl<T> FailingStore<T> {
    pub fn failing_load() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_load: true,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn healthy() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_load: false,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<T> CollectionStore<T> for FailingStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn init_and_load(&self) -> Result<Vec<T>, StoreError> {
        if self.fail_load {
            return Err(StoreError::Unavailable("database corrupted".to_string()));
        }
        self.inner.init_and_load().await
    }

    async fn add(&self, key: &str, entry: &T) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.add(key, entry).await
    }

    async fn update(&self, key: &str, entry: &T) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.update(key, entry).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.delete(key).await
    }
}

// Scheduler that records the calls it receives, in order.
pub struct RecordingScheduler {
    calls: Mutex<Vec<String>>,
    init_success: bool,
    init_gate: Option<Arc<Notify>>,
}

impl RecordingScheduler {
    pub fn new(init_success: bool) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            init_success,
            init_gate: None,
        }
    }

    /// `init` does not resolve until `gate` is notified.
    pub fn gated(init_success: bool, gate: Arc<Notify>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            init_success,
            init_gate: Some(gate),
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    async fn init(&self) -> Result<(), SchedulerError> {
        self.record("init".to_string()).await;
        if let Some(gate) = &self.init_gate {
            gate.notified().await;
        }
        if self.init_success {
            Ok(())
        } else {
            Err(SchedulerError::InitFailed("mock".to_string()))
        }
    }

    async fn schedule(
        &self,
        params: NotificationParams,
    ) -> Result<ScheduleOutcome, SchedulerError> {
        self.record(format!("schedule:{}", params.guid)).await;
        Ok(ScheduleOutcome::Shown)
    }

    async fn cancel(&self, guid: &str) -> Result<bool, SchedulerError> {
        self.record(format!("cancel:{guid}")).await;
        Ok(true)
    }

    async fn delete_all_notifications(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<(), SchedulerError> {
        self.record(format!("delete_all:{client_type}")).await;
        Ok(())
    }

    async fn get_client_overview(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<ClientOverview, SchedulerError> {
        self.record(format!("overview:{client_type}")).await;
        Ok(ClientOverview {
            client_type,
            shown_today: 0,
            current_max_daily_show: 0,
            suppression_info: None,
            num_scheduled: 0,
        })
    }

    async fn on_start_task(&self, task_time: SchedulerTaskTime) -> Result<(), SchedulerError> {
        self.record(format!("start:{task_time:?}")).await;
        Ok(())
    }

    async fn on_stop_task(&self, task_time: SchedulerTaskTime) -> Result<(), SchedulerError> {
        self.record(format!("stop:{task_time:?}")).await;
        Ok(())
    }

    async fn on_user_action(&self, action: UserActionData) -> Result<(), SchedulerError> {
        self.record(format!("action:{}", action.guid)).await;
        Ok(())
    }
}
