//! Notification scheduler trait and its store-backed implementation.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::SchedulerConfig;
use crate::core::background_task::{next_task_window, BackgroundTaskScheduler};
use crate::core::client::ClientRegistrar;
use crate::core::impression_tracker::ImpressionHistoryTracker;
use crate::core::notification_manager::ScheduledNotificationManager;
use crate::core::types::{
    ClientOverview, DisplayData, NotificationEntry, NotificationParams, Priority, ScheduleOutcome,
    SchedulerClientType, SchedulerTaskTime, UserActionData, UserFeedback,
};
use crate::core::SchedulerError;
use crate::util::clock::Clock;

/// Public scheduling API shared by the scheduler and its decorators.
///
/// Implementations are expected to be driven from a single logical
/// sequence; all methods take `&self` and are safe to call concurrently.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Load persisted state. Must be called exactly once.
    async fn init(&self) -> Result<(), SchedulerError>;

    /// Show a notification now if throttling allows it, otherwise persist
    /// it for a later background task.
    async fn schedule(&self, params: NotificationParams) -> Result<ScheduleOutcome, SchedulerError>;

    /// Remove a pending notification. Returns `false` if it is not pending.
    async fn cancel(&self, guid: &str) -> Result<bool, SchedulerError>;

    /// Remove every pending notification of a client.
    async fn delete_all_notifications(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<(), SchedulerError>;

    /// Throttling snapshot of a client.
    async fn get_client_overview(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<ClientOverview, SchedulerError>;

    /// The background task started; dispatch eligible notifications.
    async fn on_start_task(&self, task_time: SchedulerTaskTime) -> Result<(), SchedulerError>;

    /// The background task is about to stop; persist state.
    async fn on_stop_task(&self, task_time: SchedulerTaskTime) -> Result<(), SchedulerError>;

    /// The user interacted with a shown notification.
    async fn on_user_action(&self, action: UserActionData) -> Result<(), SchedulerError>;
}

/// Lifecycle of [`NotificationSchedulerImpl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// `init` not called yet.
    Uninitialized,
    /// Loading persisted state.
    Initializing,
    /// Accepting calls.
    Ready,
    /// Loading failed; every call is a no-op.
    Failed,
}

/// Collaborators of [`NotificationSchedulerImpl`].
pub struct SchedulerContext {
    /// Throttling policy.
    pub config: SchedulerConfig,
    /// Display clients.
    pub clients: ClientRegistrar,
    /// Impression history.
    pub tracker: ImpressionHistoryTracker,
    /// Pending notifications.
    pub manager: ScheduledNotificationManager,
    /// Wake-up scheduling.
    pub background_task: Arc<dyn BackgroundTaskScheduler>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Scheduler coordinating impression tracking, pending storage, display
/// clients and background wake-ups.
pub struct NotificationSchedulerImpl {
    context: SchedulerContext,
    phase: Mutex<SchedulerPhase>,
}

impl NotificationSchedulerImpl {
    /// Create an uninitialized scheduler.
    pub fn new(context: SchedulerContext) -> Self {
        Self {
            context,
            phase: Mutex::new(SchedulerPhase::Uninitialized),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.lock()
    }

    /// Impression tracker, for inspection.
    pub const fn tracker(&self) -> &ImpressionHistoryTracker {
        &self.context.tracker
    }

    /// Pending notification manager, for inspection.
    pub const fn manager(&self) -> &ScheduledNotificationManager {
        &self.context.manager
    }

    /// `Ok(true)` when ready, `Ok(false)` when initialization failed and
    /// the call must be ignored.
    fn ensure_ready(&self) -> Result<bool, SchedulerError> {
        match self.phase() {
            SchedulerPhase::Ready => Ok(true),
            SchedulerPhase::Failed => Ok(false),
            SchedulerPhase::Uninitialized | SchedulerPhase::Initializing => {
                Err(SchedulerError::NotInitialized)
            }
        }
    }

    async fn load_state(&self) -> Result<(), SchedulerError> {
        self.context.manager.init().await?;
        self.context.tracker.init().await
    }

    fn should_show(&self, entry: &NotificationEntry, now: DateTime<Utc>) -> bool {
        if entry.schedule_params.priority == Priority::NoThrottle {
            return true;
        }
        let tracker = &self.context.tracker;
        if tracker.total_shown_today(now) >= self.context.config.max_daily_shown_all_type as usize {
            tracing::debug!(guid = %entry.guid, "global daily cap reached");
            return false;
        }
        tracker.can_show_notification(entry.client_type, now)
    }

    async fn show(
        &self,
        entry: NotificationEntry,
        task_time: SchedulerTaskTime,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let client = self
            .context
            .clients
            .get_client(entry.client_type)
            .ok_or(SchedulerError::UnknownClient(entry.client_type))?;
        self.context
            .tracker
            .record_impression(entry.client_type, &entry.guid, task_time, now)?;
        if let Err(err) = self.context.tracker.flush().await {
            tracing::warn!(guid = %entry.guid, "impression not persisted yet: {}", err);
        }
        tracing::info!(
            guid = %entry.guid,
            client = %entry.client_type,
            ?task_time,
            "showing notification"
        );
        client.show_notification(DisplayData::from(entry)).await;
        Ok(())
    }

    fn schedule_background_task(&self) {
        let background = &self.context.background_task;
        if self.context.manager.is_empty() {
            background.cancel();
            return;
        }
        let now = self.context.clock.now();
        let window = next_task_window(now, &self.context.config);
        let (start, end) = window.delays_from(now);
        tracing::debug!(
            task_time = ?window.task_time,
            start = %window.start,
            "background task scheduled"
        );
        background.schedule(window.task_time, start, end);
    }
}

#[async_trait]
impl NotificationScheduler for NotificationSchedulerImpl {
    async fn init(&self) -> Result<(), SchedulerError> {
        {
            let mut phase = self.phase.lock();
            if *phase != SchedulerPhase::Uninitialized {
                return Err(SchedulerError::InvalidState(format!("init called while {:?}", *phase)));
            }
            *phase = SchedulerPhase::Initializing;
        }

        let result = self.load_state().await;
        let success = result.is_ok();
        *self.phase.lock() = if success { SchedulerPhase::Ready } else { SchedulerPhase::Failed };

        match &result {
            Ok(()) => tracing::info!(
                pending = self.context.manager.len(),
                "notification scheduler initialized"
            ),
            Err(err) => tracing::warn!("notification scheduler failed to initialize: {}", err),
        }

        for client_type in self.context.clients.registered_types() {
            let Some(client) = self.context.clients.get_client(client_type) else {
                continue;
            };
            let guids = if success {
                self.context.manager.guids_for(client_type)
            } else {
                BTreeSet::new()
            };
            client.on_scheduler_initialized(success, guids).await;
        }

        if success {
            self.schedule_background_task();
        }
        result
    }

    async fn schedule(
        &self,
        params: NotificationParams,
    ) -> Result<ScheduleOutcome, SchedulerError> {
        if params.guid.is_empty() {
            return Err(SchedulerError::InvalidRequest("notification guid is empty".into()));
        }
        if !self.ensure_ready()? {
            tracing::debug!(guid = %params.guid, "scheduler failed to initialize, request dropped");
            return Ok(ScheduleOutcome::Dropped);
        }
        if self.context.clients.get_client(params.client_type).is_none() {
            return Err(SchedulerError::UnknownClient(params.client_type));
        }
        // A guid already shown stays taken so feedback reaches one impression.
        if self.context.manager.contains(&params.guid)
            || self.context.tracker.has_impression(&params.guid)
        {
            return Err(SchedulerError::DuplicateGuid(params.guid));
        }

        let now = self.context.clock.now();
        let entry = NotificationEntry::from_params(params, now);
        if entry.is_expired(now) {
            tracing::info!(guid = %entry.guid, "delivery window already over");
            return Ok(ScheduleOutcome::Expired);
        }
        if entry.is_deliverable(now) && self.should_show(&entry, now) {
            self.show(entry, SchedulerTaskTime::Unknown, now).await?;
            return Ok(ScheduleOutcome::Shown);
        }

        tracing::debug!(guid = %entry.guid, client = %entry.client_type, "notification deferred");
        self.context.manager.schedule_notification(entry).await?;
        self.schedule_background_task();
        Ok(ScheduleOutcome::Deferred)
    }

    async fn cancel(&self, guid: &str) -> Result<bool, SchedulerError> {
        if !self.ensure_ready()? {
            return Ok(false);
        }
        let cancelled = self.context.manager.take_notification(guid).await.is_some();
        if cancelled {
            tracing::info!(guid, "notification cancelled");
            self.schedule_background_task();
        }
        Ok(cancelled)
    }

    async fn delete_all_notifications(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<(), SchedulerError> {
        if !self.ensure_ready()? {
            return Ok(());
        }
        let removed = self.context.manager.delete_notifications(client_type).await?;
        tracing::info!(client = %client_type, removed, "pending notifications deleted");
        self.schedule_background_task();
        Ok(())
    }

    async fn get_client_overview(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<ClientOverview, SchedulerError> {
        if !self.ensure_ready()? {
            return Err(SchedulerError::InitFailed("scheduler failed to initialize".into()));
        }
        let now = self.context.clock.now();
        let state = self
            .context
            .tracker
            .client_state(client_type)
            .ok_or(SchedulerError::UnknownClient(client_type))?;
        Ok(ClientOverview {
            client_type,
            shown_today: self.context.tracker.shown_today(client_type, now),
            current_max_daily_show: state.current_max_daily_show,
            suppression_info: state.suppression_info,
            num_scheduled: self.context.manager.count_for(client_type),
        })
    }

    async fn on_start_task(&self, task_time: SchedulerTaskTime) -> Result<(), SchedulerError> {
        if !self.ensure_ready()? {
            return Ok(());
        }
        let now = self.context.clock.now();
        self.context.tracker.integrate(now);
        self.context.manager.prune_expired(now).await;

        let mut shown = 0_usize;
        for candidate in self.context.manager.pending_entries() {
            if self.context.clients.get_client(candidate.client_type).is_none() {
                tracing::debug!(
                    guid = %candidate.guid,
                    client = %candidate.client_type,
                    "no client registered"
                );
                continue;
            }
            if !candidate.is_deliverable(now) || !self.should_show(&candidate, now) {
                continue;
            }
            if let Some(entry) = self.context.manager.take_notification(&candidate.guid).await {
                self.show(entry, task_time, now).await?;
                shown += 1;
            }
        }

        tracing::info!(
            ?task_time,
            shown,
            remaining = self.context.manager.len(),
            "background task processed"
        );
        self.schedule_background_task();
        Ok(())
    }

    async fn on_stop_task(&self, task_time: SchedulerTaskTime) -> Result<(), SchedulerError> {
        if !self.ensure_ready()? {
            return Ok(());
        }
        tracing::debug!(?task_time, "background task stopping");
        self.context.tracker.flush().await?;
        self.schedule_background_task();
        Ok(())
    }

    async fn on_user_action(&self, action: UserActionData) -> Result<(), SchedulerError> {
        if !self.ensure_ready()? {
            return Ok(());
        }
        let feedback = action.feedback();
        if feedback != UserFeedback::NoFeedback {
            let now = self.context.clock.now();
            if self.context.tracker.record_feedback(&action.guid, feedback, now) {
                if let Err(err) = self.context.tracker.flush().await {
                    tracing::warn!(guid = %action.guid, "feedback not persisted yet: {}", err);
                }
            } else {
                tracing::debug!(guid = %action.guid, "no impression for user action");
            }
        }
        if let Some(client) = self.context.clients.get_client(action.client_type) {
            client.on_user_action(&action).await;
        }
        Ok(())
    }
}
