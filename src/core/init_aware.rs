//! Decorator that hides asynchronous initialization from early callers.
//!
//! Calls made before `init` resolves are captured as [`PendingCall`]s in
//! submission order. When initialization succeeds they are replayed once
//! against the wrapped scheduler and the decorator turns into a plain
//! passthrough. When it fails the buffer is discarded and every later call
//! becomes a no-op.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::scheduler::NotificationScheduler;
use crate::core::types::{
    ClientOverview, NotificationParams, ScheduleOutcome, SchedulerClientType, SchedulerTaskTime,
    UserActionData,
};
use crate::core::SchedulerError;

/// A call captured before initialization finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingCall {
    /// [`NotificationScheduler::schedule`].
    Schedule(NotificationParams),
    /// [`NotificationScheduler::cancel`].
    Cancel(String),
    /// [`NotificationScheduler::delete_all_notifications`].
    DeleteAllNotifications(SchedulerClientType),
    /// [`NotificationScheduler::on_start_task`].
    OnStartTask(SchedulerTaskTime),
    /// [`NotificationScheduler::on_stop_task`].
    OnStopTask(SchedulerTaskTime),
    /// [`NotificationScheduler::on_user_action`].
    OnUserAction(UserActionData),
}

impl PendingCall {
    const fn name(&self) -> &'static str {
        match self {
            Self::Schedule(_) => "schedule",
            Self::Cancel(_) => "cancel",
            Self::DeleteAllNotifications(_) => "delete_all_notifications",
            Self::OnStartTask(_) => "on_start_task",
            Self::OnStopTask(_) => "on_stop_task",
            Self::OnUserAction(_) => "on_user_action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WrapperPhase {
    /// Init not resolved, or buffered calls still replaying.
    Pending,
    Ready,
    Failed,
}

#[derive(Debug)]
struct WrapperState {
    phase: WrapperPhase,
    calls: VecDeque<PendingCall>,
    init_requested: bool,
}

enum Route {
    Forward,
    Buffered,
    Dropped,
}

/// Buffers calls until the wrapped scheduler finishes `init`.
pub struct InitAwareNotificationScheduler<S> {
    inner: S,
    state: Mutex<WrapperState>,
}

impl<S: NotificationScheduler> InitAwareNotificationScheduler<S> {
    /// Wrap `inner`, which must not have been initialized yet.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Mutex::new(WrapperState {
                phase: WrapperPhase::Pending,
                calls: VecDeque::new(),
                init_requested: false,
            }),
        }
    }

    /// The wrapped scheduler.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of buffered calls.
    pub fn pending_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Whether calls go straight to the wrapped scheduler.
    pub fn is_ready(&self) -> bool {
        self.state.lock().phase == WrapperPhase::Ready
    }

    fn route(&self, call: impl FnOnce() -> PendingCall) -> Route {
        let mut state = self.state.lock();
        match state.phase {
            WrapperPhase::Ready => Route::Forward,
            WrapperPhase::Failed => Route::Dropped,
            WrapperPhase::Pending => {
                let call = call();
                tracing::debug!(
                    call = call.name(),
                    queued = state.calls.len() + 1,
                    "call buffered until init"
                );
                state.calls.push_back(call);
                Route::Buffered
            }
        }
    }

    /// Replays buffered calls until the queue stays empty, then switches to
    /// passthrough. Calls buffered during replay run after the current batch.
    async fn flush_pending_calls(&self) {
        let mut replayed = 0_usize;
        loop {
            let batch: Vec<PendingCall> = {
                let mut state = self.state.lock();
                if state.calls.is_empty() {
                    state.phase = WrapperPhase::Ready;
                    break;
                }
                state.calls.drain(..).collect()
            };
            for call in batch {
                self.replay(call).await;
                replayed += 1;
            }
        }
        tracing::info!(replayed, "buffered scheduler calls flushed");
    }

    async fn replay(&self, call: PendingCall) {
        let name = call.name();
        let result = match call {
            PendingCall::Schedule(params) => self.inner.schedule(params).await.map(|outcome| {
                tracing::debug!(?outcome, "buffered schedule replayed");
            }),
            PendingCall::Cancel(guid) => self.inner.cancel(&guid).await.map(|_| ()),
            PendingCall::DeleteAllNotifications(client_type) => {
                self.inner.delete_all_notifications(client_type).await
            }
            PendingCall::OnStartTask(task_time) => self.inner.on_start_task(task_time).await,
            PendingCall::OnStopTask(task_time) => self.inner.on_stop_task(task_time).await,
            PendingCall::OnUserAction(action) => self.inner.on_user_action(action).await,
        };
        if let Err(err) = result {
            tracing::error!(call = name, "buffered call failed on replay: {}", err);
        }
    }
}

#[async_trait]
impl<S: NotificationScheduler> NotificationScheduler for InitAwareNotificationScheduler<S> {
    async fn init(&self) -> Result<(), SchedulerError> {
        {
            let mut state = self.state.lock();
            if state.init_requested {
                return Err(SchedulerError::InvalidState("init already requested".into()));
            }
            state.init_requested = true;
        }

        match self.inner.init().await {
            Ok(()) => {
                self.flush_pending_calls().await;
                Ok(())
            }
            Err(err) => {
                let dropped = {
                    let mut state = self.state.lock();
                    state.phase = WrapperPhase::Failed;
                    let dropped = state.calls.len();
                    state.calls.clear();
                    dropped
                };
                tracing::warn!(dropped, "scheduler init failed, buffered calls discarded: {}", err);
                Err(err)
            }
        }
    }

    async fn schedule(
        &self,
        params: NotificationParams,
    ) -> Result<ScheduleOutcome, SchedulerError> {
        if params.guid.is_empty() {
            return Err(SchedulerError::InvalidRequest("notification guid is empty".into()));
        }
        match self.route(|| PendingCall::Schedule(params.clone())) {
            Route::Forward => self.inner.schedule(params).await,
            Route::Buffered => Ok(ScheduleOutcome::Buffered),
            Route::Dropped => Ok(ScheduleOutcome::Dropped),
        }
    }

    async fn cancel(&self, guid: &str) -> Result<bool, SchedulerError> {
        {
            let mut state = self.state.lock();
            match state.phase {
                WrapperPhase::Ready => {}
                WrapperPhase::Failed => return Ok(false),
                WrapperPhase::Pending => {
                    let buffered = state.calls.iter().position(
                        |call| matches!(call, PendingCall::Schedule(p) if p.guid == guid),
                    );
                    if let Some(index) = buffered {
                        state.calls.remove(index);
                        tracing::debug!(guid, "buffered schedule cancelled");
                        return Ok(true);
                    }
                    state.calls.push_back(PendingCall::Cancel(guid.to_owned()));
                    return Ok(false);
                }
            }
        }
        self.inner.cancel(guid).await
    }

    async fn delete_all_notifications(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<(), SchedulerError> {
        match self.route(|| PendingCall::DeleteAllNotifications(client_type)) {
            Route::Forward => self.inner.delete_all_notifications(client_type).await,
            Route::Buffered | Route::Dropped => Ok(()),
        }
    }

    async fn get_client_overview(
        &self,
        client_type: SchedulerClientType,
    ) -> Result<ClientOverview, SchedulerError> {
        let phase = self.state.lock().phase;
        match phase {
            WrapperPhase::Ready => self.inner.get_client_overview(client_type).await,
            WrapperPhase::Pending => Err(SchedulerError::NotInitialized),
            WrapperPhase::Failed => Err(SchedulerError::InitFailed(
                "scheduler failed to initialize".into(),
            )),
        }
    }

    async fn on_start_task(&self, task_time: SchedulerTaskTime) -> Result<(), SchedulerError> {
        match self.route(|| PendingCall::OnStartTask(task_time)) {
            Route::Forward => self.inner.on_start_task(task_time).await,
            Route::Buffered | Route::Dropped => Ok(()),
        }
    }

    async fn on_stop_task(&self, task_time: SchedulerTaskTime) -> Result<(), SchedulerError> {
        match self.route(|| PendingCall::OnStopTask(task_time)) {
            Route::Forward => self.inner.on_stop_task(task_time).await,
            Route::Buffered | Route::Dropped => Ok(()),
        }
    }

    async fn on_user_action(&self, action: UserActionData) -> Result<(), SchedulerError> {
        match self.route(|| PendingCall::OnUserAction(action.clone())) {
            Route::Forward => self.inner.on_user_action(action).await,
            Route::Buffered | Route::Dropped => Ok(()),
        }
    }
}
