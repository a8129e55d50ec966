//! Tokio-backed background task scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::core::{
    BackgroundTaskScheduler, NotificationScheduler, SchedulerError, SchedulerTaskTime,
};

struct ScheduledWakeup {
    generation: u64,
    task_time: SchedulerTaskTime,
    join: JoinHandle<()>,
}

/// Wakes an attached scheduler from a tokio task once the requested window
/// opens, then runs `on_start_task` followed by `on_stop_task`.
///
/// Only one wake-up is outstanding at a time; scheduling again aborts the
/// previous one. The scheduler is held weakly so that dropping it stops
/// further wake-ups.
pub struct TokioBackgroundTaskScheduler {
    handle: Handle,
    handler: Mutex<Option<Weak<dyn NotificationScheduler>>>,
    current: Arc<Mutex<Option<ScheduledWakeup>>>,
    generation: AtomicU64,
}

impl TokioBackgroundTaskScheduler {
    /// Create a scheduler spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            handler: Mutex::new(None),
            current: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Create a scheduler spawning onto the runtime of the calling task.
    pub fn from_current() -> Result<Self, SchedulerError> {
        let handle = Handle::try_current()
            .map_err(|e| SchedulerError::Backend(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(handle))
    }

    /// Attach the scheduler that receives wake-ups.
    pub fn attach<S>(&self, scheduler: &Arc<S>)
    where
        S: NotificationScheduler + 'static,
    {
        let scheduler: Arc<dyn NotificationScheduler> = scheduler.clone();
        *self.handler.lock() = Some(Arc::downgrade(&scheduler));
    }

    /// Whether a wake-up is pending.
    pub fn is_scheduled(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Task time of the pending wake-up.
    pub fn scheduled_task_time(&self) -> Option<SchedulerTaskTime> {
        self.current.lock().as_ref().map(|w| w.task_time)
    }
}

impl BackgroundTaskScheduler for TokioBackgroundTaskScheduler {
    fn schedule(&self, task_time: SchedulerTaskTime, window_start: Duration, window_end: Duration) {
        let Some(handler) = self.handler.lock().clone() else {
            tracing::warn!(?task_time, "no scheduler attached, background task not scheduled");
            return;
        };
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        // Held until the new wake-up is stored so the task cannot observe a
        // stale slot.
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.join.abort();
        }

        let slot = Arc::clone(&self.current);
        let join = self.handle.spawn(async move {
            tokio::time::sleep(window_start).await;
            {
                let mut current = slot.lock();
                if current.as_ref().is_some_and(|w| w.generation == generation) {
                    *current = None;
                }
            }
            let Some(scheduler) = handler.upgrade() else {
                tracing::debug!(?task_time, "scheduler dropped before background task fired");
                return;
            };
            tracing::info!(?task_time, "background task started");
            if let Err(err) = scheduler.on_start_task(task_time).await {
                tracing::warn!(?task_time, "background task start failed: {}", err);
            }
            if let Err(err) = scheduler.on_stop_task(task_time).await {
                tracing::warn!(?task_time, "background task stop failed: {}", err);
            }
        });

        tracing::debug!(
            ?task_time,
            ?window_start,
            ?window_end,
            generation,
            "background wake-up armed"
        );
        *current = Some(ScheduledWakeup {
            generation,
            task_time,
            join,
        });
    }

    fn cancel(&self) {
        if let Some(previous) = self.current.lock().take() {
            previous.join.abort();
            tracing::debug!(task_time = ?previous.task_time, "background wake-up cancelled");
        }
    }
}

impl Drop for TokioBackgroundTaskScheduler {
    fn drop(&mut self) {
        if let Some(previous) = self.current.lock().take() {
            previous.join.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_without_schedule_is_noop() {
        let background = TokioBackgroundTaskScheduler::from_current().unwrap();
        background.cancel();
        assert!(!background.is_scheduled());
    }

    #[tokio::test]
    async fn test_schedule_without_handler_is_ignored() {
        let background = TokioBackgroundTaskScheduler::from_current().unwrap();
        background.schedule(
            SchedulerTaskTime::Morning,
            Duration::from_secs(60),
            Duration::from_secs(120),
        );
        assert!(!background.is_scheduled());
    }

    #[test]
    fn test_from_current_outside_runtime_fails() {
        assert!(matches!(
            TokioBackgroundTaskScheduler::from_current(),
            Err(SchedulerError::Backend(_))
        ));
    }
}
