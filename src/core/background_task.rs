//! Background task wake-up contract and window computation.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::SchedulerConfig;
use crate::core::types::SchedulerTaskTime;
use crate::util::clock::day_start;

/// OS-level task scheduler that wakes the process inside a window and
/// then calls `on_start_task` / `on_stop_task` on the scheduler.
pub trait BackgroundTaskScheduler: Send + Sync {
    /// Request a wake-up between `window_start` and `window_end` from now.
    /// Replaces any previously requested wake-up.
    fn schedule(&self, task_time: SchedulerTaskTime, window_start: Duration, window_end: Duration);

    /// Cancel the pending wake-up, if any.
    fn cancel(&self);
}

/// Background task scheduler that never wakes anything. Useful when the
/// embedder drives `on_start_task` itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackgroundTaskScheduler;

impl BackgroundTaskScheduler for NoopBackgroundTaskScheduler {
    fn schedule(
        &self,
        _task_time: SchedulerTaskTime,
        _window_start: Duration,
        _window_end: Duration,
    ) {
    }

    fn cancel(&self) {}
}

/// Absolute wake-up window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskWindow {
    /// Which daily slot the window belongs to.
    pub task_time: SchedulerTaskTime,
    /// Window start.
    pub start: DateTime<Utc>,
    /// Window end.
    pub end: DateTime<Utc>,
}

impl TaskWindow {
    /// Window bounds relative to `now`, clamped at zero.
    pub fn delays_from(&self, now: DateTime<Utc>) -> (Duration, Duration) {
        let start = (self.start - now).to_std().unwrap_or_default();
        let end = (self.end - now).to_std().unwrap_or_default();
        (start, end)
    }
}

/// Next morning or evening slot strictly after `now`.
pub fn next_task_window(now: DateTime<Utc>, config: &SchedulerConfig) -> TaskWindow {
    let today = day_start(now);
    let slot = |day: DateTime<Utc>, hour: u32| day + chrono::Duration::hours(i64::from(hour));
    let candidates = [
        (SchedulerTaskTime::Morning, slot(today, config.morning_task_hour)),
        (SchedulerTaskTime::Evening, slot(today, config.evening_task_hour)),
        (
            SchedulerTaskTime::Morning,
            slot(today + chrono::Duration::days(1), config.morning_task_hour),
        ),
    ];
    let (task_time, start) = candidates
        .into_iter()
        .find(|(_, start)| *start > now)
        .unwrap_or(candidates[2]);
    let window = chrono::Duration::from_std(config.background_task_window())
        .unwrap_or_else(|_| chrono::Duration::hours(1));
    TaskWindow {
        task_time,
        start,
        end: start + window,
    }
}
