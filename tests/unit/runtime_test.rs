//! Tests for the tokio background task scheduler

use std::sync::Arc;
use std::time::Duration;

use notification_scheduler::core::{BackgroundTaskScheduler, SchedulerTaskTime};
use notification_scheduler::runtime::TokioBackgroundTaskScheduler;

use crate::common::RecordingScheduler;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wakeup_runs_start_then_stop() {
    let background = TokioBackgroundTaskScheduler::new(tokio::runtime::Handle::current());
    let scheduler = Arc::new(RecordingScheduler::new(true));
    background.attach(&scheduler);

    background.schedule(
        SchedulerTaskTime::Evening,
        Duration::from_millis(20),
        Duration::from_secs(1),
    );
    assert!(background.is_scheduled());
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(scheduler.calls().await, vec!["start:Evening", "stop:Evening"]);
    assert!(!background.is_scheduled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reschedule_replaces_previous_wakeup() {
    let background = TokioBackgroundTaskScheduler::new(tokio::runtime::Handle::current());
    let scheduler = Arc::new(RecordingScheduler::new(true));
    background.attach(&scheduler);

    background.schedule(
        SchedulerTaskTime::Morning,
        Duration::from_millis(50),
        Duration::from_secs(1),
    );
    background.schedule(
        SchedulerTaskTime::Evening,
        Duration::from_millis(50),
        Duration::from_secs(1),
    );
    assert_eq!(background.scheduled_task_time(), Some(SchedulerTaskTime::Evening));
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(scheduler.calls().await, vec!["start:Evening", "stop:Evening"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_prevents_wakeup() {
    let background = TokioBackgroundTaskScheduler::new(tokio::runtime::Handle::current());
    let scheduler = Arc::new(RecordingScheduler::new(true));
    background.attach(&scheduler);

    background.schedule(
        SchedulerTaskTime::Morning,
        Duration::from_millis(50),
        Duration::from_secs(1),
    );
    background.cancel();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(scheduler.calls().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_scheduler_is_not_woken() {
    let background = TokioBackgroundTaskScheduler::new(tokio::runtime::Handle::current());
    let scheduler = Arc::new(RecordingScheduler::new(true));
    background.attach(&scheduler);
    drop(scheduler);

    background.schedule(
        SchedulerTaskTime::Morning,
        Duration::from_millis(10),
        Duration::from_secs(1),
    );
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!background.is_scheduled());
}
