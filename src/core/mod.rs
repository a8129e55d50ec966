//! Core scheduling abstractions and throttling state.

pub mod background_task;
pub mod client;
pub mod error;
pub mod impression_tracker;
pub mod init_aware;
pub mod notification_manager;
pub mod scheduler;
pub mod types;

pub use background_task::{
    next_task_window, BackgroundTaskScheduler, NoopBackgroundTaskScheduler, TaskWindow,
};
pub use client::{ClientRegistrar, NotificationSchedulerClient};
pub use error::{AppResult, SchedulerError};
pub use impression_tracker::ImpressionHistoryTracker;
pub use init_aware::{InitAwareNotificationScheduler, PendingCall};
pub use notification_manager::ScheduledNotificationManager;
pub use scheduler::{
    NotificationScheduler, NotificationSchedulerImpl, SchedulerContext, SchedulerPhase,
};
pub use types::{
    ButtonClickInfo, ButtonType, ClientOverview, ClientState, DisplayData, Impression,
    ImpressionResult, NotificationData, NotificationEntry, NotificationParams, Priority,
    ScheduleOutcome, ScheduleParams, SchedulerClientType, SchedulerTaskTime, SuppressionInfo,
    UserActionData, UserActionType, UserFeedback,
};
