//! Data model shared by the tracker, the scheduler and the stores.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::clock::is_set;

/// Feature (client) that produces scheduled notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerClientType {
    /// Client type could not be determined.
    Unknown,
    /// Test client.
    Test1,
    /// Test client.
    Test2,
    /// Test client.
    Test3,
    /// Browser update reminders.
    ChromeUpdate,
    /// Offline prefetch suggestions.
    Prefetch,
    /// Reading list reminders.
    ReadingList,
    /// Feature discovery hints.
    FeatureGuide,
}

impl SchedulerClientType {
    /// Stable key used when persisting per-client state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Test1 => "test1",
            Self::Test2 => "test2",
            Self::Test3 => "test3",
            Self::ChromeUpdate => "chrome_update",
            Self::Prefetch => "prefetch",
            Self::ReadingList => "reading_list",
            Self::FeatureGuide => "feature_guide",
        }
    }
}

impl fmt::Display for SchedulerClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User feedback attached to an impression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserFeedback {
    /// No feedback received yet.
    #[default]
    NoFeedback,
    /// The user pressed a "helpful" button.
    Helpful,
    /// The user pressed a "not helpful" button.
    NotHelpful,
    /// The user clicked the notification body.
    Click,
    /// The user dismissed the notification.
    Dismiss,
    /// The notification was never interacted with.
    Ignore,
}

/// Result of folding an impression's feedback into the client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpressionResult {
    /// Not evaluated yet.
    #[default]
    Invalid,
    /// Raises the daily quota or counts towards recovery.
    Positive,
    /// Triggers suppression.
    Negative,
    /// Counts towards recovery only.
    Neutral,
}

/// Time-of-day bucket of the background task that produced a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerTaskTime {
    /// Shown outside of a background task.
    #[default]
    Unknown,
    /// Morning background task.
    Morning,
    /// Evening background task.
    Evening,
}

/// Active cooldown for a client after negative feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionInfo {
    /// When the suppression was (last) triggered.
    pub last_trigger_time: DateTime<Utc>,
    /// How long the suppression lasts.
    pub duration: Duration,
    /// Remaining consecutive non-negative impressions needed to lift it.
    pub recover_goal: u32,
}

impl SuppressionInfo {
    /// Create a suppression window starting at `last_trigger_time`.
    pub const fn new(
        last_trigger_time: DateTime<Utc>,
        duration: Duration,
        recover_goal: u32,
    ) -> Self {
        Self {
            last_trigger_time,
            duration,
            recover_goal,
        }
    }

    /// Whether the suppression window has elapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        chrono::Duration::from_std(self.duration)
            .ok()
            .and_then(|d| self.last_trigger_time.checked_add_signed(d))
            .is_some_and(|end| now >= end)
    }
}

/// One notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impression {
    /// Owning client.
    pub client_type: SchedulerClientType,
    /// Guid of the notification that was shown.
    pub guid: String,
    /// When the notification was shown.
    pub create_time: DateTime<Utc>,
    /// Feedback received so far.
    pub feedback: UserFeedback,
    /// Evaluated result of the feedback.
    pub impression: ImpressionResult,
    /// Whether the impression is already folded into the client state.
    pub integrated: bool,
    /// Background task bucket that produced the show.
    pub task_start_time: SchedulerTaskTime,
}

impl Impression {
    /// Create a fresh, un-integrated impression.
    pub fn new(
        client_type: SchedulerClientType,
        guid: impl Into<String>,
        create_time: DateTime<Utc>,
    ) -> Self {
        Self {
            client_type,
            guid: guid.into(),
            create_time,
            feedback: UserFeedback::NoFeedback,
            impression: ImpressionResult::Invalid,
            integrated: false,
            task_start_time: SchedulerTaskTime::Unknown,
        }
    }

    /// Impressions without a creation time are never counted.
    pub fn is_valid(&self) -> bool {
        is_set(self.create_time)
    }
}

/// Impression history and quota of one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// Owning client.
    pub client_type: SchedulerClientType,
    /// Current daily show quota.
    pub current_max_daily_show: u32,
    /// Impressions in chronological order.
    pub impressions: Vec<Impression>,
    /// Present only while a cooldown is active.
    pub suppression_info: Option<SuppressionInfo>,
}

impl ClientState {
    /// Create an empty state with the given daily quota.
    pub const fn new(client_type: SchedulerClientType, current_max_daily_show: u32) -> Self {
        Self {
            client_type,
            current_max_daily_show,
            impressions: Vec::new(),
            suppression_info: None,
        }
    }

    /// Number of valid impressions created at or after `since`.
    pub fn shown_since(&self, since: DateTime<Utc>) -> usize {
        self.impressions
            .iter()
            .filter(|i| i.is_valid() && i.create_time >= since)
            .count()
    }
}

/// Content of a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    /// Title text.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Identifier of the icon resource.
    pub icon_id: Option<String>,
    /// Url opened on click.
    pub url: Option<String>,
    /// Client specific key/value pairs.
    #[serde(default)]
    pub custom_data: BTreeMap<String, String>,
}

/// Scheduling priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Shown only when quota allows.
    #[default]
    Low,
    /// Shown before low priority notifications.
    High,
    /// Bypasses impression based throttling.
    NoThrottle,
}

/// When and how urgently a notification should be delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParams {
    /// Scheduling priority.
    pub priority: Priority,
    /// Earliest delivery time; `None` means immediately.
    pub deliver_time_start: Option<DateTime<Utc>>,
    /// Latest delivery time; `None` means no deadline.
    pub deliver_time_end: Option<DateTime<Utc>>,
}

impl ScheduleParams {
    /// Params with the given priority and no delivery window.
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }
}

/// A request to show a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationParams {
    /// Unique id, generated on construction.
    pub guid: String,
    /// Requesting client.
    pub client_type: SchedulerClientType,
    /// Content.
    pub notification_data: NotificationData,
    /// Delivery constraints.
    pub schedule_params: ScheduleParams,
}

impl NotificationParams {
    /// Build params with a freshly generated guid.
    pub fn new(
        client_type: SchedulerClientType,
        notification_data: NotificationData,
        schedule_params: ScheduleParams,
    ) -> Self {
        Self {
            guid: uuid::Uuid::new_v4().to_string(),
            client_type,
            notification_data,
            schedule_params,
        }
    }

    /// Replace the generated guid.
    #[must_use]
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = guid.into();
        self
    }
}

/// Persisted form of a pending notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEntry {
    /// Requesting client.
    pub client_type: SchedulerClientType,
    /// Unique id.
    pub guid: String,
    /// When the request was accepted.
    pub create_time: DateTime<Utc>,
    /// Content.
    pub notification_data: NotificationData,
    /// Delivery constraints.
    pub schedule_params: ScheduleParams,
}

impl NotificationEntry {
    /// Convert a request accepted at `create_time` into an entry.
    pub fn from_params(params: NotificationParams, create_time: DateTime<Utc>) -> Self {
        Self {
            client_type: params.client_type,
            guid: params.guid,
            create_time,
            notification_data: params.notification_data,
            schedule_params: params.schedule_params,
        }
    }

    /// The delivery window has started at `now`.
    pub fn is_deliverable(&self, now: DateTime<Utc>) -> bool {
        self.schedule_params
            .deliver_time_start
            .map_or(true, |start| start <= now)
    }

    /// The delivery window has ended at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.schedule_params
            .deliver_time_end
            .is_some_and(|end| end < now)
    }
}

/// What the display client receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayData {
    /// Guid of the notification.
    pub guid: String,
    /// Owning client.
    pub client_type: SchedulerClientType,
    /// Content.
    pub notification_data: NotificationData,
}

impl From<NotificationEntry> for DisplayData {
    fn from(entry: NotificationEntry) -> Self {
        Self {
            guid: entry.guid,
            client_type: entry.client_type,
            notification_data: entry.notification_data,
        }
    }
}

/// Kind of user interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserActionType {
    /// Notification body clicked.
    Click,
    /// A notification button clicked.
    ButtonClick,
    /// Notification dismissed.
    Dismiss,
}

/// Semantic meaning of a notification button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonType {
    /// Client specific button.
    #[default]
    Unknown,
    /// "Helpful" button.
    Helpful,
    /// "Not helpful" button.
    Unhelpful,
}

/// Which button was clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonClickInfo {
    /// Client assigned button id.
    pub button_id: String,
    /// Semantic type.
    pub button_type: ButtonType,
}

/// A user interaction reported by the display layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActionData {
    /// Owning client.
    pub client_type: SchedulerClientType,
    /// Interaction kind.
    pub action_type: UserActionType,
    /// Guid of the notification.
    pub guid: String,
    /// Set for [`UserActionType::ButtonClick`].
    pub button_click_info: Option<ButtonClickInfo>,
}

impl UserActionData {
    /// Create an action without button info.
    pub fn new(
        client_type: SchedulerClientType,
        action_type: UserActionType,
        guid: impl Into<String>,
    ) -> Self {
        Self {
            client_type,
            action_type,
            guid: guid.into(),
            button_click_info: None,
        }
    }

    /// Feedback implied by this action.
    pub fn feedback(&self) -> UserFeedback {
        match self.action_type {
            UserActionType::Click => UserFeedback::Click,
            UserActionType::Dismiss => UserFeedback::Dismiss,
            UserActionType::ButtonClick => {
                match self.button_click_info.as_ref().map(|b| b.button_type) {
                    Some(ButtonType::Helpful) => UserFeedback::Helpful,
                    Some(ButtonType::Unhelpful) => UserFeedback::NotHelpful,
                    _ => UserFeedback::NoFeedback,
                }
            }
        }
    }
}

/// Outcome of a schedule request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Displayed immediately.
    Shown,
    /// Persisted until a background task can show it.
    Deferred,
    /// Held until initialization completes.
    Buffered,
    /// The delivery window already ended; nothing was stored.
    Expired,
    /// Ignored because initialization failed.
    Dropped,
}

/// Snapshot of a client's throttling state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOverview {
    /// Client.
    pub client_type: SchedulerClientType,
    /// Valid impressions created today.
    pub shown_today: usize,
    /// Current daily quota.
    pub current_max_daily_show: u32,
    /// Active suppression, if any.
    pub suppression_info: Option<SuppressionInfo>,
    /// Pending notifications of this client.
    pub num_scheduled: usize,
}
