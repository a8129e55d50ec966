//! Impression history tracking and display admission.
//!
//! The tracker owns one [`ClientState`] per registered client. It answers
//! whether a client may show another notification right now and folds user
//! feedback into the client's daily quota:
//!
//! - positive feedback (click, helpful) raises the quota up to
//!   `max_daily_shown_per_type`;
//! - negative feedback (not helpful, or `dismiss_count` consecutive
//!   dismisses) drops the quota to zero and starts a suppression window;
//! - while suppressed, every non-negative impression counts down
//!   `recover_goal`; reaching zero clears the suppression entirely.
//!
//! Changes are kept in memory and written to the store by [`flush`].
//!
//! [`flush`]: ImpressionHistoryTracker::flush

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::SchedulerConfig;
use crate::core::types::{
    ClientState, Impression, ImpressionResult, SchedulerClientType, SchedulerTaskTime,
    SuppressionInfo, UserFeedback,
};
use crate::core::SchedulerError;
use crate::infra::store::CollectionStore;
use crate::util::clock::day_start;

#[derive(Default)]
struct TrackerState {
    client_states: BTreeMap<SchedulerClientType, ClientState>,
    /// Clients changed since the last flush.
    dirty: BTreeSet<SchedulerClientType>,
}

/// Per-client impression history and suppression bookkeeping.
pub struct ImpressionHistoryTracker {
    store: Arc<dyn CollectionStore<ClientState>>,
    config: SchedulerConfig,
    registered: Vec<SchedulerClientType>,
    state: Mutex<TrackerState>,
}

impl ImpressionHistoryTracker {
    /// Create a tracker for the given registered client types.
    pub fn new(
        store: Arc<dyn CollectionStore<ClientState>>,
        config: SchedulerConfig,
        registered: Vec<SchedulerClientType>,
    ) -> Self {
        Self {
            store,
            config,
            registered,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Load client states, create defaults for new clients and drop states
    /// of clients that are no longer registered.
    pub async fn init(&self) -> Result<(), SchedulerError> {
        let loaded = self
            .store
            .init_and_load()
            .await
            .map_err(|e| SchedulerError::InitFailed(format!("impression store: {e}")))?;

        let mut stale = Vec::new();
        {
            let mut state = self.state.lock();
            for client_state in loaded {
                if self.registered.contains(&client_state.client_type) {
                    state.client_states.insert(client_state.client_type, client_state);
                } else {
                    stale.push(client_state.client_type);
                }
            }
            for &client_type in &self.registered {
                if !state.client_states.contains_key(&client_type) {
                    state.client_states.insert(
                        client_type,
                        ClientState::new(client_type, self.config.initial_daily_shown_per_type),
                    );
                    state.dirty.insert(client_type);
                }
            }
            tracing::debug!(clients = state.client_states.len(), "impression history loaded");
        }

        for client_type in stale {
            if let Err(err) = self.store.delete(client_type.as_str()).await {
                tracing::warn!(
                    client = %client_type,
                    "failed to delete stale client state: {}",
                    err
                );
            }
        }

        self.flush()
            .await
            .map_err(|e| SchedulerError::InitFailed(e.to_string()))
    }

    /// Whether `client_type` may show a notification at `now`.
    pub fn can_show_notification(
        &self,
        client_type: SchedulerClientType,
        now: DateTime<Utc>,
    ) -> bool {
        let mut state = self.state.lock();
        let TrackerState { client_states, dirty } = &mut *state;
        let Some(client_state) = client_states.get_mut(&client_type) else {
            return false;
        };
        if Self::lift_expired_suppression(client_state, now) {
            dirty.insert(client_type);
        }
        if client_state.suppression_info.is_some() {
            tracing::debug!(client = %client_type, "client is suppressed");
            return false;
        }
        let shown = client_state.shown_since(day_start(now));
        shown < client_state.current_max_daily_show as usize
    }

    /// Record that a notification was shown at `now`.
    pub fn record_impression(
        &self,
        client_type: SchedulerClientType,
        guid: &str,
        task_start_time: SchedulerTaskTime,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        let TrackerState { client_states, dirty } = &mut *state;
        let client_state = client_states
            .get_mut(&client_type)
            .ok_or(SchedulerError::UnknownClient(client_type))?;
        let mut impression = Impression::new(client_type, guid, now);
        impression.task_start_time = task_start_time;
        client_state.impressions.push(impression);
        dirty.insert(client_type);
        Ok(())
    }

    /// Attach feedback to the impression of `guid` and fold it into the
    /// client state. Returns `false` when no such impression exists.
    pub fn record_feedback(&self, guid: &str, feedback: UserFeedback, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        let TrackerState { client_states, dirty } = &mut *state;
        for client_state in client_states.values_mut() {
            let Some(index) = client_state.impressions.iter().position(|i| i.guid == guid) else {
                continue;
            };
            let client_type = client_state.client_type;
            dirty.insert(client_type);

            let impression = &mut client_state.impressions[index];
            impression.feedback = feedback;
            if impression.integrated
                || !impression.is_valid()
                || feedback == UserFeedback::NoFeedback
            {
                return true;
            }

            let result = self.evaluate(client_state, index);
            let impression = &mut client_state.impressions[index];
            impression.impression = result;
            impression.integrated = true;
            self.apply_result(client_state, result, now);
            tracing::debug!(client = %client_type, guid, ?feedback, ?result, "feedback integrated");
            return true;
        }
        false
    }

    /// Fold every un-integrated impression created before today into the
    /// client states, treating missing feedback as ignored. Also lifts
    /// expired suppressions. Returns the number of impressions integrated.
    pub fn integrate(&self, now: DateTime<Utc>) -> usize {
        let boundary = day_start(now);
        let mut state = self.state.lock();
        let TrackerState { client_states, dirty } = &mut *state;
        let mut integrated = 0;

        for client_state in client_states.values_mut() {
            let client_type = client_state.client_type;
            let mut changed = Self::lift_expired_suppression(client_state, now);

            let mut pending: Vec<usize> = client_state
                .impressions
                .iter()
                .enumerate()
                .filter(|(_, i)| !i.integrated && i.is_valid() && i.create_time < boundary)
                .map(|(index, _)| index)
                .collect();
            pending.sort_by_key(|&index| client_state.impressions[index].create_time);

            for index in pending {
                let impression = &mut client_state.impressions[index];
                if impression.feedback == UserFeedback::NoFeedback {
                    impression.feedback = UserFeedback::Ignore;
                }
                let result = self.evaluate(client_state, index);
                let impression = &mut client_state.impressions[index];
                impression.impression = result;
                impression.integrated = true;
                self.apply_result(client_state, result, now);
                changed = true;
                integrated += 1;
            }

            if changed {
                dirty.insert(client_type);
            }
        }

        if integrated > 0 {
            tracing::debug!(integrated, "impressions integrated");
        }
        integrated
    }

    /// Write every client state changed since the last flush.
    pub async fn flush(&self) -> Result<(), SchedulerError> {
        let pending: Vec<ClientState> = {
            let mut state = self.state.lock();
            let TrackerState { client_states, dirty } = &mut *state;
            std::mem::take(dirty)
                .into_iter()
                .filter_map(|client_type| client_states.get(&client_type).cloned())
                .collect()
        };

        for (index, client_state) in pending.iter().enumerate() {
            let key = client_state.client_type.as_str();
            if let Err(err) = self.store.update(key, client_state).await {
                let mut state = self.state.lock();
                state.dirty.extend(pending[index..].iter().map(|c| c.client_type));
                tracing::warn!(
                    client = %client_state.client_type,
                    "failed to persist client state: {}",
                    err
                );
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Whether an impression with `guid` was ever recorded.
    pub fn has_impression(&self, guid: &str) -> bool {
        self.state
            .lock()
            .client_states
            .values()
            .any(|c| c.impressions.iter().any(|i| i.guid == guid))
    }

    /// Valid impressions of `client_type` created today.
    pub fn shown_today(&self, client_type: SchedulerClientType, now: DateTime<Utc>) -> usize {
        self.state
            .lock()
            .client_states
            .get(&client_type)
            .map_or(0, |c| c.shown_since(day_start(now)))
    }

    /// Valid impressions of all clients created today.
    pub fn total_shown_today(&self, now: DateTime<Utc>) -> usize {
        let since = day_start(now);
        self.state
            .lock()
            .client_states
            .values()
            .map(|c| c.shown_since(since))
            .sum()
    }

    /// Snapshot of one client's state.
    pub fn client_state(&self, client_type: SchedulerClientType) -> Option<ClientState> {
        self.state.lock().client_states.get(&client_type).cloned()
    }

    /// Snapshot of every client state.
    pub fn client_states(&self) -> Vec<ClientState> {
        self.state.lock().client_states.values().cloned().collect()
    }

    /// Whether changes are waiting for [`flush`](Self::flush).
    pub fn has_pending_writes(&self) -> bool {
        !self.state.lock().dirty.is_empty()
    }

    fn evaluate(&self, client_state: &ClientState, index: usize) -> ImpressionResult {
        match client_state.impressions[index].feedback {
            UserFeedback::Click | UserFeedback::Helpful => ImpressionResult::Positive,
            UserFeedback::NotHelpful => ImpressionResult::Negative,
            UserFeedback::Ignore => ImpressionResult::Neutral,
            UserFeedback::Dismiss => {
                if Self::dismiss_run_ending_at(client_state, index) >= self.config.dismiss_count {
                    ImpressionResult::Negative
                } else {
                    ImpressionResult::Neutral
                }
            }
            UserFeedback::NoFeedback => ImpressionResult::Invalid,
        }
    }

    /// Length of the run of dismissed impressions ending at `index`.
    /// Impressions still waiting for feedback do not break the run.
    fn dismiss_run_ending_at(client_state: &ClientState, index: usize) -> u32 {
        let mut count = 0;
        for impression in client_state.impressions[..=index].iter().rev().filter(|i| i.is_valid()) {
            match impression.feedback {
                UserFeedback::Dismiss => count += 1,
                UserFeedback::NoFeedback => {}
                _ => break,
            }
        }
        count
    }

    fn apply_result(
        &self,
        client_state: &mut ClientState,
        result: ImpressionResult,
        now: DateTime<Utc>,
    ) {
        match result {
            ImpressionResult::Negative => {
                client_state.current_max_daily_show = 0;
                client_state.suppression_info = Some(SuppressionInfo::new(
                    now,
                    self.config.suppression_duration(),
                    self.config.suppression_recover_goal,
                ));
                tracing::info!(
                    client = %client_state.client_type,
                    "negative feedback, client suppressed"
                );
            }
            ImpressionResult::Positive | ImpressionResult::Neutral => {
                if let Some(info) = client_state.suppression_info.as_mut() {
                    info.recover_goal = info.recover_goal.saturating_sub(1);
                    if info.recover_goal == 0 {
                        // Impressions shown today while suppressed must not
                        // keep the restored quota exhausted.
                        let shown_today = client_state.shown_since(day_start(now));
                        let restored = u32::try_from(shown_today + 1).unwrap_or(u32::MAX);
                        client_state.suppression_info = None;
                        client_state.current_max_daily_show =
                            self.config.initial_daily_shown_per_type.max(1).max(restored);
                        tracing::info!(client = %client_state.client_type, "suppression recovered");
                    }
                } else if result == ImpressionResult::Positive {
                    client_state.current_max_daily_show = (client_state.current_max_daily_show + 1)
                        .min(self.config.max_daily_shown_per_type);
                }
            }
            ImpressionResult::Invalid => {}
        }
    }

    /// Clears a suppression whose window has elapsed. The quota restarts
    /// from the remaining recover goal.
    fn lift_expired_suppression(client_state: &mut ClientState, now: DateTime<Utc>) -> bool {
        let expired_goal = client_state
            .suppression_info
            .as_ref()
            .filter(|info| info.is_expired(now))
            .map(|info| info.recover_goal);
        let Some(goal) = expired_goal else {
            return false;
        };
        client_state.suppression_info = None;
        client_state.current_max_daily_show = goal.max(1);
        tracing::info!(client = %client_state.client_type, "suppression expired");
        true
    }
}
