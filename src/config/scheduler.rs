//! Scheduler configuration structures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory stores; state is lost on restart.
    InMemory,
    /// JSON-lines files under `dir`.
    File {
        /// Directory holding `notifications.jsonl` and `impressions.jsonl`.
        dir: PathBuf,
    },
}

/// Throttling and background task configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum notifications shown per day across all clients.
    pub max_daily_shown_all_type: u32,
    /// Daily quota of a client without history.
    pub initial_daily_shown_per_type: u32,
    /// Upper bound the daily quota can grow to.
    pub max_daily_shown_per_type: u32,
    /// Consecutive dismisses that count as negative feedback.
    pub dismiss_count: u32,
    /// Length of a suppression window in seconds.
    pub suppression_duration_secs: u64,
    /// Consecutive non-negative impressions needed to lift a suppression.
    pub suppression_recover_goal: u32,
    /// Hour (UTC) of the morning background task.
    pub morning_task_hour: u32,
    /// Hour (UTC) of the evening background task.
    pub evening_task_hour: u32,
    /// Length of the background task window in seconds.
    pub background_task_window_secs: u64,
    /// Store backend.
    pub store: StoreBackendConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_daily_shown_all_type: 3,
            initial_daily_shown_per_type: 2,
            max_daily_shown_per_type: 10,
            dismiss_count: 3,
            suppression_duration_secs: 56 * 24 * 3600,
            suppression_recover_goal: 1,
            morning_task_hour: 7,
            evening_task_hour: 18,
            background_task_window_secs: 3600,
            store: StoreBackendConfig::InMemory,
        }
    }
}

impl SchedulerConfig {
    /// Suppression window length.
    pub const fn suppression_duration(&self) -> Duration {
        Duration::from_secs(self.suppression_duration_secs)
    }

    /// Background task window length.
    pub const fn background_task_window(&self) -> Duration {
        Duration::from_secs(self.background_task_window_secs)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_daily_shown_all_type == 0 {
            return Err("max_daily_shown_all_type must be greater than 0".into());
        }
        if self.max_daily_shown_per_type == 0 {
            return Err("max_daily_shown_per_type must be greater than 0".into());
        }
        if self.initial_daily_shown_per_type > self.max_daily_shown_per_type {
            return Err("initial_daily_shown_per_type exceeds max_daily_shown_per_type".into());
        }
        if self.dismiss_count == 0 {
            return Err("dismiss_count must be greater than 0".into());
        }
        if self.suppression_duration_secs == 0 {
            return Err("suppression_duration_secs must be greater than 0".into());
        }
        if self.suppression_recover_goal == 0 {
            return Err("suppression_recover_goal must be greater than 0".into());
        }
        if self.morning_task_hour >= 24 || self.evening_task_hour >= 24 {
            return Err("task hours must be in 0..24".into());
        }
        if self.morning_task_hour >= self.evening_task_hour {
            return Err("morning_task_hour must be before evening_task_hour".into());
        }
        if self.background_task_window_secs == 0 {
            return Err("background_task_window_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their default values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("reading scheduler config {}", path.display()))?;
        Self::from_json_str(&input).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
    }
}
