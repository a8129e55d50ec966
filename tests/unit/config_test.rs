//! Tests for configuration validation

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use notification_scheduler::config::{SchedulerConfig, StoreBackendConfig};

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.max_daily_shown_all_type, 3);
    assert_eq!(cfg.initial_daily_shown_per_type, 2);
    assert_eq!(cfg.suppression_duration(), Duration::from_secs(56 * 24 * 3600));
    assert_eq!(cfg.background_task_window(), Duration::from_secs(3600));
    assert_eq!(cfg.store, StoreBackendConfig::InMemory);
}

#[test]
fn test_invalid_caps() {
    let cfg = SchedulerConfig {
        max_daily_shown_all_type: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = SchedulerConfig {
        initial_daily_shown_per_type: 11,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_task_hours() {
    let cfg = SchedulerConfig {
        morning_task_hour: 24,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = SchedulerConfig {
        morning_task_hour: 18,
        evening_task_hour: 7,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_suppression() {
    let cfg = SchedulerConfig {
        dismiss_count: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = SchedulerConfig {
        suppression_recover_goal: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_partial_json_uses_defaults() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{"max_daily_shown_all_type": 5, "store": {"file": {"dir": "/var/lib/notifications"}}}"#,
    )
    .unwrap();
    assert_eq!(cfg.max_daily_shown_all_type, 5);
    assert_eq!(cfg.dismiss_count, 3);
    assert_eq!(
        cfg.store,
        StoreBackendConfig::File {
            dir: PathBuf::from("/var/lib/notifications")
        }
    );
}

#[test]
fn test_json_rejects_invalid_values() {
    assert!(SchedulerConfig::from_json_str(r#"{"dismiss_count": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"evening_task_hour": 20}}"#).unwrap();

    let cfg = SchedulerConfig::from_json_file(file.path()).unwrap();
    assert_eq!(cfg.evening_task_hour, 20);

    let err = SchedulerConfig::from_json_file("/nonexistent/scheduler.json").unwrap_err();
    assert!(err.to_string().contains("reading scheduler config"));
}
