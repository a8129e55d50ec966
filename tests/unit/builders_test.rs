//! Tests for builder modules

use notification_scheduler::builders::scheduler_builder::{
    IMPRESSION_STORE_FILE, NOTIFICATION_STORE_FILE,
};
use notification_scheduler::builders::SchedulerBuilder;
use notification_scheduler::config::{SchedulerConfig, StoreBackendConfig};
use notification_scheduler::core::{
    NotificationScheduler, SchedulerClientType, SchedulerError, SchedulerPhase,
};

use crate::common::RecordingClient;

#[test]
fn test_builder_rejects_invalid_config() {
    let cfg = SchedulerConfig {
        dismiss_count: 0,
        ..SchedulerConfig::default()
    };
    let result = SchedulerBuilder::new(cfg).build();
    assert!(matches!(
        result,
        Err(SchedulerError::Backend(msg)) if msg.starts_with("config invalid")
    ));
}

#[tokio::test]
async fn test_builder_file_backend_creates_store_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SchedulerConfig {
        store: StoreBackendConfig::File {
            dir: dir.path().to_path_buf(),
        },
        ..SchedulerConfig::default()
    };

    let scheduler = SchedulerBuilder::new(cfg)
        .with_client(SchedulerClientType::Test1, RecordingClient::new())
        .build()
        .unwrap();
    assert_eq!(scheduler.phase(), SchedulerPhase::Uninitialized);
    scheduler.init().await.unwrap();

    assert_eq!(scheduler.phase(), SchedulerPhase::Ready);
    assert!(dir.path().join(IMPRESSION_STORE_FILE).exists());
    assert!(!dir.path().join(NOTIFICATION_STORE_FILE).exists());
}

#[tokio::test]
async fn test_builder_init_aware_starts_buffering() {
    let client = RecordingClient::new();
    let wrapper = SchedulerBuilder::new(SchedulerConfig::default())
        .with_client(SchedulerClientType::Test1, client.clone())
        .build_init_aware()
        .unwrap();

    assert!(!wrapper.is_ready());
    wrapper.init().await.unwrap();
    assert!(wrapper.is_ready());
    assert_eq!(client.initialized().await.len(), 1);
}
