//! Tests for error types

use notification_scheduler::core::{SchedulerClientType, SchedulerError};
use notification_scheduler::infra::StoreError;

#[test]
fn test_not_initialized_error() {
    let err = SchedulerError::NotInitialized;
    assert_eq!(format!("{}", err), "scheduler not initialized");
}

#[test]
fn test_duplicate_guid_error() {
    let err = SchedulerError::DuplicateGuid("abc".to_string());
    assert_eq!(format!("{}", err), "duplicate guid: abc");
}

#[test]
fn test_unknown_client_error() {
    let err = SchedulerError::UnknownClient(SchedulerClientType::ReadingList);
    assert_eq!(format!("{}", err), "unknown client: reading_list");
}

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("connection failed".to_string());
    assert_eq!(format!("{}", err), "backend error: connection failed");
}

#[test]
fn test_store_error_becomes_persistence() {
    let err: SchedulerError = StoreError::Unavailable("disk full".to_string()).into();
    assert!(matches!(err, SchedulerError::Persistence(_)));
    assert_eq!(format!("{}", err), "persistence error: store unavailable: disk full");
}
