//! Tests for store implementations

use notification_scheduler::core::{ClientState, Impression, SchedulerClientType, SuppressionInfo};
use notification_scheduler::infra::{CollectionStore, InMemoryStore, JsonlStore};

use chrono::{TimeZone, Utc};

fn client_state() -> ClientState {
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
    let mut state = ClientState::new(SchedulerClientType::Prefetch, 0);
    state.impressions.push(Impression::new(SchedulerClientType::Prefetch, "g1", now));
    state.suppression_info = Some(SuppressionInfo::new(
        now,
        std::time::Duration::from_secs(3600),
        2,
    ));
    state
}

#[tokio::test]
async fn test_in_memory_store_upserts() {
    let store = InMemoryStore::<ClientState>::new();
    assert!(store.init_and_load().await.unwrap().is_empty());

    let mut state = client_state();
    store.add("prefetch", &state).await.unwrap();
    state.current_max_daily_show = 4;
    store.update("prefetch", &state).await.unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("prefetch").unwrap().current_max_daily_show, 4);
    store.delete("prefetch").await.unwrap();
    store.delete("prefetch").await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_jsonl_store_keeps_client_state_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("impressions.jsonl");

    let store = JsonlStore::<ClientState>::new(&path);
    store.init_and_load().await.unwrap();
    store.add("prefetch", &client_state()).await.unwrap();

    let reopened = JsonlStore::<ClientState>::new(&path);
    let loaded = reopened.init_and_load().await.unwrap();
    assert_eq!(loaded, vec![client_state()]);
}
