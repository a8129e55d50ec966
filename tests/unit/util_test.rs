//! Tests for utility functions

use chrono::{DateTime, Duration, TimeZone, Utc};
use notification_scheduler::util::{
    day_start, init_tracing, is_set, Clock, ManualClock, SystemClock,
};

#[test]
fn test_manual_clock_is_shared_between_clones() {
    let start = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
    let clock = ManualClock::new(start);
    let other = clock.clone();

    clock.advance(Duration::hours(1));
    assert_eq!(other.now(), start + Duration::hours(1));
    assert_eq!(day_start(other.now()), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
}

#[test]
fn test_unset_time_is_epoch() {
    assert!(!is_set(DateTime::<Utc>::default()));
    assert!(is_set(SystemClock.now()));
}

#[test]
fn test_init_tracing_twice_is_harmless() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized");
}
