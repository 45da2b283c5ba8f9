//! Offline breaker tests on a paused clock.

use std::time::Duration;

use gemgate::{BreakerConfig, BreakerState, OfflineBreaker};

fn breaker() -> OfflineBreaker {
    OfflineBreaker::new(BreakerConfig::default())
}

#[tokio::test(start_paused = true)]
async fn threshold_failures_switch_offline() {
    let breaker = breaker();
    breaker.record_failure();
    breaker.record_failure();
    assert!(!breaker.should_use_offline_mode());

    breaker.record_failure();
    assert!(breaker.should_use_offline_mode());
    assert_eq!(breaker.state(), BreakerState::Offline);
}

#[tokio::test(start_paused = true)]
async fn success_resets_counter() {
    let breaker = breaker();
    breaker.record_failure();
    breaker.record_failure();
    breaker.record_success();
    assert_eq!(breaker.consecutive_failures(), 0);

    breaker.record_failure();
    breaker.record_failure();
    assert!(!breaker.should_use_offline_mode());
}

#[tokio::test(start_paused = true)]
async fn success_while_offline_goes_online() {
    let breaker = breaker();
    breaker.force_offline();
    breaker.record_success();
    assert_eq!(breaker.state(), BreakerState::Online);
}

#[tokio::test(start_paused = true)]
async fn cooldown_recovers_and_resets_counter() {
    let breaker = breaker();
    for _ in 0..3 {
        breaker.record_failure();
    }

    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(breaker.should_use_offline_mode());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(!breaker.should_use_offline_mode());
    assert_eq!(breaker.state(), BreakerState::Online);
    assert_eq!(breaker.consecutive_failures(), 0);

    // A single new failure does not immediately trip again.
    breaker.record_failure();
    assert!(!breaker.should_use_offline_mode());
}

#[tokio::test(start_paused = true)]
async fn cooldown_counts_from_last_failure() {
    let breaker = breaker();
    for _ in 0..3 {
        breaker.record_failure();
    }
    tokio::time::advance(Duration::from_secs(200)).await;
    breaker.record_failure();

    tokio::time::advance(Duration::from_secs(200)).await;
    assert!(breaker.should_use_offline_mode());
}

#[tokio::test(start_paused = true)]
async fn manual_overrides() {
    let breaker = breaker();
    breaker.force_offline();
    assert!(breaker.should_use_offline_mode());

    breaker.force_online();
    assert!(!breaker.should_use_offline_mode());
    assert_eq!(breaker.consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn snapshot_reports_remaining_cooldown() {
    let breaker = OfflineBreaker::new(
        BreakerConfig::new()
            .failure_threshold(1)
            .cooldown(Duration::from_secs(60)),
    );
    assert_eq!(breaker.snapshot().offline_remaining, None);

    breaker.record_failure();
    tokio::time::advance(Duration::from_secs(15)).await;

    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.state, BreakerState::Offline);
    assert_eq!(snapshot.consecutive_failures, 1);
    assert_eq!(snapshot.failure_threshold, 1);
    assert_eq!(snapshot.offline_remaining, Some(Duration::from_secs(45)));
}
