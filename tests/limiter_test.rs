//! Tests for [`RateLimiter`] — sliding-window admission control.

use std::sync::Arc;
use std::time::Duration;

use heimdall::{ClientIdentity, RateLimiter, RateLimiterConfig, ThrottlePayload};

fn limiter(per_minute: u32, per_hour: u32) -> RateLimiter {
    RateLimiter::new(
        RateLimiterConfig::new()
            .per_minute(per_minute)
            .per_hour(per_hour),
    )
}

fn client(id: &str) -> ClientIdentity {
    ClientIdentity::new(id)
}

// =========================================================================
// Config
// =========================================================================

#[test]
fn config_defaults() {
    let config = RateLimiterConfig::default();
    assert_eq!(config.per_minute, 60);
    assert_eq!(config.per_hour, 1_000);
}

#[test]
fn config_builder() {
    let config = RateLimiterConfig::new().per_minute(5).per_hour(50);
    assert_eq!(config.per_minute, 5);
    assert_eq!(config.per_hour, 50);
}

#[test]
fn config_from_env() {
    // All env manipulation lives in this one test — integration tests run
    // in parallel and the process environment is shared.
    unsafe {
        std::env::remove_var("RATE_LIMIT_PER_MINUTE");
        std::env::remove_var("RATE_LIMIT_PER_HOUR");
    }
    let config = RateLimiterConfig::from_env().expect("defaults");
    assert_eq!(config.per_minute, 60);
    assert_eq!(config.per_hour, 1_000);

    unsafe {
        std::env::set_var("RATE_LIMIT_PER_MINUTE", "10");
        std::env::set_var("RATE_LIMIT_PER_HOUR", "200");
    }
    let config = RateLimiterConfig::from_env().expect("overrides");
    assert_eq!(config.per_minute, 10);
    assert_eq!(config.per_hour, 200);

    unsafe {
        std::env::set_var("RATE_LIMIT_PER_MINUTE", "not-a-number");
    }
    assert!(RateLimiterConfig::from_env().is_err());

    unsafe {
        std::env::remove_var("RATE_LIMIT_PER_MINUTE");
        std::env::remove_var("RATE_LIMIT_PER_HOUR");
    }
}

// =========================================================================
// Minute ceiling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn minute_ceiling_denies_request_n_plus_one() {
    let limiter = limiter(5, 1_000);
    let id = client("user:42");

    for _ in 0..5 {
        let (admitted, _) = limiter.check_and_admit(&id, "portfolio.about");
        assert!(admitted);
    }

    let (admitted, info) = limiter.check_and_admit(&id, "portfolio.about");
    assert!(!admitted);
    assert_eq!(info.remaining_minute, 0);
    assert_eq!(info.limit_minute, 5);
}

#[tokio::test(start_paused = true)]
async fn minute_window_slides_rather_than_resetting() {
    let limiter = limiter(5, 1_000);
    let id = client("user:42");

    for _ in 0..5 {
        assert!(limiter.check_and_admit(&id, "portfolio.about").0);
    }
    assert!(!limiter.check_and_admit(&id, "portfolio.about").0);

    // 60 seconds after the burst, all five entries leave the window
    tokio::time::advance(Duration::from_secs(61)).await;
    let (admitted, info) = limiter.check_and_admit(&id, "portfolio.about");
    assert!(admitted);
    assert_eq!(info.remaining_minute, 5);
}

#[tokio::test(start_paused = true)]
async fn remaining_counts_decrease_monotonically() {
    let limiter = limiter(3, 1_000);
    let id = client("user:42");

    let remaining: Vec<u32> = (0..3)
        .map(|_| limiter.check_and_admit(&id, "portfolio.about").1.remaining_minute)
        .collect();
    assert_eq!(remaining, vec![3, 2, 1]);
}

// =========================================================================
// Hour ceiling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn hour_ceiling_denies_independently_of_minute_ceiling() {
    // Minute ceiling would allow far more; the hour ceiling must still bite.
    let limiter = limiter(1_000, 5);
    let id = client("user:42");

    for _ in 0..5 {
        assert!(limiter.check_and_admit(&id, "portfolio.about").0);
    }

    let (admitted, info) = limiter.check_and_admit(&id, "portfolio.about");
    assert!(!admitted);
    assert_eq!(info.remaining_hour, 0);
    assert!(info.remaining_minute > 0);
}

#[tokio::test(start_paused = true)]
async fn hour_window_slides() {
    let limiter = limiter(1_000, 2);
    let id = client("user:42");

    assert!(limiter.check_and_admit(&id, "portfolio.about").0);
    tokio::time::advance(Duration::from_secs(1_800)).await;
    assert!(limiter.check_and_admit(&id, "portfolio.about").0);
    assert!(!limiter.check_and_admit(&id, "portfolio.about").0);

    // 1 hour after the first request, one slot frees up
    tokio::time::advance(Duration::from_secs(1_801)).await;
    assert!(limiter.check_and_admit(&id, "portfolio.about").0);
}

// =========================================================================
// Denial semantics
// =========================================================================

#[tokio::test(start_paused = true)]
async fn probing_an_exhausted_client_is_idempotent() {
    let limiter = limiter(2, 1_000);
    let id = client("user:42");

    assert!(limiter.check_and_admit(&id, "portfolio.about").0);
    assert!(limiter.check_and_admit(&id, "portfolio.about").0);

    for _ in 0..10 {
        let (admitted, info) = limiter.check_and_admit(&id, "portfolio.about");
        assert!(!admitted);
        assert_eq!(info.remaining_minute, 0);
    }
    assert_eq!(limiter.recorded_requests(&id), 2);
}

#[tokio::test(start_paused = true)]
async fn throttle_payload_carries_retry_timing() {
    let limiter = limiter(1, 1_000);
    let id = client("user:42");
    limiter.check_and_admit(&id, "portfolio.about");

    let (_, info) = limiter.check_and_admit(&id, "portfolio.about");
    let payload = ThrottlePayload::from_info(&info);

    assert_eq!(payload.error, "Rate limit exceeded");
    assert_eq!(payload.limit_minute, 1);
    assert!(payload.reset_hour > payload.reset_minute);

    // Serializes to the structured denial body transports send as 429
    let body = serde_json::to_value(&payload).expect("serializable");
    assert!(body.get("message").is_some());
    assert!(body.get("reset_minute").is_some());
}

// =========================================================================
// Retention sweep
// =========================================================================

#[tokio::test(start_paused = true)]
async fn sweep_drops_expired_entries_and_empty_identities() {
    let limiter = limiter(60, 1_000);
    let old = client("user:old");
    let active = client("user:active");

    limiter.check_and_admit(&old, "portfolio.about");
    tokio::time::advance(Duration::from_secs(3_000)).await;
    limiter.check_and_admit(&active, "portfolio.about");

    tokio::time::advance(Duration::from_secs(700)).await;
    limiter.sweep_expired();

    // "old" aged out entirely; "active" is still inside the hour window
    assert_eq!(limiter.recorded_requests(&old), 0);
    assert_eq!(limiter.recorded_requests(&active), 1);
    assert_eq!(limiter.tracked_clients(), 1);
}

#[tokio::test(start_paused = true)]
async fn background_sweeper_runs_on_its_interval() {
    let limiter = Arc::new(limiter(60, 1_000));
    let id = client("user:42");
    limiter.check_and_admit(&id, "portfolio.about");

    let sweeper = limiter.spawn_sweeper(Duration::from_secs(300));

    // Sleep past retention plus one sweep interval; with the clock paused
    // the runtime advances through the sweeper's ticks on the way.
    tokio::time::sleep(Duration::from_secs(4_000)).await;
    tokio::task::yield_now().await;

    assert_eq!(limiter.tracked_clients(), 0);
    sweeper.shutdown();
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_the_sweeper() {
    let limiter = Arc::new(limiter(60, 1_000));
    {
        let _sweeper = limiter.spawn_sweeper(Duration::from_secs(300));
    }

    // The aborted task must not panic the runtime or keep sweeping
    limiter.check_and_admit(&client("user:42"), "portfolio.about");
    tokio::time::sleep(Duration::from_secs(4_000)).await;
    assert_eq!(limiter.tracked_clients(), 1);
}
