//! Request admission control with sliding-window rate limiting.
//!
//! [`RateLimiter`] gates each generation request against two independently
//! configured ceilings — requests-per-minute and requests-per-hour — per
//! [`ClientIdentity`]. Both ceilings use rolling intervals, not calendar
//! buckets, so a burst never gets a free reset at the top of the minute.
//!
//! # Accounting rules
//!
//! - A denied request records nothing: probing an exhausted client any
//!   number of times leaves its quota untouched.
//! - An admitted request records exactly one entry, even if the caller
//!   later abandons it. A cancelled request still costs quota.
//! - "read usage, decide, append" happens under one lock acquisition, so
//!   two concurrent admissions for the same identity cannot both slip past
//!   a ceiling that only one of them should have crossed.
//!
//! # Retention
//!
//! Histories are bounded by a background sweep rather than per-request
//! cleanup: [`RateLimiter::sweep_expired`] drops entries older than the
//! hour window and forgets identities whose history is empty. Wire it to a
//! timer with [`RateLimiter::spawn_sweeper`]; the returned handle is
//! cancellable so graceful shutdown and timer-free tests both work.
//!
//! # Deployment scope
//!
//! State is in-memory and per-process. Running several backend processes
//! multiplies the effective ceilings; multi-instance correctness needs an
//! external shared counter store, which this component deliberately does
//! not provide.

mod window;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::identity::ClientIdentity;
use crate::telemetry;
use crate::{HeimdallError, Result};
use window::SlidingWindow;

/// The short accounting window.
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// The long accounting window, also the retention horizon for histories.
pub const HOUR_WINDOW: Duration = Duration::from_secs(3600);

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Ceilings for the two accounting windows.
///
/// ```rust
/// # use heimdall::RateLimiterConfig;
/// let config = RateLimiterConfig::new().per_minute(10).per_hour(200);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum admitted requests per rolling minute. Default: 60.
    pub per_minute: u32,
    /// Maximum admitted requests per rolling hour. Default: 1,000.
    pub per_hour: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            per_minute: 60,
            per_hour: 1_000,
        }
    }
}

impl RateLimiterConfig {
    /// Create a config with default ceilings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-minute ceiling.
    pub fn per_minute(mut self, n: u32) -> Self {
        self.per_minute = n;
        self
    }

    /// Set the per-hour ceiling.
    pub fn per_hour(mut self, n: u32) -> Self {
        self.per_hour = n;
        self
    }

    /// Build a config from the `RATE_LIMIT_PER_MINUTE` and
    /// `RATE_LIMIT_PER_HOUR` environment variables, falling back to the
    /// defaults for unset variables.
    ///
    /// A variable that is set but not a valid integer is a
    /// [`HeimdallError::Configuration`] — fatal at startup rather than a
    /// silently misconfigured limiter.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(n) = read_env_ceiling("RATE_LIMIT_PER_MINUTE")? {
            config.per_minute = n;
        }
        if let Some(n) = read_env_ceiling("RATE_LIMIT_PER_HOUR")? {
            config.per_hour = n;
        }
        Ok(config)
    }
}

fn read_env_ceiling(name: &str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<u32>().map(Some).map_err(|_| {
            HeimdallError::Configuration(format!("{name} must be an integer, got {raw:?}"))
        }),
        Err(_) => Ok(None),
    }
}

/// Snapshot of a client's standing against both ceilings.
///
/// Computed on every admission decision, admitted or denied, from the
/// usage *before* the current request is recorded. Transport layers
/// surface the fields as `X-RateLimit-*` headers so clients can implement
/// backoff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit_minute: u32,
    pub limit_hour: u32,
    /// `max(0, limit_minute - used_minute)`.
    pub remaining_minute: u32,
    /// `max(0, limit_hour - used_hour)`.
    pub remaining_hour: u32,
    /// Absolute unix timestamp one minute from the decision.
    pub reset_minute: u64,
    /// Absolute unix timestamp one hour from the decision.
    pub reset_hour: u64,
}

/// Structured denial body, the HTTP 429 equivalent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottlePayload {
    pub error: String,
    pub message: String,
    pub limit_minute: u32,
    pub limit_hour: u32,
    pub reset_minute: u64,
    pub reset_hour: u64,
}

impl ThrottlePayload {
    /// Build the caller-facing denial body from a decision snapshot.
    pub fn from_info(info: &RateLimitInfo) -> Self {
        Self {
            error: "Rate limit exceeded".to_string(),
            message: "Too many requests. Please try again later.".to_string(),
            limit_minute: info.limit_minute,
            limit_hour: info.limit_hour,
            reset_minute: info.reset_minute,
            reset_hour: info.reset_hour,
        }
    }
}

/// In-memory per-client admission controller.
///
/// Construct one instance at process start and share it by `Arc`; the
/// per-client histories live behind a single mutex. See the module docs
/// for accounting rules and the multi-instance caveat.
pub struct RateLimiter {
    config: RateLimiterConfig,
    clients: Mutex<HashMap<ClientIdentity, SlidingWindow>>,
}

impl RateLimiter {
    /// Create a limiter with the given ceilings.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientIdentity, SlidingWindow>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether one request from `client` may proceed.
    ///
    /// Returns the decision plus a [`RateLimitInfo`] snapshot either way.
    /// Admission appends exactly one history entry tagged with
    /// `endpoint`; denial mutates nothing. Never fails on valid input —
    /// mapping a denial to an error is the caller's job.
    pub fn check_and_admit(
        &self,
        client: &ClientIdentity,
        endpoint: &str,
    ) -> (bool, RateLimitInfo) {
        let now = Instant::now();
        let mut clients = self.lock();

        let (used_minute, used_hour) = clients.get(client).map_or((0, 0), |w| {
            (
                w.count_within(now, MINUTE_WINDOW) as u32,
                w.count_within(now, HOUR_WINDOW) as u32,
            )
        });

        let unix_now = unix_timestamp();
        let info = RateLimitInfo {
            limit_minute: self.config.per_minute,
            limit_hour: self.config.per_hour,
            remaining_minute: self.config.per_minute.saturating_sub(used_minute),
            remaining_hour: self.config.per_hour.saturating_sub(used_hour),
            reset_minute: unix_now + MINUTE_WINDOW.as_secs(),
            reset_hour: unix_now + HOUR_WINDOW.as_secs(),
        };

        if used_minute >= self.config.per_minute || used_hour >= self.config.per_hour {
            metrics::counter!(telemetry::ADMISSIONS_TOTAL, "status" => "denied").increment(1);
            tracing::debug!(client = %client, endpoint, used_minute, used_hour, "admission denied");
            return (false, info);
        }

        clients
            .entry(client.clone())
            .or_default()
            .record(now, endpoint);
        metrics::counter!(telemetry::ADMISSIONS_TOTAL, "status" => "admitted").increment(1);

        (true, info)
    }

    /// Drop history entries older than the hour window and forget
    /// identities whose history is empty.
    ///
    /// Identities are swept one at a time — the map lock is reacquired per
    /// identity, never held across the whole scan, so concurrent
    /// admissions are not stalled behind the sweep.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        let identities: Vec<ClientIdentity> = self.lock().keys().cloned().collect();

        let mut removed_entries = 0usize;
        let mut removed_clients = 0usize;
        for identity in identities {
            let mut clients = self.lock();
            if let Some(window) = clients.get_mut(&identity) {
                removed_entries += window.purge_older_than(now, HOUR_WINDOW);
                if window.is_empty() {
                    clients.remove(&identity);
                    removed_clients += 1;
                }
            }
        }

        if removed_entries > 0 {
            metrics::counter!(telemetry::SWEEP_REMOVED_TOTAL).increment(removed_entries as u64);
        }
        tracing::debug!(removed_entries, removed_clients, "rate limiter sweep complete");
    }

    /// Spawn the periodic sweep as a background task.
    ///
    /// The returned [`SweeperHandle`] aborts the task when dropped and can
    /// be shut down explicitly; tests that control time simply call
    /// [`sweep_expired`](Self::sweep_expired) instead of spawning.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let limiter = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the first tick completes immediately
            loop {
                ticker.tick().await;
                limiter.sweep_expired();
            }
        });
        SweeperHandle { handle }
    }

    /// Number of identities currently holding history entries.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Total history entries recorded for `client`, across both windows.
    pub fn recorded_requests(&self, client: &ClientIdentity) -> usize {
        self.lock().get(client).map_or(0, SlidingWindow::len)
    }
}

/// Cancellable handle to the background sweeper task.
///
/// Dropping the handle aborts the task, tying the sweeper's lifetime to
/// whatever owns it.
pub struct SweeperHandle {
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper. Equivalent to dropping the handle.
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str) -> ClientIdentity {
        ClientIdentity::new(id)
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_client_is_admitted_with_full_quota() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let (admitted, info) = limiter.check_and_admit(&client("user:1"), "portfolio.about");

        assert!(admitted);
        assert_eq!(info.remaining_minute, 60);
        assert_eq!(info.remaining_hour, 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn denial_records_nothing() {
        let config = RateLimiterConfig::new().per_minute(1).per_hour(1_000);
        let limiter = RateLimiter::new(config);
        let id = client("user:1");

        assert!(limiter.check_and_admit(&id, "portfolio.about").0);
        assert_eq!(limiter.recorded_requests(&id), 1);

        for _ in 0..5 {
            let (admitted, info) = limiter.check_and_admit(&id, "portfolio.about");
            assert!(!admitted);
            assert_eq!(info.remaining_minute, 0);
        }
        assert_eq!(limiter.recorded_requests(&id), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ceiling_never_creates_a_history() {
        let config = RateLimiterConfig::new().per_minute(0);
        let limiter = RateLimiter::new(config);

        let (admitted, _) = limiter.check_and_admit(&client("ip:10.0.0.1"), "portfolio.about");
        assert!(!admitted);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn identities_are_independent() {
        let config = RateLimiterConfig::new().per_minute(1);
        let limiter = RateLimiter::new(config);

        assert!(limiter.check_and_admit(&client("user:1"), "portfolio.about").0);
        assert!(!limiter.check_and_admit(&client("user:1"), "portfolio.about").0);
        assert!(limiter.check_and_admit(&client("user:2"), "portfolio.about").0);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_forgets_empty_identities() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let id = client("user:1");
        limiter.check_and_admit(&id, "portfolio.about");
        assert_eq!(limiter.tracked_clients(), 1);

        tokio::time::advance(HOUR_WINDOW + Duration::from_secs(1)).await;
        limiter.sweep_expired();

        assert_eq!(limiter.tracked_clients(), 0);
        assert_eq!(limiter.recorded_requests(&id), 0);
    }

    #[test]
    fn throttle_payload_mirrors_the_decision() {
        let info = RateLimitInfo {
            limit_minute: 60,
            limit_hour: 1_000,
            remaining_minute: 0,
            remaining_hour: 940,
            reset_minute: 1_700_000_060,
            reset_hour: 1_700_003_600,
        };
        let payload = ThrottlePayload::from_info(&info);

        assert_eq!(payload.error, "Rate limit exceeded");
        assert_eq!(payload.limit_minute, 60);
        assert_eq!(payload.reset_hour, 1_700_003_600);
    }
}
