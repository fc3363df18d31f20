//! Per-client sliding-window request history.
//!
//! A [`SlidingWindow`] is an ordered list of `(timestamp, endpoint)` pairs,
//! one per admitted request. Appends always use "now", so insertion order
//! is chronological order and counting a rolling interval is a single
//! linear scan. The scan is acceptable because retention (1 hour) combined
//! with the hourly ceiling caps how many entries a client can accumulate.

use std::time::Duration;

use tokio::time::Instant;

/// A single admitted request: when it happened and which endpoint it hit.
#[derive(Debug, Clone)]
pub(crate) struct RequestEntry {
    pub(crate) at: Instant,
    pub(crate) endpoint: String,
}

/// Ordered request history for one client identity.
///
/// Invariant: entries are monotonically non-decreasing in timestamp.
#[derive(Debug, Default)]
pub(crate) struct SlidingWindow {
    entries: Vec<RequestEntry>,
}

impl SlidingWindow {
    /// Count entries inside the rolling interval `[now - window, now]`.
    ///
    /// Pure read; an empty history counts zero.
    pub(crate) fn count_within(&self, now: Instant, window: Duration) -> usize {
        self.entries
            .iter()
            .filter(|e| now.duration_since(e.at) < window)
            .count()
    }

    /// Append one admitted request at `now`.
    pub(crate) fn record(&mut self, now: Instant, endpoint: &str) {
        self.entries.push(RequestEntry {
            at: now,
            endpoint: endpoint.to_string(),
        });
    }

    /// Drop entries older than `retention`, returning how many were removed.
    pub(crate) fn purge_older_than(&mut self, now: Instant, retention: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| now.duration_since(e.at) < retention);
        before - self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[RequestEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn empty_history_counts_zero() {
        let window = SlidingWindow::default();
        assert_eq!(window.count_within(Instant::now(), Duration::from_secs(60)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn count_respects_the_rolling_interval() {
        let mut window = SlidingWindow::default();
        window.record(Instant::now(), "portfolio.about");

        tokio::time::advance(Duration::from_secs(30)).await;
        window.record(Instant::now(), "portfolio.about");

        let now = Instant::now();
        assert_eq!(window.count_within(now, Duration::from_secs(60)), 2);

        // 31 more seconds: the first entry falls out of the minute window
        tokio::time::advance(Duration::from_secs(31)).await;
        let now = Instant::now();
        assert_eq!(window.count_within(now, Duration::from_secs(60)), 1);
        assert_eq!(window.count_within(now, Duration::from_secs(3600)), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired_entries() {
        let mut window = SlidingWindow::default();
        window.record(Instant::now(), "portfolio.about");

        tokio::time::advance(Duration::from_secs(3601)).await;
        window.record(Instant::now(), "portfolio.project");

        let removed = window.purge_older_than(Instant::now(), Duration::from_secs(3600));
        assert_eq!(removed, 1);
        assert_eq!(window.len(), 1);
        assert_eq!(window.entries()[0].endpoint, "portfolio.project");
    }

    #[tokio::test(start_paused = true)]
    async fn entries_stay_chronological() {
        let mut window = SlidingWindow::default();
        for _ in 0..5 {
            window.record(Instant::now(), "portfolio.about");
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        let entries = window.entries();
        assert!(entries.windows(2).all(|pair| pair[0].at <= pair[1].at));
    }
}
