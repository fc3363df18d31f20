//! Telemetry metric name constants.
//!
//! Centralised metric names for heimdall operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `heimdall_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `status` — admission outcome: "admitted" or "denied"
//! - `operation` — content operation (e.g. "about", "project", "skills_structure")

/// Total admission decisions made by the rate limiter.
///
/// Labels: `status` ("admitted" | "denied").
pub const ADMISSIONS_TOTAL: &str = "heimdall_admissions_total";

/// Total request-history entries removed by the background sweep.
pub const SWEEP_REMOVED_TOTAL: &str = "heimdall_sweep_removed_total";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "heimdall_cache_hits_total";

/// Total response cache misses (includes lazy TTL expiries).
pub const CACHE_MISSES_TOTAL: &str = "heimdall_cache_misses_total";

/// Total entries removed by TTL expiry, capacity sweep or explicit removal.
pub const CACHE_EVICTIONS_TOTAL: &str = "heimdall_cache_evictions_total";

/// Total cached payloads that failed to deserialize and were discarded.
///
/// Corruption is swallowed on the lookup path (treated as a miss), so this
/// counter is the only signal that it happened.
pub const CACHE_CORRUPT_TOTAL: &str = "heimdall_cache_corrupt_entries_total";

/// Total times a content operation degraded to its local fallback after a
/// provider failure.
///
/// Labels: `operation`.
pub const PROVIDER_FALLBACKS_TOTAL: &str = "heimdall_provider_fallbacks_total";
