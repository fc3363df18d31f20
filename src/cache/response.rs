//! Result cache for generation responses.
//!
//! [`ResponseCache`] stores opaque content strings keyed by a digest of
//! the semantic request — it knows nothing about what the content means.
//! A hit within the TTL bypasses the provider entirely; everything else
//! regenerates.
//!
//! # Keying
//!
//! [`cache_key`] digests a canonical JSON serialization of
//! `{"operation": name, ...parameters}`. `serde_json`'s map is ordered by
//! key (BTreeMap), so the construction order of equal parameter sets never
//! changes the key. Array order *is* significant: `["x", "y"]` and
//! `["y", "x"]` are different requests unless the caller sorts first.
//!
//! # Eviction
//!
//! Expiry is lazy: a lookup that finds an entry past its TTL purges it and
//! reports a miss. Capacity is a soft cap: when an insert pushes the store
//! past `capacity`, every expired entry is swept in bulk. This is a
//! TTL-based sweep, not LRU — if the store is still over cap afterwards
//! because everything is fresh, it stays over cap until entries age out.
//!
//! # Corruption
//!
//! A cached payload that fails to deserialize is discarded and reported as
//! a miss ([`ResponseCache::get_json`]); the caller regenerates and never
//! sees the failure. The discard is counted and logged so the condition is
//! observable.
//!
//! # Concurrency
//!
//! The map sits behind one mutex; `get` and `put` each take the lock once
//! and do no blocking work inside it. The "miss, regenerate, store"
//! sequence is deliberately not atomic across the cache: concurrent misses
//! for the same key may each invoke the provider (at-least-once
//! generation). Single-flight deduplication is out of scope.
//!
//! # Deployment scope
//!
//! In-memory, per-process. Multiple backend processes each keep their own
//! cache; cross-process deduplication would need a shared external store
//! behind the same interface.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::telemetry;

/// Configuration for the response cache.
///
/// ```rust
/// # use heimdall::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .ttl(Duration::from_secs(600))
///     .capacity(500);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
    /// Soft cap on live entries that triggers the bulk sweep. Default: 100.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            capacity: 100,
        }
    }
}

impl CacheConfig {
    /// Create a new config with the default TTL and capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the soft capacity threshold.
    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }
}

/// One cached artifact. Content is immutable once stored; a re-insert
/// with the same key replaces the entry wholesale.
#[derive(Debug, Clone)]
struct CacheEntry {
    content: String,
    inserted_at: Instant,
}

/// In-memory, TTL-bounded store for generation results.
pub struct ResponseCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up cached content.
    ///
    /// Returns `None` on miss. An entry found past its TTL is purged as a
    /// side effect and reported as a miss. Emits hit/miss metrics.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.config.ttl => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(entry.content.clone())
            }
            Some(_) => {
                entries.remove(key);
                metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Look up cached content and deserialize it as JSON.
    ///
    /// A payload that fails to parse is discarded, counted via
    /// [`telemetry::CACHE_CORRUPT_TOTAL`] and reported as a miss — the
    /// caller regenerates, and the corrupt value is never parsed twice.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let content = self.get(key)?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, %err, "discarding corrupt cache entry");
                metrics::counter!(telemetry::CACHE_CORRUPT_TOTAL).increment(1);
                self.lock().remove(key);
                None
            }
        }
    }

    /// Insert or overwrite an entry with `inserted_at = now`.
    ///
    /// When the insert pushes the store past its capacity threshold, every
    /// entry at or past its TTL is swept in the same lock acquisition.
    pub fn put(&self, key: impl Into<String>, content: impl Into<String>) {
        let now = Instant::now();
        let mut entries = self.lock();
        entries.insert(
            key.into(),
            CacheEntry {
                content: content.into(),
                inserted_at: now,
            },
        );

        if entries.len() > self.config.capacity {
            let ttl = self.config.ttl;
            let before = entries.len();
            entries.retain(|_, e| now.duration_since(e.inserted_at) < ttl);
            let removed = before - entries.len();
            if removed > 0 {
                metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(removed as u64);
            }
            tracing::debug!(removed, live = entries.len(), "cache capacity sweep");
        }
    }

    /// Number of entries currently stored, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Compute a deterministic cache key for a semantic request.
///
/// Digests (SHA-256, hex) a canonical JSON serialization of
/// `{"operation": operation, ...params}` with keys in lexicographic order.
/// Two calls with the same parameters in different construction order
/// yield the same key; the digest is stable across processes, unlike a
/// per-process SipHash.
pub fn cache_key(operation: &str, params: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut canonical = serde_json::Map::new();
    canonical.insert(
        "operation".to_string(),
        serde_json::Value::String(operation.to_string()),
    );
    for (name, value) in params {
        canonical.insert(name.clone(), value.clone());
    }

    let serialized = serde_json::Value::Object(canonical).to_string();
    let digest = Sha256::digest(serialized.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
