//! Heimdall error types

use crate::limiter::RateLimitInfo;

/// Heimdall error types
#[derive(Debug, thiserror::Error)]
pub enum HeimdallError {
    /// Admission denied by the rate limiter.
    ///
    /// Always recoverable by the caller: the embedded [`RateLimitInfo`]
    /// carries the absolute `reset_minute` / `reset_hour` timestamps after
    /// which a retry can succeed. Transport layers map this to HTTP 429
    /// via [`ThrottlePayload`](crate::limiter::ThrottlePayload).
    #[error("rate limit exceeded")]
    Throttled(RateLimitInfo),

    /// The external generation provider failed or returned unusable output.
    #[error("provider error: {0}")]
    Provider(String),

    /// Missing or invalid configuration. Fatal at construction time,
    /// never raised per-request.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Persistence layer failure from a [`PortfolioStore`](crate::traits::PortfolioStore).
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for heimdall operations
pub type Result<T> = std::result::Result<T, HeimdallError>;
