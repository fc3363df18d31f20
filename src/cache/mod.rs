//! Caching subsystem.
//!
//! One cache lives here today:
//!
//! - [`response::ResponseCache`] — TTL-bounded store that deduplicates
//!   semantically identical generation requests, so a repeated request
//!   within the validity window never reaches the provider twice. See the
//!   [`response`] module docs for keying, eviction and corruption
//!   semantics.

pub mod response;

pub use response::{CacheConfig, ResponseCache, cache_key};
