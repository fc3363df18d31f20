//! Client identity resolution.
//!
//! Both the rate limiter and any per-caller accounting shard on a single
//! opaque key: the authenticated user id when one is present, otherwise
//! the network origin. Identities are derived per request and never
//! persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque caller key used for rate accounting.
///
/// Construct via [`CallerContext::resolve`], or directly with
/// [`ClientIdentity::new`] when the transport layer has already derived
/// a key of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Wrap an already-derived identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request-scoped facts the auth/transport layer knows about the caller.
///
/// The fields mirror what a typical HTTP stack can provide; all are
/// optional so the resolution order below degrades gracefully:
///
/// 1. `user:{user_id}` when the request is authenticated
/// 2. `ip:{first X-Forwarded-For entry}` when behind a proxy
/// 3. `ip:{peer_addr}` for direct connections
/// 4. `ip:unknown` as the last resort
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    /// Authenticated user id, if the request carried a valid credential.
    pub user_id: Option<String>,
    /// Raw `X-Forwarded-For` header value, possibly a comma-separated chain.
    pub forwarded_for: Option<String>,
    /// Direct peer address of the connection.
    pub peer_addr: Option<String>,
}

impl CallerContext {
    /// Resolve this context into the identity used for rate accounting.
    pub fn resolve(&self) -> ClientIdentity {
        if let Some(user_id) = &self.user_id {
            return ClientIdentity(format!("user:{user_id}"));
        }

        if let Some(chain) = &self.forwarded_for
            && let Some(first) = chain.split(',').map(str::trim).find(|s| !s.is_empty())
        {
            return ClientIdentity(format!("ip:{first}"));
        }

        match &self.peer_addr {
            Some(peer) => ClientIdentity(format!("ip:{peer}")),
            None => ClientIdentity("ip:unknown".to_string()),
        }
    }
}
