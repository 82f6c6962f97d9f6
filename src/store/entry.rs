//! Stored value with its expiry deadline

use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A value held by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    /// The value (binary-safe)
    pub payload: Bytes,

    /// Absolute deadline in epoch milliseconds, None = never expires
    pub expires_at: Option<i64>,
}

impl StoredValue {
    /// Create a value without expiration
    pub fn new(payload: impl Into<Bytes>) -> Self {
        StoredValue {
            payload: payload.into(),
            expires_at: None,
        }
    }

    /// Create a value that expires `ttl_millis` after `now`
    pub fn expiring(payload: impl Into<Bytes>, now: i64, ttl_millis: i64) -> Self {
        StoredValue {
            payload: payload.into(),
            expires_at: Some(now.saturating_add(ttl_millis)),
        }
    }

    /// Visible only while the deadline is strictly in the future
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(deadline) => deadline <= now,
            None => false,
        }
    }
}
