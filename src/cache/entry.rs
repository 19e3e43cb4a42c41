//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with expiry.

use std::time::Duration;

// == Cache Entry ==
/// Represents a single cache entry with data and expiry metadata.
///
/// Invariant: `expires_at > stored_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// Cache key this entry is stored under
    pub key: String,
    /// The stored data
    pub data: T,
    /// Creation timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry stored at `now_ms` that lives for `ttl`.
    ///
    /// A zero TTL is bumped to one millisecond to keep `expires_at > stored_at`.
    pub fn new(key: impl Into<String>, data: T, now_ms: u64, ttl: Duration) -> Self {
        let ttl_ms = (ttl.as_millis() as u64).max(1);
        Self {
            key: key.into(),
            data,
            stored_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
        }
    }

    // == Is Expired ==
    /// Checks if the entry is no longer eligible to be returned.
    ///
    /// The entry is still valid at exactly `expires_at`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}
