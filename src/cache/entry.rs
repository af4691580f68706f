//! Cache Entry Module
//!
//! Defines the unit of cached state: value, expiry deadline and recency slot.

use std::time::Duration;

use tokio::time::Instant;

use crate::cache::lru::RecencyToken;

/// Upper bound applied to every TTL so that `now + ttl` cannot overflow.
pub(crate) const MAX_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

// == Cache Entry ==
/// A single cache entry.
///
/// Value, deadline and recency slot are always replaced together; the store
/// never holds a value without its matching deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Instant at which the entry stops being served
    pub expires_at: Instant,
    /// Slot of this key in the recency list
    pub(crate) recency: RecencyToken,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry expiring `ttl` after `now`.
    pub fn new(value: V, ttl: Duration, now: Instant, recency: RecencyToken) -> Self {
        Self {
            value,
            expires_at: deadline(now, ttl),
            recency,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now` reaches its
    /// deadline, so a full TTL never serves a stale value.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

}

/// Computes the deadline of an entry written at `now` with the given TTL.
pub(crate) fn deadline(now: Instant, ttl: Duration) -> Instant {
    now + ttl.min(MAX_TTL)
}
