//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with age tracking.

// == Cache Entry ==
/// A stored value together with the time it was stored.
///
/// Entries carry no expiry of their own; freshness is judged against the
/// owning cache's TTL at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Time of the last store (clock milliseconds)
    pub stored_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with `now`.
    pub fn new(value: V, now: u64) -> Self {
        Self {
            value,
            stored_at: now,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was stored.
    ///
    /// A clock reading earlier than `stored_at` counts as age zero.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.stored_at)
    }

    // == Is Fresh ==
    /// Checks whether the entry is still readable under `ttl_ms`.
    ///
    /// Boundary condition: an entry whose age equals the TTL is stale. Once
    /// the TTL has fully elapsed the entry reads as absent.
    pub fn is_fresh(&self, now: u64, ttl_ms: u64) -> bool {
        self.age_ms(now) < ttl_ms
    }

    // == Refresh ==
    /// Replaces the value and restamps the entry.
    pub fn refresh(&mut self, value: V, now: u64) {
        self.value = value;
        self.stored_at = now;
    }
}
