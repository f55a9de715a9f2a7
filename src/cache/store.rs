//! TTL Cache Module
//!
//! Bounded-staleness read cache: values read as absent once older than the
//! configured TTL. There is no background eviction and no size bound; stale
//! entries stay in memory until overwritten, invalidated or purged.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats};
use crate::config::Config;
use crate::runtime::{millis, Clock};

/// Default lifetime of a cached value.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(3000);

// == TTL Cache ==
/// Key/value memoization with time-based invalidation.
///
/// Staleness and absence look the same to callers: `get` returns `None` for
/// both, so callers always need a recomputation path.
pub struct TtlCache<V> {
    /// Key to value and store time
    entries: HashMap<String, CacheEntry<V>>,
    /// Time source for store stamps and age checks
    clock: Rc<dyn Clock>,
    /// Maximum age in milliseconds
    ttl_ms: u64,
    /// Lookup statistics
    stats: CacheStats,
}

impl<V> TtlCache<V> {
    // == Constructor ==
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(clock: Rc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
            ttl_ms: millis(ttl),
            stats: CacheStats::new(),
        }
    }

    /// Creates an empty cache with the default 3000 ms TTL.
    pub fn with_default_ttl(clock: Rc<dyn Clock>) -> Self {
        Self::new(clock, DEFAULT_CACHE_TTL)
    }

    /// Creates an empty cache using `config.cache_ttl_ms`.
    pub fn from_config(clock: Rc<dyn Clock>, config: &Config) -> Self {
        Self::new(clock, config.cache_ttl())
    }

    // == Get ==
    /// Returns the value for `key` if it was stored less than TTL ago.
    pub fn get(&mut self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let now = self.clock.now_ms();
        let fresh = self
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl_ms))
            .map(|entry| entry.value.clone());

        match fresh {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        fresh
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry and
    /// restarting its lifetime.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let now = self.clock.now_ms();
        let key = key.into();
        match self.entries.get_mut(&key) {
            Some(entry) => entry.refresh(value, now),
            None => {
                self.entries.insert(key, CacheEntry::new(value, now));
            }
        }
    }

    // == Invalidate ==
    /// Removes the entry for `key`, if any.
    pub fn invalidate(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            debug!(key, "Cache entry invalidated");
        }
    }

    // == Invalidate All ==
    /// Removes every entry.
    pub fn invalidate_all(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count, "Cache cleared");
    }

    // == Purge Stale ==
    /// Drops entries that would read as absent.
    ///
    /// Only runs when called; the cache never evicts on its own.
    /// Returns the number of entries removed.
    pub fn purge_stale(&mut self) -> usize {
        let now = self.clock.now_ms();
        let ttl_ms = self.ttl_ms;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, ttl_ms));

        let removed = before - self.entries.len();
        self.stats.record_evictions(removed);
        if removed > 0 {
            debug!(removed, "Purged stale cache entries");
        }
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
