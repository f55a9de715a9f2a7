//! Memoization Module
//!
//! Caches pure-function results keyed by the JSON serialization of their
//! arguments, with a TTL and a FIFO entry bound.

use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, FifoTracker};
use crate::config::Config;
use crate::error::{PerfError, Result};
use crate::runtime::{millis, Clock};

/// Default lifetime of a memoized result.
pub const DEFAULT_MEMO_TTL: Duration = Duration::from_millis(5000);

/// Default number of results kept before the oldest is evicted.
pub const DEFAULT_MEMO_MAX_ENTRIES: usize = 100;

// == Memoizer ==
/// Factory producing memoized functions that share a clock and defaults.
#[derive(Clone)]
pub struct Memoizer {
    clock: Rc<dyn Clock>,
    ttl: Duration,
    max_entries: usize,
}

impl Memoizer {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            ttl: DEFAULT_MEMO_TTL,
            max_entries: DEFAULT_MEMO_MAX_ENTRIES,
        }
    }

    /// Uses `config.memo_ttl_ms` and `config.memo_max_entries`.
    pub fn from_config(clock: Rc<dyn Clock>, config: &Config) -> Result<Self> {
        Self::new(clock)
            .with_ttl(config.memo_ttl())
            .with_max_entries(config.memo_max_entries)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the entry bound. A bound of zero is rejected.
    pub fn with_max_entries(mut self, max_entries: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(PerfError::InvalidOption(
                "memoize bound must be at least 1".to_string(),
            ));
        }
        self.max_entries = max_entries;
        Ok(self)
    }

    /// Wraps `f` using this factory's TTL.
    pub fn memoize<A, R, F>(&self, f: F) -> Memoized<A, R>
    where
        A: Serialize,
        R: Clone,
        F: Fn(&A) -> R + 'static,
    {
        self.memoize_with_ttl(f, self.ttl)
    }

    /// Wraps `f` with an explicit TTL.
    pub fn memoize_with_ttl<A, R, F>(&self, f: F, ttl: Duration) -> Memoized<A, R>
    where
        A: Serialize,
        R: Clone,
        F: Fn(&A) -> R + 'static,
    {
        Memoized {
            f: Box::new(f),
            clock: Rc::clone(&self.clock),
            ttl_ms: millis(ttl),
            max_entries: self.max_entries,
            state: RefCell::new(MemoState::default()),
            _args: PhantomData,
        }
    }
}

// == Memoized ==
/// A function wrapped with a result cache.
///
/// Arguments are keyed by `serde_json::to_string`. Types whose serialization
/// is not deterministic (e.g. `HashMap` iteration order) give undefined hit
/// rates; the returned values are still correct because a miss recomputes.
pub struct Memoized<A, R> {
    f: Box<dyn Fn(&A) -> R>,
    clock: Rc<dyn Clock>,
    ttl_ms: u64,
    max_entries: usize,
    state: RefCell<MemoState<R>>,
    _args: PhantomData<fn(&A)>,
}

struct MemoState<R> {
    entries: HashMap<String, CacheEntry<R>>,
    order: FifoTracker,
    stats: CacheStats,
}

impl<R> Default for MemoState<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: FifoTracker::new(),
            stats: CacheStats::new(),
        }
    }
}

impl<A, R> Memoized<A, R>
where
    A: Serialize,
    R: Clone,
{
    // == Call ==
    /// Returns the cached result for `args` if it is younger than the TTL,
    /// otherwise computes, stores and returns a fresh one.
    ///
    /// Arguments that fail to serialize bypass the cache.
    pub fn call(&self, args: &A) -> R {
        let key = match serde_json::to_string(args) {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "Memoize key serialization failed, bypassing cache");
                return (self.f)(args);
            }
        };

        let now = self.clock.now_ms();
        {
            let mut state = self.state.borrow_mut();
            let cached = state
                .entries
                .get(&key)
                .filter(|entry| entry.is_fresh(now, self.ttl_ms))
                .map(|entry| entry.value.clone());
            if let Some(value) = cached {
                state.stats.record_hit();
                return value;
            }
            state.stats.record_miss();
        }

        // Computed without holding the borrow so `f` may call back in
        let value = (self.f)(args);
        self.store(key, value.clone(), self.clock.now_ms());
        value
    }

    fn store(&self, key: String, value: R, now: u64) {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;

        if let Some(entry) = state.entries.get_mut(&key) {
            // Refreshing keeps the original insertion position
            entry.refresh(value, now);
            return;
        }

        state.order.insert(&key);
        state.entries.insert(key, CacheEntry::new(value, now));

        if state.order.len() > self.max_entries {
            if let Some(oldest) = state.order.evict_oldest() {
                state.entries.remove(&oldest);
                state.stats.record_evictions(1);
                debug!(key = %oldest, "Evicted oldest memoized result");
            }
        }
    }

    /// Whether a fresh result for `args` is cached. Does not touch stats.
    pub fn is_cached(&self, args: &A) -> bool {
        let Ok(key) = serde_json::to_string(args) else {
            return false;
        };
        let now = self.clock.now_ms();
        self.state
            .borrow()
            .entries
            .get(&key)
            .is_some_and(|entry| entry.is_fresh(now, self.ttl_ms))
    }

    /// Drops every cached result.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.entries.clear();
        state.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.borrow();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualScheduler;
    use serde::ser::{Error as _, Serializer};
    use std::cell::Cell;

    fn counting_square(
        memoizer: &Memoizer,
    ) -> (Rc<Cell<u32>>, Memoized<u64, u64>) {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let square = memoizer.memoize(move |n: &u64| {
            counter.set(counter.get() + 1);
            n * n
        });
        (calls, square)
    }

    #[test]
    fn test_memoize_hits_within_ttl() {
        let clock = Rc::new(ManualScheduler::new());
        let (calls, square) = counting_square(&Memoizer::new(clock.clone()));

        assert_eq!(square.call(&4), 16);
        clock.advance(Duration::from_millis(4999));
        assert_eq!(square.call(&4), 16);

        assert_eq!(calls.get(), 1);
        assert_eq!(square.stats().hits, 1);
    }

    #[test]
    fn test_memoize_recomputes_after_ttl() {
        let clock = Rc::new(ManualScheduler::new());
        let (calls, square) = counting_square(&Memoizer::new(clock.clone()));

        square.call(&4);
        clock.advance(Duration::from_millis(5000));
        square.call(&4);

        assert_eq!(calls.get(), 2);
        assert_eq!(square.len(), 1);
    }

    #[test]
    fn test_memoize_distinct_args_are_distinct_keys() {
        let clock = Rc::new(ManualScheduler::new());
        let memoizer = Memoizer::new(clock);
        let join = memoizer.memoize(|(a, b): &(String, u32)| format!("{a}-{b}"));

        assert_eq!(join.call(&("x".to_string(), 1)), "x-1");
        assert_eq!(join.call(&("x".to_string(), 2)), "x-2");
        assert_eq!(join.len(), 2);
    }

    #[test]
    fn test_memoize_fifo_evicts_first_inserted() {
        let clock = Rc::new(ManualScheduler::new());
        let (calls, square) = counting_square(&Memoizer::new(clock.clone()));

        for n in 0..100 {
            square.call(&n);
        }
        // Reading the first key does not protect it from eviction
        square.call(&0);
        assert_eq!(calls.get(), 100);

        square.call(&100);
        assert_eq!(square.len(), 100);
        assert_eq!(square.stats().evictions, 1);
        assert!(!square.is_cached(&0));
        assert!(square.is_cached(&1));

        square.call(&0);
        assert_eq!(calls.get(), 102);
    }

    #[test]
    fn test_memoize_refresh_keeps_insertion_position() {
        let clock = Rc::new(ManualScheduler::new());
        let memoizer = Memoizer::new(clock.clone()).with_max_entries(2).unwrap();
        let (_, square) = counting_square(&memoizer);

        square.call(&1);
        square.call(&2);
        clock.advance(Duration::from_millis(5000));
        square.call(&1); // stale, recomputed in place
        square.call(&3); // evicts 1, the first inserted

        assert!(!square.is_cached(&1));
        assert!(square.is_cached(&3));
    }

    #[test]
    fn test_memoize_rejects_zero_bound() {
        let clock = Rc::new(ManualScheduler::new());
        let result = Memoizer::new(clock).with_max_entries(0);
        assert!(matches!(result, Err(PerfError::InvalidOption(_))));
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("not serializable"))
        }
    }

    #[test]
    fn test_memoize_bypasses_unserializable_args() {
        let clock = Rc::new(ManualScheduler::new());
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let f = Memoizer::new(clock).memoize(move |_: &Unserializable| {
            counter.set(counter.get() + 1);
            "computed"
        });

        assert_eq!(f.call(&Unserializable), "computed");
        assert_eq!(f.call(&Unserializable), "computed");
        assert_eq!(calls.get(), 2);
        assert!(f.is_empty());
    }

    #[test]
    fn test_memoize_clear() {
        let clock = Rc::new(ManualScheduler::new());
        let (calls, square) = counting_square(&Memoizer::new(clock));

        square.call(&3);
        square.clear();
        square.call(&3);

        assert_eq!(calls.get(), 2);
    }
}
