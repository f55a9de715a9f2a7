//! Cache Module
//!
//! Provides the TTL read cache and the memoizing function cache.

mod entry;
mod fifo;
mod memo;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use fifo::FifoTracker;
pub use memo::{Memoized, Memoizer, DEFAULT_MEMO_MAX_ENTRIES, DEFAULT_MEMO_TTL};
pub use stats::CacheStats;
pub use store::{TtlCache, DEFAULT_CACHE_TTL};
