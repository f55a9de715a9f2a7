//! Wall clock backed by chrono.

use chrono::Utc;

use super::Clock;

/// Reads the system wall clock.
///
/// Suitable for the TTL cache and memoizer when no scheduler is around.
/// Timestamps before the Unix epoch read as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}
