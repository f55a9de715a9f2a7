//! Configuration Module
//!
//! Handles loading component defaults (TTLs, delays, batch sizes) from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PerfError, Result};
use crate::events::RootMargin;

/// Component defaults.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum age in milliseconds before a TTL cache entry reads as absent
    pub cache_ttl_ms: u64,
    /// Quiet period in milliseconds before a debounced call fires
    pub debounce_delay_ms: u64,
    /// Throttle window in milliseconds
    pub throttle_limit_ms: u64,
    /// Rows appended per frame by the batch renderer
    pub batch_size: usize,
    /// Maximum age in milliseconds of a memoized result
    pub memo_ttl_ms: u64,
    /// Entry bound of a memoized function before FIFO eviction
    pub memo_max_entries: usize,
    /// CSS-style margin expanding the lazy loader's viewport
    pub lazy_root_margin: String,
    /// Visible fraction at which the lazy loader fires
    pub lazy_threshold: f64,
    /// Interval in milliseconds between frame ticks of the tokio scheduler
    pub frame_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PERFKIT_CACHE_TTL_MS` - TTL cache lifetime (default: 3000)
    /// - `PERFKIT_DEBOUNCE_MS` - Debounce delay (default: 300)
    /// - `PERFKIT_THROTTLE_MS` - Throttle window (default: 100)
    /// - `PERFKIT_BATCH_SIZE` - Batch renderer rows per frame (default: 100)
    /// - `PERFKIT_MEMO_TTL_MS` - Memoized result lifetime (default: 5000)
    /// - `PERFKIT_MEMO_MAX_ENTRIES` - Memoized entry bound (default: 100)
    /// - `PERFKIT_LAZY_ROOT_MARGIN` - Lazy loader root margin (default: "100px")
    /// - `PERFKIT_LAZY_THRESHOLD` - Lazy loader threshold (default: 0.1)
    /// - `PERFKIT_FRAME_INTERVAL_MS` - Frame tick interval (default: 16)
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl_ms: env_or("PERFKIT_CACHE_TTL_MS", defaults.cache_ttl_ms),
            debounce_delay_ms: env_or("PERFKIT_DEBOUNCE_MS", defaults.debounce_delay_ms),
            throttle_limit_ms: env_or("PERFKIT_THROTTLE_MS", defaults.throttle_limit_ms),
            batch_size: env_or("PERFKIT_BATCH_SIZE", defaults.batch_size),
            memo_ttl_ms: env_or("PERFKIT_MEMO_TTL_MS", defaults.memo_ttl_ms),
            memo_max_entries: env_or("PERFKIT_MEMO_MAX_ENTRIES", defaults.memo_max_entries),
            lazy_root_margin: env::var("PERFKIT_LAZY_ROOT_MARGIN")
                .unwrap_or(defaults.lazy_root_margin),
            lazy_threshold: env_or("PERFKIT_LAZY_THRESHOLD", defaults.lazy_threshold),
            frame_interval_ms: env_or("PERFKIT_FRAME_INTERVAL_MS", defaults.frame_interval_ms),
        }
    }

    /// Rejects values no component can operate with.
    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("cache_ttl_ms", self.cache_ttl_ms),
            ("memo_ttl_ms", self.memo_ttl_ms),
            ("frame_interval_ms", self.frame_interval_ms),
            ("batch_size", self.batch_size as u64),
            ("memo_max_entries", self.memo_max_entries as u64),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(PerfError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.lazy_threshold) {
            return Err(PerfError::InvalidConfig(format!(
                "lazy_threshold must be within 0.0..=1.0, got {}",
                self.lazy_threshold
            )));
        }

        self.lazy_root_margin
            .parse::<RootMargin>()
            .map_err(|err| PerfError::InvalidConfig(err.to_string()))?;

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    pub fn throttle_limit(&self) -> Duration {
        Duration::from_millis(self.throttle_limit_ms)
    }

    pub fn memo_ttl(&self) -> Duration {
        Duration::from_millis(self.memo_ttl_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 3000,
            debounce_delay_ms: 300,
            throttle_limit_ms: 100,
            batch_size: 100,
            memo_ttl_ms: 5000,
            memo_max_entries: 100,
            lazy_root_margin: "100px".to_string(),
            lazy_threshold: 0.1,
            frame_interval_ms: 16,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
