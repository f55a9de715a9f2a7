//! Timing Module
//!
//! Rate limiting of repeated invocations.
//!
//! # Controllers
//! - Debouncer: fire once after a quiet period, last call wins
//! - Throttler: fire at most once per window, trailing call gets the latest arguments

mod debounce;
mod throttle;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_DELAY};
pub use throttle::{Throttled, Throttler, DEFAULT_THROTTLE_LIMIT};
