//! perfkit - client-side resource coordination
//!
//! Primitives for interactive single-threaded applications: a TTL read
//! cache, debounce and throttle controllers, a coalescing render scheduler,
//! a listener dedup registry, an incremental batch renderer, a FIFO-bounded
//! memoizer and a lazy-activation observer factory.
//!
//! Every component owns its state and receives time through an injected
//! [`runtime::Scheduler`].

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod render;
pub mod runtime;
pub mod timing;

pub use config::Config;
pub use error::{PerfError, Result};
