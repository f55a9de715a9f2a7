//! Runtime Module
//!
//! Time and deferral capabilities injected into every component.
//!
//! Components never touch real timers directly; they ask a [`Scheduler`] to
//! run a task after a delay or on the next frame tick. Tests drive a
//! [`ManualScheduler`] with virtual time, programs use a [`TokioScheduler`].

mod manual;
mod system;
mod tokio_local;

use std::time::Duration;

pub use manual::{ManualScheduler, MAX_TIMERS_PER_ADVANCE};
pub use system::SystemClock;
pub use tokio_local::TokioScheduler;

/// Deferred unit of work. Runs on the single cooperative thread.
pub type Task = Box<dyn FnOnce() + 'static>;

// == Timer Id ==
/// Handle to a pending timer, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

// == Clock ==
/// Source of the current time in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// == Scheduler ==
/// Deferral capability: "run after duration" and "run on next frame".
pub trait Scheduler: Clock {
    /// Runs `task` once `delay` has elapsed.
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancels a pending timer. Unknown or already fired ids are ignored.
    fn clear_timeout(&self, id: TimerId);

    /// Runs `task` on the next frame tick.
    fn request_frame(&self, task: Task);
}

/// Converts a duration to whole milliseconds, saturating on overflow.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
