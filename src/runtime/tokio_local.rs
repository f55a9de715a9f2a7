//! Tokio Scheduler Module
//!
//! Scheduler backed by `tokio::task::spawn_local` and `tokio::time`.
//! Must be used from inside a `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{millis, Clock, Scheduler, Task, TimerId};

/// Default spacing between frame ticks (~60 frames per second).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

// == Tokio Scheduler ==
/// Runs deferred tasks as local tokio tasks on the current thread.
///
/// Frame requests share one tick: the first request of an idle period arms
/// a single sleep of `frame_interval`, and every task requested before it
/// wakes runs on that tick. Tasks requested while the tick runs wait for
/// the next one.
///
/// Time is read from `tokio::time::Instant`, so paused test runtimes
/// (`#[tokio::test(start_paused = true)]`) advance it deterministically.
pub struct TokioScheduler {
    /// Instant the scheduler was created; `now_ms` is measured from here
    origin: Instant,
    /// Delay used for `request_frame`
    frame_interval: Duration,
    /// Next timer id to hand out
    next_id: Cell<u64>,
    /// Live timers, removed when they fire or are cleared
    timers: Rc<RefCell<HashMap<TimerId, JoinHandle<()>>>>,
    /// Tasks waiting for the next frame tick
    frames: Rc<RefCell<Vec<Task>>>,
}

impl TokioScheduler {
    // == Constructor ==
    /// Creates a scheduler ticking frames every 16 ms.
    pub fn new() -> Self {
        Self::with_frame_interval(DEFAULT_FRAME_INTERVAL)
    }

    /// Creates a scheduler with a custom frame interval.
    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            frame_interval,
            next_id: Cell::new(0),
            timers: Rc::new(RefCell::new(HashMap::new())),
            frames: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Number of timers that have neither fired nor been cleared.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Number of tasks waiting for the next frame tick.
    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioScheduler {
    fn now_ms(&self) -> u64 {
        millis(Instant::now().duration_since(self.origin))
    }
}

impl Scheduler for TokioScheduler {
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        // The spawned task cannot run before the insert below: spawn_local
        // only queues it on the current LocalSet.
        let timers = Rc::clone(&self.timers);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            timers.borrow_mut().remove(&id);
            task();
        });
        self.timers.borrow_mut().insert(id, handle);
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        if let Some(handle) = self.timers.borrow_mut().remove(&id) {
            handle.abort();
            debug!(timer = id.0, "Timer aborted");
        }
    }

    fn request_frame(&self, task: Task) {
        let arm_tick = {
            let mut frames = self.frames.borrow_mut();
            frames.push(task);
            frames.len() == 1
        };
        if !arm_tick {
            return;
        }

        let interval = self.frame_interval;
        let frames = Rc::clone(&self.frames);
        tokio::task::spawn_local(async move {
            tokio::time::sleep(interval).await;
            let tick = std::mem::take(&mut *frames.borrow_mut());
            debug!(tasks = tick.len(), "Frame tick");
            for task in tick {
                task();
            }
        });
    }
}
