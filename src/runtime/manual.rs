//! Manual Scheduler Module
//!
//! Deterministic scheduler with virtual time. Nothing runs until the owner
//! calls [`ManualScheduler::advance`] or [`ManualScheduler::tick_frame`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::mem;
use std::time::Duration;

use tracing::warn;

use super::{millis, Clock, Scheduler, Task, TimerId};

/// Upper bound on timers fired by one [`ManualScheduler::advance`] call.
pub const MAX_TIMERS_PER_ADVANCE: usize = 100_000;

// == Manual Scheduler ==
/// Virtual-time scheduler for tests and headless simulations.
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ManualState>,
}

#[derive(Default)]
struct ManualState {
    /// Virtual time in milliseconds
    now: u64,
    /// Next timer id to hand out
    next_id: u64,
    /// Pending timers keyed by (due time, id) so equal due times keep FIFO order
    timers: BTreeMap<(u64, u64), Task>,
    /// Tasks waiting for the next frame tick
    frames: Vec<Task>,
}

impl ManualScheduler {
    // == Constructor ==
    /// Creates a scheduler whose virtual clock starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Advance ==
    /// Moves virtual time forward by `by`, running every timer that falls due
    /// in due order. Timers scheduled by a running task fire in the same call
    /// if they fall within the window.
    ///
    /// A task that keeps re-arming itself with a zero delay never lets time
    /// move on, so the call stops after [`MAX_TIMERS_PER_ADVANCE`] timers and
    /// leaves the clock at the due time of the last one fired.
    ///
    /// Returns the number of timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.borrow().now.saturating_add(millis(by));
        let mut fired = 0;

        loop {
            if fired == MAX_TIMERS_PER_ADVANCE {
                warn!(fired, "Timer limit reached, advance stopped early");
                return fired;
            }

            // Borrow is released before the task runs so it can reschedule
            let next = {
                let mut state = self.state.borrow_mut();
                let due = state
                    .timers
                    .first_key_value()
                    .map(|(key, _)| *key)
                    .filter(|(at, _)| *at <= target);
                due.and_then(|key| {
                    state.now = state.now.max(key.0);
                    state.timers.remove(&key)
                })
            };

            match next {
                Some(task) => {
                    task();
                    fired += 1;
                }
                None => break,
            }
        }

        let mut state = self.state.borrow_mut();
        state.now = state.now.max(target);
        fired
    }

    // == Tick Frame ==
    /// Runs the tasks requested before this tick. Tasks requested while the
    /// tick runs wait for the next one.
    ///
    /// Returns the number of tasks run.
    pub fn tick_frame(&self) -> usize {
        let frames = mem::take(&mut self.state.borrow_mut().frames);
        let count = frames.len();
        for task in frames {
            task();
        }
        count
    }

    // == Run Frames ==
    /// Ticks frames until none are pending or `max_ticks` is reached.
    ///
    /// Returns the number of ticks performed.
    pub fn run_frames(&self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.pending_frames() > 0 {
            self.tick_frame();
            ticks += 1;
        }
        ticks
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }
}

impl Clock for ManualScheduler {
    fn now_ms(&self) -> u64 {
        self.state.borrow().now
    }
}

impl Scheduler for ManualScheduler {
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now.saturating_add(millis(delay));
        state.timers.insert((due, id), task);
        TimerId(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        self.state
            .borrow_mut()
            .timers
            .retain(|(_, timer), _| *timer != id.0);
    }

    fn request_frame(&self, task: Task) {
        self.state.borrow_mut().frames.push(task);
    }
}
