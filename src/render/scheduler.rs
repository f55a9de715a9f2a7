//! Coalesced Render Scheduler
//!
//! Collects render requests and runs them together on the next frame tick.
//! Requests for the same id replace each other, so each id renders at most
//! once per flush.

use std::cell::RefCell;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, error};

use crate::runtime::Scheduler;

/// Deferred render work. An `Err` is logged and does not affect siblings.
pub type RenderCallback = Box<dyn FnOnce() -> anyhow::Result<()>>;

// == Render Stats ==
/// Counters for flushes and callback outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderStats {
    /// Number of flushes run
    pub flushes: u64,
    /// Callbacks invoked across all flushes
    pub callbacks_run: u64,
    /// Callbacks that returned an error or panicked
    pub failures: u64,
}

// == Render Scheduler ==
/// Batches render callbacks into one flush per frame.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct RenderScheduler {
    scheduler: Rc<dyn Scheduler>,
    state: Rc<RefCell<RenderQueue>>,
}

#[derive(Default)]
struct RenderQueue {
    /// Callbacks in last-registration order, ids unique
    pending: Vec<(String, RenderCallback)>,
    /// A flush is already requested
    queued: bool,
    stats: RenderStats,
}

impl RenderScheduler {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            state: Rc::new(RefCell::new(RenderQueue::default())),
        }
    }

    // == Queue Render ==
    /// Queues `callback` under `id` for the next flush.
    ///
    /// Re-queuing an id replaces its earlier callback and moves it to the
    /// end of the flush order. Only the first call of an idle period
    /// requests a frame.
    pub fn queue_render<F>(&self, id: impl Into<String>, callback: F)
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let id = id.into();
        let request_frame = {
            let mut queue = self.state.borrow_mut();
            queue.pending.retain(|(queued, _)| *queued != id);
            queue.pending.push((id, Box::new(callback)));
            !mem::replace(&mut queue.queued, true)
        };

        if request_frame {
            let state = Rc::clone(&self.state);
            self.scheduler
                .request_frame(Box::new(move || Self::flush(&state)));
        }
    }

    // == Flush ==
    /// Runs every queued callback. The queue is taken and the flag reset
    /// first, so callbacks that queue renders start a new cycle.
    fn flush(state: &Rc<RefCell<RenderQueue>>) {
        let batch = {
            let mut queue = state.borrow_mut();
            queue.queued = false;
            mem::take(&mut queue.pending)
        };
        debug!(callbacks = batch.len(), "Flushing render queue");

        let mut failures = 0;
        let count = batch.len() as u64;
        for (id, callback) in batch {
            match panic::catch_unwind(AssertUnwindSafe(callback)) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    error!(render_id = %id, error = %err, "Render callback failed");
                }
                Err(_) => {
                    failures += 1;
                    error!(render_id = %id, "Render callback panicked");
                }
            }
        }

        let mut queue = state.borrow_mut();
        queue.stats.flushes += 1;
        queue.stats.callbacks_run += count;
        queue.stats.failures += failures;
    }

    /// Number of callbacks waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.state.borrow().queued
    }

    pub fn stats(&self) -> RenderStats {
        self.state.borrow().stats.clone()
    }
}
