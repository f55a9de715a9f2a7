//! Debounce Controller
//!
//! Delays a call until no newer call with the same id arrived for a quiet
//! period. A newer call cancels and replaces the pending one.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::runtime::{Scheduler, TimerId};

/// Default quiet period before a debounced call fires.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

// == Debouncer ==
/// Per-id debouncing of zero-argument calls.
///
/// Calls with different ids are independent. Results are not threaded back;
/// callers communicate through shared state.
#[derive(Clone)]
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    /// Live timer per id
    pending: Rc<RefCell<HashMap<String, TimerId>>>,
    delay: Duration,
}

impl Debouncer {
    // == Constructor ==
    /// Creates a debouncer with the default 300 ms delay.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_delay(scheduler, DEFAULT_DEBOUNCE_DELAY)
    }

    pub fn with_delay(scheduler: Rc<dyn Scheduler>, delay: Duration) -> Self {
        Self {
            scheduler,
            pending: Rc::new(RefCell::new(HashMap::new())),
            delay,
        }
    }

    pub fn from_config(scheduler: Rc<dyn Scheduler>, config: &Config) -> Self {
        Self::with_delay(scheduler, config.debounce_delay())
    }

    // == Schedule ==
    /// Runs `f` after the default delay unless another call for `id`
    /// arrives first.
    pub fn schedule<F>(&self, id: impl Into<String>, f: F)
    where
        F: FnOnce() + 'static,
    {
        self.schedule_after(id, self.delay, f);
    }

    /// Runs `f` after `delay` unless another call for `id` arrives first.
    pub fn schedule_after<F>(&self, id: impl Into<String>, delay: Duration, f: F)
    where
        F: FnOnce() + 'static,
    {
        let id = id.into();
        if self.cancel(&id) {
            debug!(id = %id, "Debounced call superseded");
        }

        let pending = Rc::clone(&self.pending);
        let key = id.clone();
        let timer = self.scheduler.set_timeout(
            delay,
            Box::new(move || {
                pending.borrow_mut().remove(&key);
                f();
            }),
        );
        self.pending.borrow_mut().insert(id, timer);
    }

    // == Cancel ==
    /// Drops the pending call for `id`. Returns whether one was pending.
    pub fn cancel(&self, id: &str) -> bool {
        let timer = self.pending.borrow_mut().remove(id);
        match timer {
            Some(timer) => {
                self.scheduler.clear_timeout(timer);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.borrow().contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
