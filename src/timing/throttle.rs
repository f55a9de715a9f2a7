//! Throttle Wrapper
//!
//! Caps how often a function runs: the first call runs immediately and opens
//! a window; calls inside the window only replace a single pending-arguments
//! slot, which runs once when the window closes.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::runtime::Scheduler;

/// Default throttle window.
pub const DEFAULT_THROTTLE_LIMIT: Duration = Duration::from_millis(100);

// == Throttler ==
/// Factory wrapping functions with a shared scheduler and default window.
#[derive(Clone)]
pub struct Throttler {
    scheduler: Rc<dyn Scheduler>,
    limit: Duration,
}

impl Throttler {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_limit(scheduler, DEFAULT_THROTTLE_LIMIT)
    }

    pub fn with_limit(scheduler: Rc<dyn Scheduler>, limit: Duration) -> Self {
        Self { scheduler, limit }
    }

    pub fn from_config(scheduler: Rc<dyn Scheduler>, config: &Config) -> Self {
        Self::with_limit(scheduler, config.throttle_limit())
    }

    /// Wraps `f` with the default window.
    pub fn wrap<A, F>(&self, f: F) -> Throttled<A>
    where
        A: 'static,
        F: Fn(A) + 'static,
    {
        self.wrap_with_limit(f, self.limit)
    }

    /// Wraps `f` with an explicit window.
    pub fn wrap_with_limit<A, F>(&self, f: F, limit: Duration) -> Throttled<A>
    where
        A: 'static,
        F: Fn(A) + 'static,
    {
        Throttled {
            inner: Rc::new(ThrottleInner {
                scheduler: Rc::clone(&self.scheduler),
                limit,
                f: Box::new(f),
                state: RefCell::new(ThrottleState {
                    waiting: false,
                    last_args: None,
                }),
            }),
        }
    }
}

// == Throttled ==
/// A throttled function. Cloning yields another handle to the same window.
pub struct Throttled<A> {
    inner: Rc<ThrottleInner<A>>,
}

impl<A> Clone for Throttled<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct ThrottleInner<A> {
    scheduler: Rc<dyn Scheduler>,
    limit: Duration,
    f: Box<dyn Fn(A)>,
    state: RefCell<ThrottleState<A>>,
}

struct ThrottleState<A> {
    /// A window is open
    waiting: bool,
    /// Arguments of the latest call made inside the window
    last_args: Option<A>,
}

impl<A: 'static> Throttled<A> {
    // == Call ==
    /// Runs immediately when idle; otherwise stores `args` for the trailing
    /// call, replacing anything stored earlier in the window.
    pub fn call(&self, args: A) {
        let run_now = {
            let mut state = self.inner.state.borrow_mut();
            if state.waiting {
                if state.last_args.replace(args).is_some() {
                    debug!("Throttled call superseded");
                }
                None
            } else {
                state.waiting = true;
                Some(args)
            }
        };

        if let Some(args) = run_now {
            // Window is armed first so a panicking `f` cannot leave it open forever
            ThrottleInner::open_window(&self.inner);
            (self.inner.f)(args);
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.inner.state.borrow().waiting
    }

    pub fn has_pending(&self) -> bool {
        self.inner.state.borrow().last_args.is_some()
    }

    pub fn limit(&self) -> Duration {
        self.inner.limit
    }
}

impl<A: 'static> ThrottleInner<A> {
    fn open_window(inner: &Rc<Self>) {
        let this = Rc::clone(inner);
        inner
            .scheduler
            .set_timeout(inner.limit, Box::new(move || Self::close_window(&this)));
    }

    fn close_window(inner: &Rc<Self>) {
        let pending = inner.state.borrow_mut().last_args.take();
        match pending {
            Some(args) => {
                Self::open_window(inner);
                (inner.f)(args);
            }
            None => inner.state.borrow_mut().waiting = false,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualScheduler;
    use proptest::prelude::*;

    fn setup() -> (Rc<ManualScheduler>, Throttled<u32>, Rc<RefCell<Vec<u32>>>) {
        let scheduler = Rc::new(ManualScheduler::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let throttled = Throttler::new(scheduler.clone()).wrap(move |n: u32| sink.borrow_mut().push(n));
        (scheduler, throttled, seen)
    }

    #[test]
    fn test_first_call_runs_immediately() {
        let (_, throttled, seen) = setup();

        throttled.call(1);
        assert_eq!(*seen.borrow(), vec![1]);
        assert!(throttled.is_waiting());
    }

    #[test]
    fn test_trailing_call_uses_latest_args() {
        let (scheduler, throttled, seen) = setup();

        throttled.call(1);
        throttled.call(2);
        throttled.call(3);
        assert!(throttled.has_pending());

        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*seen.borrow(), vec![1, 3]);

        // Window restarted after the trailing call, then goes idle
        assert!(throttled.is_waiting());
        scheduler.advance(Duration::from_millis(100));
        assert!(!throttled.is_waiting());
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_idle_after_quiet_window() {
        let (scheduler, throttled, seen) = setup();

        throttled.call(1);
        scheduler.advance(Duration::from_millis(100));
        assert!(!throttled.is_waiting());

        throttled.call(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_restarted_window_collects_new_calls() {
        let (scheduler, throttled, seen) = setup();

        throttled.call(1);
        throttled.call(2);
        scheduler.advance(Duration::from_millis(100));
        throttled.call(3);
        throttled.call(4);
        scheduler.advance(Duration::from_millis(100));

        assert_eq!(*seen.borrow(), vec![1, 2, 4]);
    }

    #[test]
    fn test_custom_limit() {
        let scheduler = Rc::new(ManualScheduler::new());
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let throttled = Throttler::new(scheduler.clone())
            .wrap_with_limit(move |()| *sink.borrow_mut() += 1, Duration::from_millis(500));

        throttled.call(());
        throttled.call(());
        scheduler.advance(Duration::from_millis(499));
        assert_eq!(*count.borrow(), 1);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(*count.borrow(), 2);
        assert_eq!(throttled.limit(), Duration::from_millis(500));
    }

    #[test]
    fn test_panicking_call_still_closes_window() {
        let scheduler = Rc::new(ManualScheduler::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let throttled = Throttler::new(scheduler.clone()).wrap(move |n: u32| {
            if n == 0 {
                panic!("render failed");
            }
            sink.borrow_mut().push(n);
        });

        let leading = throttled.clone();
        assert!(std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| leading.call(0))).is_err());
        assert_eq!(scheduler.pending_timers(), 1);

        scheduler.advance(Duration::from_secs(10));
        assert!(!throttled.is_waiting());

        throttled.call(1);
        scheduler.advance(Duration::from_secs(10));
        throttled.call(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_panicking_trailing_call_keeps_window_cycle() {
        let scheduler = Rc::new(ManualScheduler::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let throttled = Throttler::new(scheduler.clone()).wrap(move |n: u32| {
            if n == 0 {
                panic!("render failed");
            }
            sink.borrow_mut().push(n);
        });

        throttled.call(1);
        throttled.call(0);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.advance(Duration::from_millis(100))
        }));
        assert!(result.is_err());
        assert_eq!(scheduler.pending_timers(), 1);

        scheduler.advance(Duration::from_millis(100));
        assert!(!throttled.is_waiting());
        throttled.call(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    proptest! {
        // N calls inside one window produce exactly two executions.
        #[test]
        fn prop_burst_runs_twice(args in prop::collection::vec(any::<u32>(), 2..50)) {
            let (scheduler, throttled, seen) = setup();

            for n in &args {
                throttled.call(*n);
            }
            scheduler.advance(Duration::from_millis(1000));

            let expected = vec![args[0], *args.last().unwrap()];
            prop_assert_eq!(&*seen.borrow(), &expected);
        }
    }
}
