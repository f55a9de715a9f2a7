//! Lazy-Activation Observer Factory
//!
//! Wraps a host viewport-intersection primitive so a callback fires for
//! elements as they scroll into view (images, deferred sections).

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use tracing::debug;

use crate::config::Config;
use crate::error::{PerfError, Result};

// == Margin Length ==
/// One side of a root margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginLength {
    Px(f64),
    Percent(f64),
}

impl FromStr for MarginLength {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PerfError::InvalidOption(format!("invalid margin length '{}'", s));
        let (number, build): (&str, fn(f64) -> MarginLength) = if let Some(n) = s.strip_suffix("px") {
            (n, MarginLength::Px)
        } else if let Some(n) = s.strip_suffix('%') {
            (n, MarginLength::Percent)
        } else if s == "0" {
            return Ok(MarginLength::Px(0.0));
        } else {
            return Err(invalid());
        };

        let value: f64 = number.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(build(value))
    }
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginLength::Px(v) => write!(f, "{}px", v),
            MarginLength::Percent(v) => write!(f, "{}%", v),
        }
    }
}

// == Root Margin ==
/// Viewport expansion in CSS margin shorthand (1 to 4 lengths).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: MarginLength,
    pub right: MarginLength,
    pub bottom: MarginLength,
    pub left: MarginLength,
}

impl FromStr for RootMargin {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split_whitespace()
            .map(|part| part.parse::<MarginLength>())
            .collect::<Result<Vec<MarginLength>>>()?;

        let (top, right, bottom, left) = match parts.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => {
                return Err(PerfError::InvalidOption(format!(
                    "root margin '{}' must have 1 to 4 lengths",
                    s
                )))
            }
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

// == Options ==
/// Options for [`create_lazy_loader`].
#[derive(Debug, Clone)]
pub struct LazyOptions<E> {
    /// Scroll container used as the viewport; `None` means the host viewport
    pub root: Option<E>,
    pub root_margin: String,
    pub threshold: f64,
}

impl<E> Default for LazyOptions<E> {
    fn default() -> Self {
        Self {
            root: None,
            root_margin: "100px".to_string(),
            threshold: 0.1,
        }
    }
}

impl<E> LazyOptions<E> {
    pub fn from_config(config: &Config) -> Self {
        Self {
            root: None,
            root_margin: config.lazy_root_margin.clone(),
            threshold: config.lazy_threshold,
        }
    }
}

/// Validated options handed to the platform.
#[derive(Debug, Clone)]
pub struct ObserverInit<'a, E> {
    pub root: Option<&'a E>,
    pub root_margin: RootMargin,
    pub threshold: f64,
}

// == Platform Contract ==
/// One intersection change delivered by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry<E> {
    pub target: E,
    pub is_intersecting: bool,
}

/// Receives batches of intersection changes.
pub type EntriesCallback<E> = Box<dyn FnMut(Vec<IntersectionEntry<E>>)>;

/// Observer handle produced by the platform.
pub trait ViewportObserver<E> {
    fn observe(&self, target: &E);
    fn unobserve(&self, target: &E);
    fn disconnect(&self);
}

/// Host viewport-intersection primitive.
pub trait IntersectionPlatform<E> {
    type Observer: ViewportObserver<E>;

    fn create_observer(
        &self,
        init: ObserverInit<'_, E>,
        on_entries: EntriesCallback<E>,
    ) -> Self::Observer;
}

// == Lazy Loader ==
/// Handle returned by [`create_lazy_loader`].
pub struct LazyLoader<E, O> {
    observer: O,
    root_margin: RootMargin,
    threshold: f64,
    _target: PhantomData<fn(&E)>,
}

impl<E, O> LazyLoader<E, O>
where
    O: ViewportObserver<E>,
{
    pub fn observe(&self, target: &E) {
        self.observer.observe(target);
    }

    pub fn unobserve(&self, target: &E) {
        self.observer.unobserve(target);
    }

    pub fn disconnect(&self) {
        self.observer.disconnect();
    }

    pub fn root_margin(&self) -> RootMargin {
        self.root_margin
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

// == Create Lazy Loader ==
/// Creates an observer that calls `callback(target)` for each delivered
/// entry that is intersecting. Adds no debouncing of its own.
///
/// # Errors
/// `PerfError::InvalidOption` for a threshold outside `0.0..=1.0` or a
/// root margin that is not 1 to 4 `px`/`%` lengths.
pub fn create_lazy_loader<E, P, F>(
    platform: &P,
    mut callback: F,
    options: LazyOptions<E>,
) -> Result<LazyLoader<E, P::Observer>>
where
    E: 'static,
    P: IntersectionPlatform<E>,
    F: FnMut(&E) + 'static,
{
    if !(0.0..=1.0).contains(&options.threshold) {
        return Err(PerfError::InvalidOption(format!(
            "threshold must be within 0.0..=1.0, got {}",
            options.threshold
        )));
    }
    let root_margin: RootMargin = options.root_margin.parse()?;

    let init = ObserverInit {
        root: options.root.as_ref(),
        root_margin,
        threshold: options.threshold,
    };
    let observer = platform.create_observer(
        init,
        Box::new(move |entries: Vec<IntersectionEntry<E>>| {
            for entry in entries.iter().filter(|entry| entry.is_intersecting) {
                callback(&entry.target);
            }
        }),
    );
    debug!(root_margin = %root_margin, threshold = options.threshold, "Lazy loader created");

    Ok(LazyLoader {
        observer,
        root_margin,
        threshold: options.threshold,
        _target: PhantomData,
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    /// Platform double: records observed targets and lets tests deliver entries.
    #[derive(Default)]
    struct FakeViewport {
        shared: Rc<FakeShared>,
    }

    #[derive(Default)]
    struct FakeShared {
        observed: RefCell<HashSet<&'static str>>,
        callback: RefCell<Option<EntriesCallback<&'static str>>>,
        init: RefCell<Option<(RootMargin, f64, Option<&'static str>)>>,
    }

    struct FakeObserver {
        shared: Rc<FakeShared>,
    }

    impl FakeViewport {
        /// Delivers entries for observed targets only, like a real platform.
        fn deliver(&self, entries: Vec<(&'static str, bool)>) {
            let observed = self.shared.observed.borrow().clone();
            let entries = entries
                .into_iter()
                .filter(|(target, _)| observed.contains(target))
                .map(|(target, is_intersecting)| IntersectionEntry {
                    target,
                    is_intersecting,
                })
                .collect();
            if let Some(callback) = self.shared.callback.borrow_mut().as_mut() {
                callback(entries);
            }
        }
    }

    impl IntersectionPlatform<&'static str> for FakeViewport {
        type Observer = FakeObserver;

        fn create_observer(
            &self,
            init: ObserverInit<'_, &'static str>,
            on_entries: EntriesCallback<&'static str>,
        ) -> FakeObserver {
            *self.shared.init.borrow_mut() =
                Some((init.root_margin, init.threshold, init.root.copied()));
            *self.shared.callback.borrow_mut() = Some(on_entries);
            FakeObserver {
                shared: Rc::clone(&self.shared),
            }
        }
    }

    impl ViewportObserver<&'static str> for FakeObserver {
        fn observe(&self, target: &&'static str) {
            self.shared.observed.borrow_mut().insert(*target);
        }

        fn unobserve(&self, target: &&'static str) {
            self.shared.observed.borrow_mut().remove(target);
        }

        fn disconnect(&self) {
            self.shared.observed.borrow_mut().clear();
        }
    }

    fn loaded_log() -> (Rc<RefCell<Vec<&'static str>>>, impl FnMut(&&'static str)) {
        let loaded = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&loaded);
        (loaded, move |target: &&'static str| sink.borrow_mut().push(*target))
    }

    #[test]
    fn test_callback_fires_for_intersecting_entries() {
        let viewport = FakeViewport::default();
        let (loaded, callback) = loaded_log();
        let loader = create_lazy_loader(&viewport, callback, LazyOptions::default()).unwrap();

        loader.observe(&"img-1");
        loader.observe(&"img-2");
        viewport.deliver(vec![("img-1", true), ("img-2", false)]);
        viewport.deliver(vec![("img-1", true)]);

        // One call per delivered crossing, no extra dedup
        assert_eq!(*loaded.borrow(), vec!["img-1", "img-1"]);
    }

    #[test]
    fn test_unobserve_and_disconnect() {
        let viewport = FakeViewport::default();
        let (loaded, callback) = loaded_log();
        let loader = create_lazy_loader(&viewport, callback, LazyOptions::default()).unwrap();

        loader.observe(&"a");
        loader.observe(&"b");
        loader.unobserve(&"a");
        viewport.deliver(vec![("a", true), ("b", true)]);
        assert_eq!(*loaded.borrow(), vec!["b"]);

        loader.disconnect();
        viewport.deliver(vec![("b", true)]);
        assert_eq!(loaded.borrow().len(), 1);
    }

    #[test]
    fn test_defaults_reach_platform() {
        let viewport = FakeViewport::default();
        let (_, callback) = loaded_log();
        let options = LazyOptions {
            root: Some("scroller"),
            ..LazyOptions::default()
        };
        let loader = create_lazy_loader(&viewport, callback, options).unwrap();

        let (margin, threshold, root) = viewport.shared.init.borrow().unwrap();
        assert_eq!(margin.top, MarginLength::Px(100.0));
        assert_eq!(margin.left, MarginLength::Px(100.0));
        assert_eq!(threshold, 0.1);
        assert_eq!(root, Some("scroller"));
        assert_eq!(loader.threshold(), 0.1);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let viewport = FakeViewport::default();
        let (_, callback) = loaded_log();
        let options = LazyOptions {
            threshold: -0.5,
            ..LazyOptions::default()
        };
        assert!(matches!(
            create_lazy_loader(&viewport, callback, options),
            Err(PerfError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_root_margin_shorthand() {
        let margin: RootMargin = "10px 5%".parse().unwrap();
        assert_eq!(margin.top, MarginLength::Px(10.0));
        assert_eq!(margin.right, MarginLength::Percent(5.0));
        assert_eq!(margin.bottom, MarginLength::Px(10.0));
        assert_eq!(margin.left, MarginLength::Percent(5.0));

        let margin: RootMargin = "0 1px 2px".parse().unwrap();
        assert_eq!(margin.left, MarginLength::Px(1.0));
        assert_eq!(margin.bottom, MarginLength::Px(2.0));

        assert!("".parse::<RootMargin>().is_err());
        assert!("10em".parse::<RootMargin>().is_err());
        assert!("1px 2px 3px 4px 5px".parse::<RootMargin>().is_err());
    }
}
