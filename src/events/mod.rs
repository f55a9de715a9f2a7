//! Events Module
//!
//! Listener bookkeeping and viewport-driven activation.

mod lazy;
mod registry;

pub use lazy::{
    create_lazy_loader, EntriesCallback, IntersectionEntry, IntersectionPlatform, LazyLoader,
    LazyOptions, MarginLength, ObserverInit, RootMargin, ViewportObserver,
};
pub use registry::{EventTarget, Listener, ListenerKey, ListenerList, ListenerRegistry};
