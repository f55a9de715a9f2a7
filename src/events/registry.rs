//! Listener Dedup Registry
//!
//! Prevents attaching the same event listener twice. Listeners are keyed by
//! an explicit id when one is given, otherwise by the listener's name,
//! together with the event name.
//!
//! Name-derived keys collide: two different handlers sharing a name and an
//! event are treated as the same listener and the second one is skipped.
//! Pass an explicit id when listeners must stay distinguishable.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

// == Listener ==
/// A named event handler. Clones share the same handler.
pub struct Listener<E> {
    name: String,
    handler: Rc<dyn Fn(&E)>,
}

impl<E> Listener<E> {
    pub fn new(name: impl Into<String>, handler: impl Fn(&E) + 'static) -> Self {
        Self {
            name: name.into(),
            handler: Rc::new(handler),
        }
    }

    /// A listener with an empty name. All anonymous listeners on the same
    /// event share one registry key unless registered with an explicit id.
    pub fn anonymous(handler: impl Fn(&E) + 'static) -> Self {
        Self::new("", handler)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether both values wrap the very same handler.
    pub fn same_handler(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handler, &other.handler)
    }

    pub fn invoke(&self, event: &E) {
        (self.handler)(event)
    }
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: Rc::clone(&self.handler),
        }
    }
}

impl<E> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("name", &self.name).finish()
    }
}

// == Event Target ==
/// Host object listeners attach to.
pub trait EventTarget<E> {
    fn add_event_listener(&mut self, event: &str, listener: Listener<E>);

    /// Detaches `listener`. Unknown listeners are ignored.
    fn remove_event_listener(&mut self, event: &str, listener: &Listener<E>);
}

// == Listener List ==
/// In-memory event target dispatching to its listeners in attach order.
pub struct ListenerList<E> {
    listeners: Vec<(String, Listener<E>)>,
}

impl<E> Default for ListenerList<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E> ListenerList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes every listener attached to `event`. Returns how many ran.
    pub fn dispatch(&self, event: &str, payload: &E) -> usize {
        let mut count = 0;
        for (name, listener) in &self.listeners {
            if name == event {
                listener.invoke(payload);
                count += 1;
            }
        }
        count
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.iter().filter(|(name, _)| name == event).count()
    }
}

impl<E> EventTarget<E> for ListenerList<E> {
    fn add_event_listener(&mut self, event: &str, listener: Listener<E>) {
        self.listeners.push((event.to_string(), listener));
    }

    fn remove_event_listener(&mut self, event: &str, listener: &Listener<E>) {
        if let Some(index) = self
            .listeners
            .iter()
            .position(|(name, l)| name == event && l.same_handler(listener))
        {
            self.listeners.remove(index);
        }
    }
}

// == Listener Key ==
/// Registry key: explicit id or listener name, plus the event name.
///
/// The target is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub owner: String,
    pub event: String,
}

impl ListenerKey {
    pub fn derive<E>(event: &str, listener: &Listener<E>, id: Option<&str>) -> Self {
        Self {
            owner: id.unwrap_or(listener.name()).to_string(),
            event: event.to_string(),
        }
    }
}

// == Listener Registry ==
/// Tracks which listeners are attached so repeated registrations are no-ops.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    keys: HashSet<ListenerKey>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Add Unique ==
    /// Attaches `listener` unless its key is already registered.
    ///
    /// Returns `true` when attached, `false` when skipped as a duplicate.
    pub fn add_unique<E, T>(
        &mut self,
        target: &mut T,
        event: &str,
        listener: &Listener<E>,
        id: Option<&str>,
    ) -> bool
    where
        T: EventTarget<E> + ?Sized,
    {
        let key = ListenerKey::derive(event, listener, id);
        if self.keys.contains(&key) {
            debug!(owner = %key.owner, event, "Duplicate listener skipped");
            return false;
        }

        target.add_event_listener(event, listener.clone());
        self.keys.insert(key);
        true
    }

    // == Remove Unique ==
    /// Clears the key and detaches `listener`, whether or not it was ever
    /// attached.
    pub fn remove_unique<E, T>(
        &mut self,
        target: &mut T,
        event: &str,
        listener: &Listener<E>,
        id: Option<&str>,
    ) where
        T: EventTarget<E> + ?Sized,
    {
        self.keys.remove(&ListenerKey::derive(event, listener, id));
        target.remove_event_listener(event, listener);
    }

    pub fn contains<E>(&self, event: &str, listener: &Listener<E>, id: Option<&str>) -> bool {
        self.keys.contains(&ListenerKey::derive(event, listener, id))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting(name: &str) -> (Rc<Cell<u32>>, Listener<u32>) {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let listener = Listener::new(name, move |_: &u32| counter.set(counter.get() + 1));
        (hits, listener)
    }

    #[test]
    fn test_add_unique_rejects_duplicate() {
        let mut registry = ListenerRegistry::new();
        let mut target = ListenerList::new();
        let (hits, on_click) = counting("onClick");

        assert!(registry.add_unique(&mut target, "click", &on_click, None));
        assert!(!registry.add_unique(&mut target, "click", &on_click, None));

        assert_eq!(target.dispatch("click", &1), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_remove_then_add_again() {
        let mut registry = ListenerRegistry::new();
        let mut target = ListenerList::new();
        let (_, on_click) = counting("onClick");

        assert!(registry.add_unique(&mut target, "click", &on_click, Some("row-7")));
        registry.remove_unique(&mut target, "click", &on_click, Some("row-7"));
        assert_eq!(target.listener_count("click"), 0);
        assert!(registry.is_empty());

        assert!(registry.add_unique(&mut target, "click", &on_click, Some("row-7")));
        assert_eq!(target.listener_count("click"), 1);
    }

    #[test]
    fn test_remove_never_added_is_noop() {
        let mut registry = ListenerRegistry::new();
        let mut target: ListenerList<u32> = ListenerList::new();
        let (_, on_click) = counting("onClick");

        registry.remove_unique(&mut target, "click", &on_click, None);
        registry.remove_unique(&mut target, "click", &on_click, None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_same_name_collides_without_id() {
        let mut registry = ListenerRegistry::new();
        let mut target = ListenerList::new();
        let (first_hits, first) = counting("handler");
        let (second_hits, second) = counting("handler");

        assert!(registry.add_unique(&mut target, "scroll", &first, None));
        assert!(!registry.add_unique(&mut target, "scroll", &second, None));

        target.dispatch("scroll", &0);
        assert_eq!(first_hits.get(), 1);
        assert_eq!(second_hits.get(), 0);
    }

    #[test]
    fn test_anonymous_listeners_collide() {
        let mut registry = ListenerRegistry::new();
        let mut target = ListenerList::new();

        assert!(registry.add_unique(&mut target, "input", &Listener::anonymous(|_: &u32| {}), None));
        assert!(!registry.add_unique(&mut target, "input", &Listener::anonymous(|_: &u32| {}), None));
    }

    #[test]
    fn test_explicit_ids_keep_listeners_distinct() {
        let mut registry = ListenerRegistry::new();
        let mut target = ListenerList::new();
        let (_, first) = counting("handler");
        let (_, second) = counting("handler");

        assert!(registry.add_unique(&mut target, "scroll", &first, Some("list")));
        assert!(registry.add_unique(&mut target, "scroll", &second, Some("sidebar")));
        assert_eq!(target.dispatch("scroll", &0), 2);
        assert!(registry.contains("scroll", &second, Some("sidebar")));
    }

    #[test]
    fn test_same_key_on_other_event_is_distinct() {
        let mut registry = ListenerRegistry::new();
        let mut target = ListenerList::new();
        let (_, handler) = counting("handler");

        assert!(registry.add_unique(&mut target, "focus", &handler, None));
        assert!(registry.add_unique(&mut target, "blur", &handler, None));
        assert_eq!(registry.len(), 2);
    }
}
