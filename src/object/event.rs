//! Event delivery with event filters.
//!
//! [`ObjectTree::send_event`] hands an [`Event`] to a target object. Objects
//! installed as event filters on the target get first refusal: the most
//! recently installed filter runs first, and the first one returning `true`
//! consumes the event before the target's own handler sees it.

use std::rc::Rc;

use super::node::ObjectId;
use super::tree::ObjectTree;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// What an [`Event`] is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A child was attached to the receiving object.
    ChildAdded(ObjectId),
    /// A child was detached from the receiving object.
    ChildRemoved(ObjectId),
    /// A dynamic (bag) property of the receiving object was written.
    DynamicPropertyChange(String),
    /// Application-defined event.
    Custom(String),
}

/// An event descriptor: a kind plus a mutable `accepted` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    accepted: bool,
}

impl Event {
    /// Create a new event. Events start out accepted.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            accepted: true,
        }
    }

    /// Convenience constructor for [`EventKind::Custom`].
    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(EventKind::Custom(name.into()))
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn accept(&mut self) {
        self.accepted = true;
    }

    pub fn ignore(&mut self) {
        self.accepted = false;
    }

    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Event handler: `(tree, receiver, event) -> handled`.
///
/// For filters the receiver argument is the watched object.
pub type EventHandler = Rc<dyn Fn(&mut ObjectTree, ObjectId, &mut Event) -> bool>;

/// Per-object event state.
#[derive(Default)]
pub(crate) struct EventHooks {
    handler: Option<EventHandler>,
    filter_handler: Option<EventHandler>,
    /// Installed filters, most recent first.
    filters: Vec<ObjectId>,
}

// ---------------------------------------------------------------------------
// ObjectTree: event API
// ---------------------------------------------------------------------------

impl ObjectTree {
    /// Set the handler that receives events sent to `id`.
    pub fn set_event_handler(
        &mut self,
        id: ObjectId,
        handler: impl Fn(&mut ObjectTree, ObjectId, &mut Event) -> bool + 'static,
    ) {
        if let Some(hooks) = self.events.get_mut(id) {
            hooks.handler = Some(Rc::new(handler));
        }
    }

    /// Set the handler `id` runs when acting as an event filter for another
    /// object. Returning `true` consumes the event.
    pub fn set_event_filter_handler(
        &mut self,
        id: ObjectId,
        handler: impl Fn(&mut ObjectTree, ObjectId, &mut Event) -> bool + 'static,
    ) {
        if let Some(hooks) = self.events.get_mut(id) {
            hooks.filter_handler = Some(Rc::new(handler));
        }
    }

    /// Install `filter` as an event filter on `target`.
    ///
    /// Installing a filter that is already present moves it to the front.
    pub fn install_event_filter(&mut self, target: ObjectId, filter: ObjectId) {
        if !self.is_alive(target) || !self.is_alive(filter) {
            return;
        }
        if let Some(hooks) = self.events.get_mut(target) {
            hooks.filters.retain(|&f| f != filter);
            hooks.filters.insert(0, filter);
        }
    }

    /// Remove `filter` from `target`. Absent filters are ignored.
    pub fn remove_event_filter(&mut self, target: ObjectId, filter: ObjectId) {
        if let Some(hooks) = self.events.get_mut(target) {
            hooks.filters.retain(|&f| f != filter);
        }
    }

    /// Live filters installed on `target`, most recent first.
    pub fn event_filters(&self, target: ObjectId) -> Vec<ObjectId> {
        self.events
            .get(target)
            .map(|hooks| {
                hooks
                    .filters
                    .iter()
                    .copied()
                    .filter(|&f| self.is_alive(f))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deliver `event` to `target`.
    ///
    /// Returns `true` if a filter consumed the event or the target's handler
    /// reported it handled. Destroyed targets and objects without a handler
    /// return `false`.
    pub fn send_event(&mut self, target: ObjectId, event: &mut Event) -> bool {
        if !self.is_alive(target) {
            return false;
        }
        for filter in self.event_filters(target) {
            if !self.is_alive(filter) {
                continue;
            }
            let handler = self.events.get(filter).and_then(|h| h.filter_handler.clone());
            if let Some(handler) = handler {
                if handler(self, target, event) {
                    return true;
                }
            }
            if !self.is_alive(target) {
                return false;
            }
        }
        let handler = self.events.get(target).and_then(|h| h.handler.clone());
        match handler {
            Some(handler) => handler(self, target, event),
            None => false,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::object::node::ObjectData;

    fn recorder(
        tree: &mut ObjectTree,
        id: ObjectId,
        tag: &'static str,
        log: &Rc<RefCell<Vec<&'static str>>>,
        consume: bool,
    ) {
        let log = log.clone();
        tree.set_event_filter_handler(id, move |_, _, _| {
            log.borrow_mut().push(tag);
            consume
        });
    }

    #[test]
    fn event_defaults() {
        let mut event = Event::custom("poke");
        assert!(event.is_accepted());
        assert_eq!(event.kind(), &EventKind::Custom("poke".into()));
        event.ignore();
        assert!(!event.is_accepted());
        event.accept();
        assert!(event.is_accepted());
    }

    #[test]
    fn handler_receives_event() {
        let mut tree = ObjectTree::new();
        let target = tree.create(ObjectData::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_c = log.clone();
        tree.set_event_handler(target, move |_, receiver, event| {
            log_c.borrow_mut().push((receiver, event.kind().clone()));
            true
        });
        assert!(tree.send_event(target, &mut Event::custom("poke")));
        assert_eq!(*log.borrow(), vec![(target, EventKind::Custom("poke".into()))]);
    }

    #[test]
    fn no_handler_means_unhandled() {
        let mut tree = ObjectTree::new();
        let target = tree.create(ObjectData::default());
        assert!(!tree.send_event(target, &mut Event::custom("poke")));
    }

    #[test]
    fn filter_consumes_before_handler() {
        let mut tree = ObjectTree::new();
        let target = tree.create(ObjectData::default());
        let filter = tree.create(ObjectData::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        recorder(&mut tree, filter, "filter", &log, true);
        let log_c = log.clone();
        tree.set_event_handler(target, move |_, _, _| {
            log_c.borrow_mut().push("handler");
            true
        });
        tree.install_event_filter(target, filter);
        assert!(tree.send_event(target, &mut Event::custom("poke")));
        assert_eq!(*log.borrow(), vec!["filter"]);
    }

    #[test]
    fn passing_filters_run_most_recent_first() {
        let mut tree = ObjectTree::new();
        let target = tree.create(ObjectData::default());
        let first = tree.create(ObjectData::default());
        let second = tree.create(ObjectData::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        recorder(&mut tree, first, "first", &log, false);
        recorder(&mut tree, second, "second", &log, false);
        let log_c = log.clone();
        tree.set_event_handler(target, move |_, _, _| {
            log_c.borrow_mut().push("handler");
            false
        });
        tree.install_event_filter(target, first);
        tree.install_event_filter(target, second);
        assert!(!tree.send_event(target, &mut Event::custom("poke")));
        assert_eq!(*log.borrow(), vec!["second", "first", "handler"]);
    }

    #[test]
    fn reinstall_moves_filter_to_front() {
        let mut tree = ObjectTree::new();
        let target = tree.create(ObjectData::default());
        let first = tree.create(ObjectData::default());
        let second = tree.create(ObjectData::default());
        tree.install_event_filter(target, first);
        tree.install_event_filter(target, second);
        tree.install_event_filter(target, first);
        assert_eq!(tree.event_filters(target), vec![first, second]);
    }

    #[test]
    fn removed_and_destroyed_filters_are_skipped() {
        let mut tree = ObjectTree::new();
        let target = tree.create(ObjectData::default());
        let removed = tree.create(ObjectData::default());
        let doomed = tree.create(ObjectData::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        recorder(&mut tree, removed, "removed", &log, true);
        recorder(&mut tree, doomed, "doomed", &log, true);
        tree.install_event_filter(target, removed);
        tree.install_event_filter(target, doomed);
        tree.remove_event_filter(target, removed);
        tree.destroy(doomed);
        assert!(tree.event_filters(target).is_empty());
        assert!(!tree.send_event(target, &mut Event::custom("poke")));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn filter_can_mark_event_ignored() {
        let mut tree = ObjectTree::new();
        let target = tree.create(ObjectData::default());
        let filter = tree.create(ObjectData::default());
        tree.set_event_filter_handler(filter, |_, _, event| {
            event.ignore();
            false
        });
        tree.install_event_filter(target, filter);
        let mut event = Event::custom("poke");
        tree.send_event(target, &mut event);
        assert!(!event.is_accepted());
    }

    #[test]
    fn send_to_destroyed_target_is_noop() {
        let mut tree = ObjectTree::new();
        let target = tree.create(ObjectData::default());
        tree.destroy(target);
        assert!(!tree.send_event(target, &mut Event::custom("poke")));
    }

    #[test]
    fn reparenting_notifies_both_owners() {
        let mut tree = ObjectTree::new();
        let old = tree.create(ObjectData::default());
        let new = tree.create(ObjectData::default());
        let child = tree.create_child(old, ObjectData::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        for owner in [old, new] {
            let log = log.clone();
            tree.set_event_handler(owner, move |_, receiver, event| {
                log.borrow_mut().push((receiver, event.kind().clone()));
                true
            });
        }
        tree.set_owner(child, Some(new));
        assert_eq!(
            *log.borrow(),
            vec![
                (old, EventKind::ChildRemoved(child)),
                (new, EventKind::ChildAdded(child)),
            ]
        );
    }
}
