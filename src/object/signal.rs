//! Signal/slot bus: typed signal channels, connections, synchronous emit.
//!
//! Every object owns a registry mapping signal names to ordered listener
//! lists. Listeners receive the [`ObjectTree`] by `&mut` plus the payload, so a
//! slot can connect, disconnect, emit or destroy while it runs.
//!
//! Signals are usually declared as marker types implementing [`Signal`], which
//! ties a name to its payload type at compile time:
//!
//! ```ignore
//! tree.connect::<Destroyed>(id, |tree, &who| println!("{who:?} is gone"));
//! ```
//!
//! Dynamically named channels (such as a property's `<name>Changed`) go through
//! [`ObjectTree::connect_named`] / [`ObjectTree::emit_named`] with an explicit
//! payload type.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::node::ObjectId;
use super::tree::ObjectTree;

// ---------------------------------------------------------------------------
// Signal trait and built-in signals
// ---------------------------------------------------------------------------

/// A named notification channel with a fixed payload type.
pub trait Signal: 'static {
    /// The channel name listeners are registered under.
    const NAME: &'static str;
    /// The payload delivered to listeners.
    type Args: 'static;
}

/// Emitted on an object when its destruction starts. Payload: the object id.
#[derive(Debug, Clone, Copy)]
pub struct Destroyed;

impl Signal for Destroyed {
    const NAME: &'static str = "destroyed";
    type Args = ObjectId;
}

/// Emitted when an object's name changes. Payload: the new name.
#[derive(Debug, Clone, Copy)]
pub struct ObjectNameChanged;

impl Signal for ObjectNameChanged {
    const NAME: &'static str = "objectNameChanged";
    type Args = Option<String>;
}

// ---------------------------------------------------------------------------
// Slots and listeners
// ---------------------------------------------------------------------------

/// Type-erased slot as stored in a registry.
pub(crate) type Slot = Rc<dyn Fn(&mut ObjectTree, &dyn Any)>;

/// Wrap a typed closure so it can sit in a registry next to other payloads.
///
/// A payload of the wrong type skips the listener.
fn typed_slot<A: 'static>(f: impl Fn(&mut ObjectTree, &A) + 'static) -> Slot {
    Rc::new(move |tree: &mut ObjectTree, args: &dyn Any| match args.downcast_ref::<A>() {
        Some(args) => f(tree, args),
        None => tracing::debug!(
            expected = type_name::<A>(),
            "listener skipped: payload type mismatch"
        ),
    })
}

/// A reusable listener with identity.
///
/// Clones share the same identity: connecting one listener twice registers it
/// twice, and [`ObjectTree::disconnect_listener`] removes the first
/// registration that is this listener.
pub struct Listener<A: 'static> {
    slot: Slot,
    _marker: PhantomData<fn(&A)>,
}

impl<A: 'static> Listener<A> {
    /// Create a listener from a closure.
    pub fn new(f: impl Fn(&mut ObjectTree, &A) + 'static) -> Self {
        Self {
            slot: typed_slot(f),
            _marker: PhantomData,
        }
    }
}

impl<A: 'static> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A: 'static> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("args", &type_name::<A>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Identifies one registration of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Handle returned by every `connect*` call.
///
/// Disconnecting is idempotent; a connection made on a destroyed object is
/// inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    object: ObjectId,
    signal: String,
    id: ConnectionId,
}

impl Connection {
    /// The object the listener is registered on.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// The signal name the listener is registered under.
    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// The registration id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remove this registration. Returns `false` if it was already gone.
    pub fn disconnect(&self, tree: &mut ObjectTree) -> bool {
        tree.disconnect(self)
    }

    /// Whether the registration is still present.
    pub fn is_connected(&self, tree: &ObjectTree) -> bool {
        tree.signals
            .get(self.object)
            .and_then(|r| r.slots.get(&self.signal))
            .is_some_and(|entries| entries.iter().any(|e| e.id == self.id))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct SlotEntry {
    id: ConnectionId,
    slot: Slot,
}

/// Per-object mapping from signal name to listeners in registration order.
#[derive(Default)]
pub(crate) struct SignalRegistry {
    slots: HashMap<String, Vec<SlotEntry>>,
}

impl SignalRegistry {
    fn snapshot(&self, signal: &str) -> Vec<Slot> {
        self.slots
            .get(signal)
            .map(|entries| entries.iter().map(|e| e.slot.clone()).collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// ObjectTree: connect / disconnect / emit
// ---------------------------------------------------------------------------

impl ObjectTree {
    fn register(&mut self, id: ObjectId, signal: &str, slot: Slot) -> Connection {
        self.next_connection += 1;
        let conn = Connection {
            object: id,
            signal: signal.to_owned(),
            id: ConnectionId(self.next_connection),
        };
        if self.is_alive(id) {
            if let Some(registry) = self.signals.get_mut(id) {
                registry
                    .slots
                    .entry(signal.to_owned())
                    .or_default()
                    .push(SlotEntry { id: conn.id, slot });
            }
        }
        conn
    }

    /// Connect a typed listener to signal `S` on `id`.
    pub fn connect<S: Signal>(
        &mut self,
        id: ObjectId,
        f: impl Fn(&mut ObjectTree, &S::Args) + 'static,
    ) -> Connection {
        self.connect_named::<S::Args>(id, S::NAME, f)
    }

    /// Connect a listener to a dynamically named signal with payload `A`.
    pub fn connect_named<A: 'static>(
        &mut self,
        id: ObjectId,
        signal: &str,
        f: impl Fn(&mut ObjectTree, &A) + 'static,
    ) -> Connection {
        self.register(id, signal, typed_slot(f))
    }

    /// Connect a listener that accepts any payload.
    pub fn connect_any(
        &mut self,
        id: ObjectId,
        signal: &str,
        f: impl Fn(&mut ObjectTree, &dyn Any) + 'static,
    ) -> Connection {
        self.register(id, signal, Rc::new(f))
    }

    /// Connect a shared [`Listener`].
    pub fn connect_listener<A: 'static>(
        &mut self,
        id: ObjectId,
        signal: &str,
        listener: &Listener<A>,
    ) -> Connection {
        self.register(id, signal, listener.slot.clone())
    }

    /// Remove one registration. Returns `false` if it was already gone.
    pub fn disconnect(&mut self, conn: &Connection) -> bool {
        let Some(entries) = self
            .signals
            .get_mut(conn.object)
            .and_then(|r| r.slots.get_mut(&conn.signal))
        else {
            return false;
        };
        match entries.iter().position(|e| e.id == conn.id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the first registration of `listener` on `signal`.
    pub fn disconnect_listener<A: 'static>(
        &mut self,
        id: ObjectId,
        signal: &str,
        listener: &Listener<A>,
    ) -> bool {
        let Some(entries) = self
            .signals
            .get_mut(id)
            .and_then(|r| r.slots.get_mut(signal))
        else {
            return false;
        };
        match entries.iter().position(|e| Rc::ptr_eq(&e.slot, &listener.slot)) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every listener of `signal` on `id`. Returns how many were removed.
    pub fn disconnect_all(&mut self, id: ObjectId, signal: &str) -> usize {
        self.signals
            .get_mut(id)
            .and_then(|r| r.slots.remove(signal))
            .map_or(0, |entries| entries.len())
    }

    /// Number of listeners currently registered for `signal` on `id`.
    pub fn receivers(&self, id: ObjectId, signal: &str) -> usize {
        self.signals
            .get(id)
            .and_then(|r| r.slots.get(signal))
            .map_or(0, Vec::len)
    }

    /// Block or unblock emission on `id`. Returns the previous state.
    pub fn block_signals(&mut self, id: ObjectId, block: bool) -> bool {
        match self.nodes.get_mut(id) {
            Some(data) => std::mem::replace(&mut data.signals_blocked, block),
            None => false,
        }
    }

    /// Whether emission on `id` is currently blocked.
    pub fn signals_blocked(&self, id: ObjectId) -> bool {
        self.nodes.get(id).is_some_and(|d| d.signals_blocked)
    }

    /// Emit signal `S` on `id`.
    pub fn emit<S: Signal>(&mut self, id: ObjectId, args: &S::Args) {
        self.emit_named::<S::Args>(id, S::NAME, args);
    }

    /// Emit a dynamically named signal on `id`.
    ///
    /// Every listener registered when the call starts runs, in registration
    /// order, before this returns. Listeners connected or disconnected while
    /// the emission is in progress do not change who is called by this emit.
    /// If the object is destroyed by a listener, the remaining listeners are
    /// skipped. Emitting on a destroyed or blocked object does nothing.
    pub fn emit_named<A: 'static>(&mut self, id: ObjectId, signal: &str, args: &A) {
        if !self.is_alive(id) || self.signals_blocked(id) {
            return;
        }
        let snapshot = self
            .signals
            .get(id)
            .map(|r| r.snapshot(signal))
            .unwrap_or_default();
        for slot in snapshot {
            if !self.is_alive(id) {
                break;
            }
            slot(self, args as &dyn Any);
        }
    }

    /// Emit regardless of the destruction and blocking flags.
    ///
    /// Used for `destroyed`, which fires after destruction has begun.
    pub(crate) fn emit_unchecked<A: 'static>(&mut self, id: ObjectId, signal: &str, args: &A) {
        let snapshot = self
            .signals
            .get(id)
            .map(|r| r.snapshot(signal))
            .unwrap_or_default();
        for slot in snapshot {
            slot(self, args as &dyn Any);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::object::node::ObjectData;

    fn setup() -> (ObjectTree, ObjectId) {
        let mut tree = ObjectTree::new();
        let id = tree.create(ObjectData::new("Object"));
        (tree, id)
    }

    #[test]
    fn emit_delivers_in_registration_order() {
        let (mut tree, id) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let log = log.clone();
            tree.connect_named::<i32>(id, "clicked", move |_, v| {
                log.borrow_mut().push(format!("{tag}:{v}"));
            });
        }
        tree.emit_named(id, "clicked", &7_i32);
        assert_eq!(*log.borrow(), vec!["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn same_listener_twice_fires_twice() {
        let (mut tree, id) = setup();
        let count = Rc::new(Cell::new(0));
        let count_c = count.clone();
        let listener = Listener::<()>::new(move |_, _| count_c.set(count_c.get() + 1));
        tree.connect_listener(id, "ping", &listener);
        tree.connect_listener(id, "ping", &listener);
        tree.emit_named(id, "ping", &());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn disconnect_listener_removes_first_match_only() {
        let (mut tree, id) = setup();
        let count = Rc::new(Cell::new(0));
        let count_c = count.clone();
        let listener = Listener::<()>::new(move |_, _| count_c.set(count_c.get() + 1));
        tree.connect_listener(id, "ping", &listener);
        tree.connect_listener(id, "ping", &listener);
        assert!(tree.disconnect_listener(id, "ping", &listener));
        assert_eq!(tree.receivers(id, "ping"), 1);
        tree.emit_named(id, "ping", &());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn disconnect_unregistered_listener_is_tolerated() {
        let (mut tree, id) = setup();
        let listener = Listener::<()>::new(|_, _| {});
        assert!(!tree.disconnect_listener(id, "ping", &listener));
        assert_eq!(tree.disconnect_all(id, "ping"), 0);
    }

    #[test]
    fn disconnect_all_clears_signal() {
        let (mut tree, id) = setup();
        tree.connect_named::<()>(id, "ping", |_, _| {});
        tree.connect_named::<()>(id, "ping", |_, _| {});
        tree.connect_named::<()>(id, "pong", |_, _| {});
        assert_eq!(tree.disconnect_all(id, "ping"), 2);
        assert_eq!(tree.receivers(id, "ping"), 0);
        assert_eq!(tree.receivers(id, "pong"), 1);
    }

    #[test]
    fn connection_disconnect_is_idempotent() {
        let (mut tree, id) = setup();
        let conn = tree.connect_named::<()>(id, "ping", |_, _| {});
        assert!(conn.is_connected(&tree));
        assert!(conn.disconnect(&mut tree));
        assert!(!conn.disconnect(&mut tree));
        assert!(!conn.is_connected(&tree));
    }

    #[test]
    fn connect_during_emit_does_not_join_current_emit() {
        let (mut tree, id) = setup();
        let late_calls = Rc::new(Cell::new(0));
        let late_c = late_calls.clone();
        tree.connect_named::<()>(id, "ping", move |tree, _| {
            let late = late_c.clone();
            tree.connect_named::<()>(id, "ping", move |_, _| late.set(late.get() + 1));
        });
        tree.emit_named(id, "ping", &());
        assert_eq!(late_calls.get(), 0);
        tree.emit_named(id, "ping", &());
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn disconnect_during_emit_does_not_skip_sibling() {
        let (mut tree, id) = setup();
        let second_calls = Rc::new(Cell::new(0));
        let second_c = second_calls.clone();
        let holder: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
        let holder_c = holder.clone();
        tree.connect_named::<()>(id, "ping", move |tree, _| {
            if let Some(conn) = holder_c.borrow().as_ref() {
                tree.disconnect(conn);
            }
        });
        let second = tree.connect_named::<()>(id, "ping", move |_, _| {
            second_c.set(second_c.get() + 1);
        });
        *holder.borrow_mut() = Some(second);
        tree.emit_named(id, "ping", &());
        assert_eq!(second_calls.get(), 1);
        tree.emit_named(id, "ping", &());
        assert_eq!(second_calls.get(), 1);
    }

    #[test]
    fn nested_emit_completes_before_next_listener() {
        let (mut tree, id) = setup();
        let other = tree.create(ObjectData::default());
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_a = log.clone();
        tree.connect_named::<()>(id, "outer", move |tree, _| {
            log_a.borrow_mut().push("outer-1");
            tree.emit_named(other, "inner", &());
        });
        let log_b = log.clone();
        tree.connect_named::<()>(id, "outer", move |_, _| log_b.borrow_mut().push("outer-2"));
        let log_c = log.clone();
        tree.connect_named::<()>(other, "inner", move |_, _| log_c.borrow_mut().push("inner"));

        tree.emit_named(id, "outer", &());
        assert_eq!(*log.borrow(), vec!["outer-1", "inner", "outer-2"]);
    }

    #[test]
    fn typed_signal_round_trip() {
        let (mut tree, id) = setup();
        let got = Rc::new(RefCell::new(None));
        let got_c = got.clone();
        tree.connect::<ObjectNameChanged>(id, move |_, name| {
            *got_c.borrow_mut() = name.clone();
        });
        tree.emit::<ObjectNameChanged>(id, &Some("x".to_string()));
        assert_eq!(got.borrow().as_deref(), Some("x"));
    }

    #[test]
    fn mismatched_payload_skips_listener() {
        let (mut tree, id) = setup();
        let called = Rc::new(Cell::new(false));
        let called_c = called.clone();
        tree.connect_named::<String>(id, "value", move |_, _| called_c.set(true));
        tree.emit_named(id, "value", &42_u8);
        assert!(!called.get());
    }

    #[test]
    fn connect_any_sees_every_payload() {
        let (mut tree, id) = setup();
        let count = Rc::new(Cell::new(0));
        let count_c = count.clone();
        tree.connect_any(id, "value", move |_, _| count_c.set(count_c.get() + 1));
        tree.emit_named(id, "value", &1_u8);
        tree.emit_named(id, "value", &"two");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn blocked_signals_do_not_fire() {
        let (mut tree, id) = setup();
        let count = Rc::new(Cell::new(0));
        let count_c = count.clone();
        tree.connect_named::<()>(id, "ping", move |_, _| count_c.set(count_c.get() + 1));
        assert!(!tree.block_signals(id, true));
        tree.emit_named(id, "ping", &());
        assert!(tree.block_signals(id, false));
        tree.emit_named(id, "ping", &());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn emit_on_destroyed_object_is_noop() {
        let (mut tree, id) = setup();
        tree.destroy(id);
        let conn = tree.connect_named::<()>(id, "ping", |_, _| panic!("must not run"));
        assert!(!conn.is_connected(&tree));
        tree.emit_named(id, "ping", &());
        assert_eq!(tree.receivers(id, "ping"), 0);
    }

    #[test]
    fn listener_destroying_sender_stops_remaining_listeners() {
        let (mut tree, id) = setup();
        let later = Rc::new(Cell::new(false));
        let later_c = later.clone();
        tree.connect_named::<()>(id, "ping", move |tree, _| tree.destroy(id));
        tree.connect_named::<()>(id, "ping", move |_, _| later_c.set(true));
        tree.emit_named(id, "ping", &());
        assert!(!later.get());
        assert!(!tree.contains(id));
    }

    #[test]
    fn no_signal_after_destroyed() {
        let (mut tree, id) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_a = log.clone();
        tree.connect::<Destroyed>(id, move |tree, &who| {
            log_a.borrow_mut().push("destroyed");
            tree.emit_named(who, "late", &());
        });
        let log_b = log.clone();
        tree.connect_named::<()>(id, "late", move |_, _| log_b.borrow_mut().push("late"));
        tree.destroy(id);
        assert_eq!(*log.borrow(), vec!["destroyed"]);
    }
}
