//! Transitions: signal-triggered edges between two states.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::object::{Connection, Destroyed, ObjectData, ObjectId, ObjectTree, Signal};

use super::node::State;

/// Payload of [`Triggered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionFired {
    pub source: ObjectId,
    pub target: ObjectId,
}

/// Emitted on a transition's node after it moved from source to target.
#[derive(Debug, Clone, Copy)]
pub struct Triggered;

impl Signal for Triggered {
    const NAME: &'static str = "triggered";
    type Args = TransitionFired;
}

/// Guard predicate: receives the tree and the triggering signal's payload.
pub type Guard = Rc<dyn Fn(&ObjectTree, &dyn Any) -> bool>;

/// An edge `source --signal[guard]--> target`.
///
/// Creating a transition subscribes to `signal` on the source state; there is
/// nothing to step afterwards. The transition's own node is a child of the
/// source state, so destroying the source removes it too.
pub struct Transition {
    id: ObjectId,
    source: State,
    target: State,
    signal: String,
    connection: Connection,
}

impl Transition {
    /// An unguarded transition.
    pub fn new(tree: &mut ObjectTree, source: &State, signal: &str, target: &State) -> Self {
        Self::wire(tree, source, signal, target, None)
    }

    /// A transition that only fires when `guard` returns `true`.
    pub fn guarded(
        tree: &mut ObjectTree,
        source: &State,
        signal: &str,
        target: &State,
        guard: impl Fn(&ObjectTree, &dyn Any) -> bool + 'static,
    ) -> Self {
        Self::wire(tree, source, signal, target, Some(Rc::new(guard)))
    }

    fn wire(
        tree: &mut ObjectTree,
        source: &State,
        signal: &str,
        target: &State,
        guard: Option<Guard>,
    ) -> Self {
        let id = tree.create_child(source.id(), ObjectData::new("Transition").with_name(signal));
        let (from, to) = (source.clone(), target.clone());
        let connection = tree.connect_any(source.id(), signal, move |tree, args| {
            if !tree.is_alive(id) {
                return;
            }
            if let Some(guard) = &guard {
                if !guard(tree, args) {
                    return;
                }
            }
            tracing::trace!(transition = ?id, source = ?from.id(), target = ?to.id(), "transition fired");
            from.set_active(tree, false);
            to.set_active(tree, true);
            tree.emit::<Triggered>(
                id,
                &TransitionFired {
                    source: from.id(),
                    target: to.id(),
                },
            );
        });
        let on_destroy = connection.clone();
        tree.connect::<Destroyed>(id, move |tree, _| {
            on_destroy.disconnect(tree);
        });
        Self {
            id,
            source: source.clone(),
            target: target.clone(),
            signal: signal.to_owned(),
            connection,
        }
    }

    /// The transition's own node (where `triggered` is emitted).
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn source(&self) -> &State {
        &self.source
    }

    pub fn target(&self) -> &State {
        &self.target
    }

    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// Whether the transition still listens on its source state.
    pub fn is_connected(&self, tree: &ObjectTree) -> bool {
        self.connection.is_connected(tree)
    }

    /// Unsubscribe and destroy the transition's node.
    pub fn remove(self, tree: &mut ObjectTree) {
        tree.destroy(self.id);
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("id", &self.id)
            .field("source", &self.source.id())
            .field("target", &self.target.id())
            .field("signal", &self.signal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::node::{Entered, Exited};

    fn pair(tree: &mut ObjectTree) -> (State, State) {
        let a = State::new(tree, None, "a");
        let b = State::new(tree, None, "b");
        a.set_active(tree, true);
        (a, b)
    }

    #[test]
    fn fires_on_source_signal() {
        let mut tree = ObjectTree::new();
        let (a, b) = pair(&mut tree);
        let _t = Transition::new(&mut tree, &a, "next", &b);
        tree.emit_named(a.id(), "next", &());
        assert!(!a.is_active());
        assert!(b.is_active());
    }

    #[test]
    fn exit_happens_before_enter() {
        let mut tree = ObjectTree::new();
        let (a, b) = pair(&mut tree);
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_a = log.clone();
        tree.connect::<Exited>(a.id(), move |_, _| log_a.borrow_mut().push("a exited"));
        let log_b = log.clone();
        tree.connect::<Entered>(b.id(), move |_, _| log_b.borrow_mut().push("b entered"));
        let t = Transition::new(&mut tree, &a, "next", &b);
        let log_t = log.clone();
        let fired_with = Rc::new(RefCell::new(None));
        let fired_c = fired_with.clone();
        tree.connect::<Triggered>(t.id(), move |_, fired| {
            log_t.borrow_mut().push("triggered");
            *fired_c.borrow_mut() = Some(*fired);
        });
        tree.emit_named(a.id(), "next", &());
        assert_eq!(*log.borrow(), vec!["a exited", "b entered", "triggered"]);
        assert_eq!(
            *fired_with.borrow(),
            Some(TransitionFired {
                source: a.id(),
                target: b.id()
            })
        );
    }

    #[test]
    fn false_guard_never_changes_states() {
        let mut tree = ObjectTree::new();
        let (a, b) = pair(&mut tree);
        let _t = Transition::guarded(&mut tree, &a, "next", &b, |_, _| false);
        for _ in 0..5 {
            tree.emit_named(a.id(), "next", &());
        }
        assert!(a.is_active());
        assert!(!b.is_active());
    }

    #[test]
    fn guard_sees_payload() {
        let mut tree = ObjectTree::new();
        let (a, b) = pair(&mut tree);
        let _t = Transition::guarded(&mut tree, &a, "key", &b, |_, args| {
            args.downcast_ref::<char>() == Some(&'q')
        });
        tree.emit_named(a.id(), "key", &'x');
        assert!(a.is_active());
        tree.emit_named(a.id(), "key", &'q');
        assert!(b.is_active());
    }

    #[test]
    fn other_signals_are_ignored() {
        let mut tree = ObjectTree::new();
        let (a, b) = pair(&mut tree);
        let _t = Transition::new(&mut tree, &a, "next", &b);
        tree.emit_named(a.id(), "other", &());
        tree.emit_named(b.id(), "next", &());
        assert!(a.is_active());
        assert!(!b.is_active());
    }

    #[test]
    fn transition_node_is_child_of_source() {
        let mut tree = ObjectTree::new();
        let (a, b) = pair(&mut tree);
        let t = Transition::new(&mut tree, &a, "next", &b);
        assert_eq!(tree.owner(t.id()), Some(a.id()));
        assert_eq!(t.signal(), "next");
    }

    #[test]
    fn removed_transition_stops_firing() {
        let mut tree = ObjectTree::new();
        let (a, b) = pair(&mut tree);
        let t = Transition::new(&mut tree, &a, "next", &b);
        let id = t.id();
        t.remove(&mut tree);
        assert!(!tree.contains(id));
        assert_eq!(tree.receivers(a.id(), "next"), 0);
        tree.emit_named(a.id(), "next", &());
        assert!(a.is_active());
    }

    #[test]
    fn self_loop_exits_and_reenters() {
        let mut tree = ObjectTree::new();
        let (a, _b) = pair(&mut tree);
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_x = log.clone();
        a.on_exit(move |_, _| log_x.borrow_mut().push("exit"));
        let log_e = log.clone();
        a.on_enter(move |_, _| log_e.borrow_mut().push("enter"));
        let _t = Transition::new(&mut tree, &a, "again", &a);
        tree.emit_named(a.id(), "again", &());
        assert_eq!(*log.borrow(), vec!["exit", "enter"]);
        assert!(a.is_active());
    }
}
