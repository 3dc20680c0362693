//! `StateMachine`: a root node that owns a set of states and transitions.

use std::any::Any;

use crate::object::{ObjectData, ObjectId, ObjectTree, Signal};

use super::node::State;
use super::transition::Transition;

/// Emitted on the machine after `start` entered the initial state.
#[derive(Debug, Clone, Copy)]
pub struct Started;

impl Signal for Started {
    const NAME: &'static str = "started";
    type Args = ();
}

/// Emitted on the machine after `stop` exited every active state.
#[derive(Debug, Clone, Copy)]
pub struct Stopped;

impl Signal for Stopped {
    const NAME: &'static str = "stopped";
    type Args = ();
}

/// A flat collection of states with an initial state.
///
/// The machine does not enforce that only one state is active; transitions
/// move activity from source to target and whoever wires them decides the
/// shape of the graph.
#[derive(Debug)]
pub struct StateMachine {
    id: ObjectId,
    states: Vec<State>,
    initial: Option<State>,
    running: bool,
}

impl StateMachine {
    /// Create a machine node, optionally owned by `owner`.
    pub fn new(tree: &mut ObjectTree, owner: Option<ObjectId>) -> Self {
        let data = ObjectData::new("StateMachine");
        let id = match owner {
            Some(owner) => tree.create_child(owner, data),
            None => tree.create(data),
        };
        Self {
            id,
            states: Vec::new(),
            initial: None,
            running: false,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Create a state owned by the machine.
    pub fn add_state(&mut self, tree: &mut ObjectTree, name: &str) -> State {
        let state = State::new(tree, Some(self.id), name);
        self.states.push(state.clone());
        state
    }

    /// Wire `source --signal--> target`.
    pub fn add_transition(
        &self,
        tree: &mut ObjectTree,
        source: &State,
        signal: &str,
        target: &State,
    ) -> Transition {
        Transition::new(tree, source, signal, target)
    }

    /// Wire `source --signal[guard]--> target`.
    pub fn add_guarded_transition(
        &self,
        tree: &mut ObjectTree,
        source: &State,
        signal: &str,
        target: &State,
        guard: impl Fn(&ObjectTree, &dyn Any) -> bool + 'static,
    ) -> Transition {
        Transition::guarded(tree, source, signal, target, guard)
    }

    pub fn set_initial_state(&mut self, state: &State) {
        self.initial = Some(state.clone());
    }

    pub fn initial_state(&self) -> Option<&State> {
        self.initial.as_ref()
    }

    /// States added through [`add_state`](Self::add_state), in order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Enter the initial state and emit `started`.
    ///
    /// Returns `false` if the machine is already running, has no initial
    /// state, or its node is destroyed.
    pub fn start(&mut self, tree: &mut ObjectTree) -> bool {
        if self.running || !tree.is_alive(self.id) {
            return false;
        }
        let Some(initial) = self.initial.clone() else {
            tracing::debug!(machine = ?self.id, "start ignored: no initial state");
            return false;
        };
        self.running = true;
        initial.set_active(tree, true);
        tree.emit::<Started>(self.id, &());
        true
    }

    /// Exit every active state and emit `stopped`.
    pub fn stop(&mut self, tree: &mut ObjectTree) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        for state in self.states.clone() {
            state.set_active(tree, false);
        }
        tree.emit::<Stopped>(self.id, &());
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Currently active states that are still alive, in insertion order.
    pub fn active_states(&self, tree: &ObjectTree) -> Vec<State> {
        self.states
            .iter()
            .filter(|s| s.is_active() && tree.is_alive(s.id()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;

    /// `idle --go--> running --halt--> idle`, with `running --done[flag]--> finished`.
    fn traffic(tree: &mut ObjectTree) -> (StateMachine, State, State, State, Rc<RefCell<bool>>) {
        let mut machine = StateMachine::new(tree, None);
        let idle = machine.add_state(tree, "idle");
        let running = machine.add_state(tree, "running");
        let finished = machine.add_state(tree, "finished");
        machine.add_transition(tree, &idle, "go", &running);
        machine.add_transition(tree, &running, "halt", &idle);
        let flag = Rc::new(RefCell::new(false));
        let flag_c = flag.clone();
        machine.add_guarded_transition(tree, &running, "done", &finished, move |_, _| {
            *flag_c.borrow()
        });
        machine.set_initial_state(&idle);
        (machine, idle, running, finished, flag)
    }

    #[test]
    fn start_enters_initial_state() {
        let mut tree = ObjectTree::new();
        let (mut machine, idle, ..) = traffic(&mut tree);
        let started = Rc::new(RefCell::new(false));
        let started_c = started.clone();
        tree.connect::<Started>(machine.id(), move |_, _| *started_c.borrow_mut() = true);
        assert!(machine.start(&mut tree));
        assert!(machine.is_running());
        assert!(*started.borrow());
        assert_eq!(machine.active_states(&tree), vec![idle]);
        assert!(!machine.start(&mut tree));
    }

    #[test]
    fn start_without_initial_state_fails() {
        let mut tree = ObjectTree::new();
        let mut machine = StateMachine::new(&mut tree, None);
        machine.add_state(&mut tree, "lonely");
        assert!(!machine.start(&mut tree));
        assert!(!machine.is_running());
    }

    #[test]
    fn transitions_move_activity() {
        let mut tree = ObjectTree::new();
        let (mut machine, idle, running, finished, flag) = traffic(&mut tree);
        machine.start(&mut tree);
        tree.emit_named(idle.id(), "go", &());
        assert_eq!(machine.active_states(&tree), vec![running.clone()]);
        tree.emit_named(running.id(), "done", &());
        assert_eq!(machine.active_states(&tree), vec![running.clone()]);
        *flag.borrow_mut() = true;
        tree.emit_named(running.id(), "done", &());
        assert_eq!(machine.active_states(&tree), vec![finished]);
    }

    #[test]
    fn stop_exits_active_states() {
        let mut tree = ObjectTree::new();
        let (mut machine, idle, ..) = traffic(&mut tree);
        machine.start(&mut tree);
        let stopped = Rc::new(RefCell::new(0));
        let stopped_c = stopped.clone();
        tree.connect::<Stopped>(machine.id(), move |_, _| *stopped_c.borrow_mut() += 1);
        assert!(machine.stop(&mut tree));
        assert!(!idle.is_active());
        assert!(machine.active_states(&tree).is_empty());
        assert!(!machine.stop(&mut tree));
        assert_eq!(*stopped.borrow(), 1);
    }

    #[test]
    fn states_are_owned_by_machine() {
        let mut tree = ObjectTree::new();
        let (machine, idle, running, finished, _) = traffic(&mut tree);
        assert_eq!(
            tree.children(machine.id()),
            &[idle.id(), running.id(), finished.id()]
        );
        tree.destroy(machine.id());
        assert!(!tree.contains(idle.id()));
        assert!(tree.is_empty());
    }

    #[test]
    fn dump_shows_states_and_transitions() {
        let mut tree = ObjectTree::new();
        let (machine, ..) = traffic(&mut tree);
        insta::assert_snapshot!(tree.dump(machine.id()), @r"
        StateMachine::
          State::idle
            Transition::go
          State::running
            Transition::halt
            Transition::done
          State::finished
        ");
    }
}
