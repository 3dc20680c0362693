//! A single state: an object node with an `active` flag and enter/exit hooks.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::object::{ObjectData, ObjectId, ObjectTree, Signal};
use crate::property::{Property, PropertyOptions};

/// Emitted on a state after it becomes active. Payload: the state id.
#[derive(Debug, Clone, Copy)]
pub struct Entered;

impl Signal for Entered {
    const NAME: &'static str = "entered";
    type Args = ObjectId;
}

/// Emitted on a state after it becomes inactive. Payload: the state id.
#[derive(Debug, Clone, Copy)]
pub struct Exited;

impl Signal for Exited {
    const NAME: &'static str = "exited";
    type Args = ObjectId;
}

type StateCallback = Rc<dyn Fn(&mut ObjectTree, ObjectId)>;

struct StateInner {
    id: ObjectId,
    active: Property<bool>,
    on_enter: RefCell<Vec<StateCallback>>,
    on_exit: RefCell<Vec<StateCallback>>,
}

/// Handle to a state. Clones refer to the same state.
///
/// The `active` flag is exposed as a read-only `active` property on the
/// state's node, so `activeChanged` and `propertyChanged` fire alongside
/// `entered` / `exited`.
#[derive(Clone)]
pub struct State {
    inner: Rc<StateInner>,
}

impl State {
    /// Create an inactive state node, optionally owned by `owner`.
    pub fn new(tree: &mut ObjectTree, owner: Option<ObjectId>, name: &str) -> Self {
        let data = ObjectData::new("State").with_name(name);
        let id = match owner {
            Some(owner) => tree.create_child(owner, data),
            None => tree.create(data),
        };
        let active = Property::new(tree, id, "active", PropertyOptions::new(false).readonly());
        Self {
            inner: Rc::new(StateInner {
                id,
                active,
                on_enter: RefCell::new(Vec::new()),
                on_exit: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// The read-only `active` property, for binding or observing.
    pub fn active_property(&self) -> &Property<bool> {
        &self.inner.active
    }

    /// Run `f` every time the state is entered, after earlier callbacks.
    pub fn on_enter(&self, f: impl Fn(&mut ObjectTree, ObjectId) + 'static) {
        self.inner.on_enter.borrow_mut().push(Rc::new(f));
    }

    /// Run `f` every time the state is exited, after earlier callbacks.
    pub fn on_exit(&self, f: impl Fn(&mut ObjectTree, ObjectId) + 'static) {
        self.inner.on_exit.borrow_mut().push(Rc::new(f));
    }

    /// Activate or deactivate the state.
    ///
    /// Flips the flag, runs the enter (or exit) callbacks in registration
    /// order, then emits `entered` (or `exited`). Returns `false` without
    /// doing anything if the state already has that flag or its node is
    /// destroyed.
    pub fn set_active(&self, tree: &mut ObjectTree, active: bool) -> bool {
        if !self.inner.active.inner.write(tree, active) {
            return false;
        }
        let callbacks = if active {
            self.inner.on_enter.borrow().clone()
        } else {
            self.inner.on_exit.borrow().clone()
        };
        for callback in callbacks {
            callback(tree, self.inner.id);
        }
        if active {
            tree.emit::<Entered>(self.inner.id, &self.inner.id);
        } else {
            tree.emit::<Exited>(self.inner.id, &self.inner.id);
        }
        true
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for State {}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .finish()
    }
}
