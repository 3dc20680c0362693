//! Property bindings.
//!
//! A property can follow another property (pushed through the source's notify
//! signal) or a zero-argument function (pulled whenever the tree polls its
//! function bindings, normally from the event loop's interval). A property
//! has at most one active binding; binding again replaces it.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::object::{Connection, ObjectId, ObjectTree};

use super::reactive::{Property, PropertyError, PropertyInner, ValueChanged};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where a bound property takes its value from.
pub enum BindingSource<T: 'static> {
    /// Follow another property's change notifications.
    Property(Property<T>),
    /// Re-evaluate a function on every poll.
    Function(Rc<dyn Fn() -> T>),
}

impl<T: 'static> BindingSource<T> {
    pub fn function(f: impl Fn() -> T + 'static) -> Self {
        Self::Function(Rc::new(f))
    }
}

impl<T: 'static> From<Property<T>> for BindingSource<T> {
    fn from(property: Property<T>) -> Self {
        Self::Property(property)
    }
}

impl<T: 'static> From<&Property<T>> for BindingSource<T> {
    fn from(property: &Property<T>) -> Self {
        Self::Property(property.clone())
    }
}

impl<T: 'static> fmt::Debug for BindingSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(p) => f.debug_tuple("Property").field(&p.name()).finish(),
            Self::Function(_) => f.write_str("Function"),
        }
    }
}

// ---------------------------------------------------------------------------
// Poll registry
// ---------------------------------------------------------------------------

/// Identifies one registered function binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollId(u64);

type PollFn = Rc<dyn Fn(&mut ObjectTree)>;

struct PollEntry {
    id: PollId,
    owner: ObjectId,
    run: PollFn,
}

/// Function bindings waiting to be re-evaluated.
#[derive(Default)]
pub(crate) struct PollRegistry {
    next_id: u64,
    entries: Vec<PollEntry>,
}

impl PollRegistry {
    fn insert(&mut self, owner: ObjectId, run: PollFn) -> PollId {
        self.next_id += 1;
        let id = PollId(self.next_id);
        self.entries.push(PollEntry { id, owner, run });
        id
    }

    fn remove(&mut self, id: PollId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    fn contains(&self, id: PollId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Drop every function binding whose target belongs to `owner`.
    pub(crate) fn remove_owner(&mut self, owner: ObjectId) {
        self.entries.retain(|e| e.owner != owner);
    }

    fn snapshot(&self) -> Vec<(PollId, PollFn)> {
        self.entries.iter().map(|e| (e.id, e.run.clone())).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl ObjectTree {
    /// Re-evaluate every function binding once.
    ///
    /// A binding removed by an earlier binding's notifications during the same
    /// pass is skipped. Returns how many bindings ran.
    pub fn poll_bindings(&mut self) -> usize {
        let mut ran = 0;
        for (id, run) in self.polls.snapshot() {
            if !self.polls.contains(id) {
                continue;
            }
            run(self);
            ran += 1;
        }
        ran
    }

    /// Number of active function bindings.
    pub fn function_binding_count(&self) -> usize {
        self.polls.len()
    }
}

// ---------------------------------------------------------------------------
// Active binding bookkeeping
// ---------------------------------------------------------------------------

pub(crate) enum ActiveBinding {
    Signal(Connection),
    Poll(PollId),
}

impl ActiveBinding {
    pub(crate) fn release(self, tree: &mut ObjectTree) {
        match self {
            Self::Signal(conn) => {
                tree.disconnect(&conn);
            }
            Self::Poll(id) => {
                tree.polls.remove(id);
            }
        }
    }
}

/// Handle that removes one specific binding.
///
/// If the property has been re-bound since, the handle no longer refers to
/// the active binding and [`unbind`](Self::unbind) does nothing.
pub struct Unbind<T: 'static> {
    target: Weak<PropertyInner<T>>,
    generation: u64,
}

impl<T: Clone + PartialEq + 'static> Unbind<T> {
    /// Remove the binding this handle was returned for. Returns `false` if it
    /// is no longer active.
    pub fn unbind(&self, tree: &mut ObjectTree) -> bool {
        let Some(target) = self.target.upgrade() else {
            return false;
        };
        if target.binding_generation.get() != self.generation {
            return false;
        }
        target.clear_binding(tree)
    }
}

impl<T: 'static> fmt::Debug for Unbind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unbind")
            .field("generation", &self.generation)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Property: bind / unbind
// ---------------------------------------------------------------------------

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// Make this property follow `source`.
    ///
    /// Any existing binding is removed first, so re-binding to the same
    /// source never stacks subscriptions. The current source value is applied
    /// immediately. A direct [`set`](Property::set) later does not remove the
    /// binding; the next source update overwrites it.
    ///
    /// Read-only properties, binding a property to itself and binding to a
    /// property of a destroyed object are errors.
    pub fn bind(
        &self,
        tree: &mut ObjectTree,
        source: impl Into<BindingSource<T>>,
    ) -> Result<Unbind<T>, PropertyError> {
        let source = source.into();
        if self.is_readonly() {
            return Err(PropertyError::ReadOnly {
                name: self.name().to_owned(),
            });
        }
        if let BindingSource::Property(src) = &source {
            if Rc::ptr_eq(&src.inner, &self.inner) {
                return Err(PropertyError::SelfBinding {
                    name: self.name().to_owned(),
                });
            }
            if !tree.is_alive(src.owner()) {
                return Err(PropertyError::SourceDestroyed {
                    name: src.name().to_owned(),
                });
            }
        }

        self.inner.clear_binding(tree);
        let generation = self.inner.binding_generation.get() + 1;
        self.inner.binding_generation.set(generation);

        let target = self.inner.clone();
        let initial = match source {
            BindingSource::Property(src) => {
                let conn = tree.connect_named::<ValueChanged<T>>(
                    src.owner(),
                    src.notify_signal(),
                    move |tree, change| {
                        target.write(tree, change.value.clone());
                    },
                );
                *self.inner.binding.borrow_mut() = Some(ActiveBinding::Signal(conn));
                tracing::trace!(property = %self.name(), source = %src.name(), "bound to property");
                src.get()
            }
            BindingSource::Function(f) => {
                let eval = f.clone();
                let id = tree.polls.insert(
                    self.owner(),
                    Rc::new(move |tree: &mut ObjectTree| {
                        target.write(tree, eval());
                    }),
                );
                *self.inner.binding.borrow_mut() = Some(ActiveBinding::Poll(id));
                tracing::trace!(property = %self.name(), "bound to function");
                f()
            }
        };
        self.inner.write(tree, initial);
        Ok(Unbind {
            target: Rc::downgrade(&self.inner),
            generation,
        })
    }

    /// Shorthand for binding to a function source.
    pub fn bind_fn(
        &self,
        tree: &mut ObjectTree,
        f: impl Fn() -> T + 'static,
    ) -> Result<Unbind<T>, PropertyError> {
        self.bind(tree, BindingSource::function(f))
    }

    /// Remove the active binding, if any. Safe to call repeatedly.
    pub fn unbind(&self, tree: &mut ObjectTree) -> bool {
        self.inner.clear_binding(tree)
    }

    pub fn is_bound(&self) -> bool {
        self.inner.binding.borrow().is_some()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
