//! `Property<T>`: a change-tracked value cell owned by one object.
//!
//! Every accepted write that changes the value emits two signals on the owner:
//! the property's notify signal (`<name>Changed` unless overridden) carrying a
//! [`ValueChanged<T>`], then the generic [`PropertyChanged`] carrying a
//! type-erased [`PropertyChange`]. Writes pass through an optional transform
//! and then an optional validator; a rejected value is logged and dropped.

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::object::{ObjectId, ObjectTree, Signal};

use super::binding::ActiveBinding;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Programming mistakes when writing or binding properties.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("property `{name}` is read-only")]
    ReadOnly { name: String },
    #[error("property `{name}` cannot be bound to itself")]
    SelfBinding { name: String },
    #[error("binding source `{name}` belongs to a destroyed object")]
    SourceDestroyed { name: String },
    #[error("property `{name}` holds `{expected}`, which does not match the written value")]
    TypeMismatch { name: String, expected: &'static str },
}

// ---------------------------------------------------------------------------
// Change payloads
// ---------------------------------------------------------------------------

/// Payload of a property's own notify signal.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChanged<T> {
    pub value: T,
    pub old_value: T,
}

/// Payload of the generic [`PropertyChanged`] signal.
#[derive(Clone)]
pub struct PropertyChange {
    pub name: String,
    value: Rc<dyn Any>,
    old_value: Rc<dyn Any>,
}

impl PropertyChange {
    /// The new value, if it is a `T`.
    pub fn value<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// The previous value, if it is a `T`.
    pub fn old_value<T: 'static>(&self) -> Option<&T> {
        self.old_value.downcast_ref()
    }
}

impl fmt::Debug for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChange")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Emitted on the owner after any typed property of it changes.
#[derive(Debug, Clone, Copy)]
pub struct PropertyChanged;

impl Signal for PropertyChanged {
    const NAME: &'static str = "propertyChanged";
    type Args = PropertyChange;
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

type Validator<T> = Rc<dyn Fn(&T) -> bool>;
type Transform<T> = Rc<dyn Fn(T) -> T>;

/// Construction options for a [`Property`].
pub struct PropertyOptions<T: 'static> {
    default_value: T,
    validator: Option<Validator<T>>,
    transform: Option<Transform<T>>,
    notify: Option<String>,
    silent: bool,
    readonly: bool,
}

impl<T: 'static> PropertyOptions<T> {
    /// Options with the given default (and initial) value.
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            validator: None,
            transform: None,
            notify: None,
            silent: false,
            readonly: false,
        }
    }

    /// Reject writes for which `validator` returns `false`.
    pub fn with_validator(mut self, validator: impl Fn(&T) -> bool + 'static) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    /// Rewrite every incoming value before validation.
    pub fn with_transform(mut self, transform: impl Fn(T) -> T + 'static) -> Self {
        self.transform = Some(Rc::new(transform));
        self
    }

    /// Override the notify signal name (default `<name>Changed`).
    pub fn with_notify(mut self, signal: impl Into<String>) -> Self {
        self.notify = Some(signal.into());
        self
    }

    /// Never emit change signals.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Refuse writes through [`Property::set`] and [`Property::bind`].
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

impl<T: Default + 'static> Default for PropertyOptions<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ---------------------------------------------------------------------------
// Property
// ---------------------------------------------------------------------------

pub(crate) struct PropertyInner<T: 'static> {
    owner: ObjectId,
    name: String,
    notify: String,
    value: RefCell<T>,
    default_value: T,
    validator: Option<Validator<T>>,
    transform: Option<Transform<T>>,
    silent: bool,
    readonly: bool,
    pub(crate) binding: RefCell<Option<ActiveBinding>>,
    pub(crate) binding_generation: Cell<u64>,
}

impl<T: 'static> PropertyInner<T> {
    pub(crate) fn owner(&self) -> ObjectId {
        self.owner
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Clone + PartialEq + 'static> PropertyInner<T> {
    /// Transform, validate, compare, store, notify. Skips the read-only check.
    pub(crate) fn write(&self, tree: &mut ObjectTree, value: T) -> bool {
        if !tree.is_alive(self.owner) {
            return false;
        }
        let value = match &self.transform {
            Some(transform) => transform(value),
            None => value,
        };
        if let Some(validator) = &self.validator {
            if !validator(&value) {
                tracing::warn!(property = %self.name, "value rejected by validator");
                return false;
            }
        }
        if *self.value.borrow() == value {
            return false;
        }
        let old_value = self.value.replace(value.clone());
        if !self.silent {
            tree.emit_named(
                self.owner,
                &self.notify,
                &ValueChanged {
                    value: value.clone(),
                    old_value: old_value.clone(),
                },
            );
            tree.emit::<PropertyChanged>(
                self.owner,
                &PropertyChange {
                    name: self.name.clone(),
                    value: Rc::new(value),
                    old_value: Rc::new(old_value),
                },
            );
        }
        true
    }

    pub(crate) fn set(&self, tree: &mut ObjectTree, value: T) -> Result<bool, PropertyError> {
        if self.readonly {
            return Err(PropertyError::ReadOnly {
                name: self.name.clone(),
            });
        }
        Ok(self.write(tree, value))
    }

    pub(crate) fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Drop whatever binding is active. Returns `true` if there was one.
    pub(crate) fn clear_binding(&self, tree: &mut ObjectTree) -> bool {
        let Some(active) = self.binding.borrow_mut().take() else {
            return false;
        };
        active.release(tree);
        true
    }

    pub(crate) fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// A typed, change-tracked value owned by exactly one object.
///
/// Cloning a `Property` clones the handle; all clones share one value.
pub struct Property<T: 'static> {
    pub(crate) inner: Rc<PropertyInner<T>>,
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// Create a property named `name` on `owner`.
    ///
    /// The property is registered on the owner so that
    /// [`ObjectTree::property`] finds it before the dynamic property bag. A
    /// second property with the same name on the same owner replaces the
    /// first in that lookup.
    pub fn new(
        tree: &mut ObjectTree,
        owner: ObjectId,
        name: impl Into<String>,
        options: PropertyOptions<T>,
    ) -> Self {
        let name = name.into();
        let notify = options
            .notify
            .unwrap_or_else(|| format!("{name}Changed"));
        let inner = Rc::new(PropertyInner {
            owner,
            name,
            notify,
            value: RefCell::new(options.default_value.clone()),
            default_value: options.default_value,
            validator: options.validator,
            transform: options.transform,
            silent: options.silent,
            readonly: options.readonly,
            binding: RefCell::new(None),
            binding_generation: Cell::new(0),
        });
        tree.register_typed_property(owner, inner.name.clone(), inner.clone());
        Self { inner }
    }

    /// The current value.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Write a new value.
    ///
    /// Returns `Ok(true)` if the stored value changed and notifications were
    /// sent, `Ok(false)` if the write was equal to the current value, rejected
    /// by the validator, or the owner is destroyed. Read-only properties
    /// return [`PropertyError::ReadOnly`].
    pub fn set(&self, tree: &mut ObjectTree, value: T) -> Result<bool, PropertyError> {
        self.inner.set(tree, value)
    }

    /// Restore the default value under the same change rules as [`set`](Self::set).
    ///
    /// Allowed on read-only properties.
    pub fn reset(&self, tree: &mut ObjectTree) -> bool {
        self.inner.write(tree, self.inner.default_value.clone())
    }
}

impl<T: 'static> Property<T> {
    pub fn default_value(&self) -> &T {
        &self.inner.default_value
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn owner(&self) -> ObjectId {
        self.inner.owner()
    }

    /// Name of the signal emitted on the owner when the value changes.
    pub fn notify_signal(&self) -> &str {
        &self.inner.notify
    }

    pub fn is_readonly(&self) -> bool {
        self.inner.readonly
    }

    pub fn is_silent(&self) -> bool {
        self.inner.silent
    }
}

impl<T: 'static> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.inner.name)
            .field("owner", &self.inner.owner)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
