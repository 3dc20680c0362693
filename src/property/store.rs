//! Per-object property storage and name-based lookup.
//!
//! Typed [`Property`](super::Property) cells register themselves here under
//! their name; anything else written through [`ObjectTree::set_property`]
//! lands in a dynamic bag of boxed values.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::{Event, EventKind, ObjectId, ObjectTree};

use super::reactive::{PropertyError, PropertyInner};

/// Type-erased view of a typed property, for lookup by name.
pub(crate) trait ErasedProperty {
    fn value_any(&self) -> Box<dyn Any>;
    fn set_any(&self, tree: &mut ObjectTree, value: Box<dyn Any>) -> Result<bool, PropertyError>;
    fn release_binding(&self, tree: &mut ObjectTree) -> bool;
}

impl<T: Clone + PartialEq + 'static> ErasedProperty for PropertyInner<T> {
    fn value_any(&self) -> Box<dyn Any> {
        Box::new(self.get())
    }

    fn set_any(&self, tree: &mut ObjectTree, value: Box<dyn Any>) -> Result<bool, PropertyError> {
        match value.downcast::<T>() {
            Ok(value) => self.set(tree, *value),
            Err(_) => Err(PropertyError::TypeMismatch {
                name: self.name().to_owned(),
                expected: self.type_name(),
            }),
        }
    }

    fn release_binding(&self, tree: &mut ObjectTree) -> bool {
        self.clear_binding(tree)
    }
}

#[derive(Default)]
pub(crate) struct PropertyStore {
    typed: HashMap<String, Rc<dyn ErasedProperty>>,
    dynamic: HashMap<String, Box<dyn Any>>,
}

impl PropertyStore {
    /// Drop the active binding of every typed property in the store.
    ///
    /// Property-source bindings live on the source's signal list, so they
    /// have to be disconnected explicitly when the target's owner goes away.
    pub(crate) fn release_bindings(self, tree: &mut ObjectTree) -> usize {
        self.typed
            .into_values()
            .filter(|property| property.release_binding(tree))
            .count()
    }
}

impl ObjectTree {
    pub(crate) fn register_typed_property(
        &mut self,
        id: ObjectId,
        name: String,
        property: Rc<dyn ErasedProperty>,
    ) {
        if let Some(store) = self.properties.get_mut(id) {
            store.typed.insert(name, property);
        }
    }

    /// Read a property of `id` by name.
    ///
    /// A typed property with that name wins over the dynamic bag. Returns
    /// `None` when nothing is stored under `name` or the stored value is not
    /// a `T`.
    pub fn property<T: Clone + 'static>(&self, id: ObjectId, name: &str) -> Option<T> {
        let store = self.properties.get(id)?;
        if let Some(typed) = store.typed.get(name) {
            return typed.value_any().downcast::<T>().ok().map(|value| *value);
        }
        store.dynamic.get(name)?.downcast_ref::<T>().cloned()
    }

    /// Write a property of `id` by name.
    ///
    /// If a typed property with that name exists the write goes through it,
    /// with all of its transform, validation, read-only and notification
    /// rules. Otherwise the value is stored in the dynamic bag and `id`
    /// receives an [`EventKind::DynamicPropertyChange`] event.
    pub fn set_property<T: 'static>(
        &mut self,
        id: ObjectId,
        name: &str,
        value: T,
    ) -> Result<bool, PropertyError> {
        if !self.is_alive(id) {
            return Ok(false);
        }
        let typed = self
            .properties
            .get(id)
            .and_then(|store| store.typed.get(name).cloned());
        if let Some(typed) = typed {
            return typed.set_any(self, Box::new(value));
        }
        if let Some(store) = self.properties.get_mut(id) {
            store.dynamic.insert(name.to_owned(), Box::new(value));
        }
        self.send_event(
            id,
            &mut Event::new(EventKind::DynamicPropertyChange(name.to_owned())),
        );
        Ok(true)
    }

    /// Remove a dynamic property. Typed properties are unaffected.
    pub fn remove_dynamic_property(&mut self, id: ObjectId, name: &str) -> bool {
        let removed = self
            .properties
            .get_mut(id)
            .is_some_and(|store| store.dynamic.remove(name).is_some());
        if removed {
            self.send_event(
                id,
                &mut Event::new(EventKind::DynamicPropertyChange(name.to_owned())),
            );
        }
        removed
    }

    /// Names of the dynamic properties set on `id`, sorted.
    pub fn dynamic_property_names(&self, id: ObjectId) -> Vec<String> {
        let mut names: Vec<String> = self
            .properties
            .get(id)
            .map(|store| store.dynamic.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Whether a typed property named `name` is registered on `id`.
    pub fn has_typed_property(&self, id: ObjectId, name: &str) -> bool {
        self.properties
            .get(id)
            .is_some_and(|store| store.typed.contains_key(name))
    }
}
