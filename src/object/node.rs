//! Node types: ObjectId, ObjectData.

use slotmap::new_key_type;

new_key_type! {
    /// Identity of an object in an [`ObjectTree`](super::ObjectTree).
    ///
    /// Copy and lightweight. Keys carry a generation, so an id kept after its
    /// object was destroyed never aliases a newer object.
    pub struct ObjectId;
}

/// Data associated with a single object node.
#[derive(Debug, Clone)]
pub struct ObjectData {
    /// Meta type name (e.g. "Object", "State", "Button").
    pub class_name: String,
    /// Optional human-readable name. Not unique.
    pub name: Option<String>,
    /// Set once destruction has started; the node no longer emits.
    pub(crate) destroying: bool,
    /// Set by `delete_later` so repeated calls collapse into one deletion.
    pub(crate) delete_scheduled: bool,
    pub(crate) signals_blocked: bool,
}

impl ObjectData {
    /// Create a new `ObjectData` with the given class name and no object name.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            name: None,
            destroying: false,
            delete_scheduled: false,
            signals_blocked: false,
        }
    }

    /// Set the object name (builder).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the object name equals `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    /// Whether destruction of this node has begun.
    pub fn is_destroying(&self) -> bool {
        self.destroying
    }
}

impl Default for ObjectData {
    fn default() -> Self {
        Self::new("Object")
    }
}
