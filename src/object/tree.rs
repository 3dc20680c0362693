//! Ownership tree: create, reparent, destroy, deferred deletion.

use slotmap::{SecondaryMap, SlotMap};

use super::event::{Event, EventHooks, EventKind};
use super::node::{ObjectData, ObjectId};
use super::signal::{Destroyed, ObjectNameChanged, Signal, SignalRegistry};
use crate::property::binding::PollRegistry;
use crate::property::store::PropertyStore;

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[ObjectId] = &[];

/// The object arena: every node, its ownership links, signals and properties.
///
/// All nodes live in a single `SlotMap`. Ownership is stored in secondary maps
/// so that lookups are O(1) and destruction is O(subtree size). The tree is the
/// context every operation runs against; listeners and handlers receive it by
/// `&mut` so they can mutate the graph while a signal is being delivered.
///
/// Operations on destroyed (or never-existing) ids are no-ops.
pub struct ObjectTree {
    pub(crate) nodes: SlotMap<ObjectId, ObjectData>,
    children: SecondaryMap<ObjectId, Vec<ObjectId>>,
    owner: SecondaryMap<ObjectId, ObjectId>,
    pub(crate) signals: SecondaryMap<ObjectId, SignalRegistry>,
    pub(crate) events: SecondaryMap<ObjectId, EventHooks>,
    pub(crate) properties: SecondaryMap<ObjectId, PropertyStore>,
    pub(crate) polls: PollRegistry,
    deferred: Vec<ObjectId>,
    pub(crate) next_connection: u64,
}

impl ObjectTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            owner: SecondaryMap::new(),
            signals: SecondaryMap::new(),
            events: SecondaryMap::new(),
            properties: SecondaryMap::new(),
            polls: PollRegistry::default(),
            deferred: Vec::new(),
            next_connection: 0,
        }
    }

    /// Create a detached node (no owner).
    pub fn create(&mut self, data: ObjectData) -> ObjectId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.signals.insert(id, SignalRegistry::default());
        self.events.insert(id, EventHooks::default());
        self.properties.insert(id, PropertyStore::default());
        id
    }

    /// Create a node owned by `owner`.
    ///
    /// If `owner` is destroyed the node is created detached.
    pub fn create_child(&mut self, owner: ObjectId, data: ObjectData) -> ObjectId {
        let id = self.create(data);
        self.set_owner(id, Some(owner));
        id
    }

    /// Move `id` under `new_owner`, or detach it with `None`.
    ///
    /// The node is removed from the old owner's children and inserted into the
    /// new owner's children before any listener or handler runs; observers
    /// only ever see it with exactly one owner (or none). Afterwards the old
    /// owner receives [`EventKind::ChildRemoved`] and the new owner
    /// [`EventKind::ChildAdded`].
    ///
    /// Returns `true` if the owner changed. Setting the current owner again,
    /// operating on destroyed nodes, and moving a node under its own
    /// descendant are rejected and return `false`.
    pub fn set_owner(&mut self, id: ObjectId, new_owner: Option<ObjectId>) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let old_owner = self.owner.get(id).copied();
        if old_owner == new_owner {
            return false;
        }
        if let Some(target) = new_owner {
            if !self.is_alive(target) {
                tracing::debug!(object = ?id, owner = ?target, "set_owner ignored: owner is destroyed");
                return false;
            }
            if target == id || self.ancestors(target).contains(&id) {
                tracing::warn!(object = ?id, owner = ?target, "set_owner rejected: ownership cycle");
                return false;
            }
        }

        if let Some(old) = old_owner {
            if let Some(siblings) = self.children.get_mut(old) {
                siblings.retain(|&child| child != id);
            }
            self.owner.remove(id);
        }
        if let Some(target) = new_owner {
            self.owner.insert(id, target);
            if let Some(siblings) = self.children.get_mut(target) {
                siblings.push(id);
            }
        }

        if let Some(old) = old_owner {
            self.send_event(old, &mut Event::new(EventKind::ChildRemoved(id)));
        }
        if let Some(target) = new_owner {
            self.send_event(target, &mut Event::new(EventKind::ChildAdded(id)));
        }
        true
    }

    /// Destroy `id` and its whole subtree.
    ///
    /// Emits `destroyed` on the node, destroys every child (each child is fully
    /// finalized before this node is), detaches from the owner, then drops the
    /// node's signals, event hooks and properties. Calling it again, or on a
    /// stale id, is a no-op.
    pub fn destroy(&mut self, id: ObjectId) {
        match self.nodes.get_mut(id) {
            Some(data) if !data.destroying => data.destroying = true,
            _ => return,
        }
        tracing::debug!(object = ?id, descendants = self.descendant_count(id), "destroying object");

        self.emit_unchecked(id, Destroyed::NAME, &id);

        let kids = self.children(id).to_vec();
        for child in kids {
            self.destroy(child);
        }

        if let Some(old) = self.owner.remove(id) {
            if let Some(siblings) = self.children.get_mut(old) {
                siblings.retain(|&child| child != id);
            }
        }
        self.children.remove(id);
        self.signals.remove(id);
        self.events.remove(id);
        if let Some(store) = self.properties.remove(id) {
            store.release_bindings(self);
        }
        self.polls.remove_owner(id);
        self.nodes.remove(id);
    }

    /// Schedule `id` for destruction on the next event-loop turn.
    ///
    /// Repeated calls before the deletion runs collapse into one.
    pub fn delete_later(&mut self, id: ObjectId) {
        let Some(data) = self.nodes.get_mut(id) else {
            return;
        };
        if data.destroying || data.delete_scheduled {
            return;
        }
        data.delete_scheduled = true;
        self.deferred.push(id);
    }

    /// Whether any deferred deletions are waiting for the next turn.
    pub fn has_pending_deletes(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Run every deletion scheduled before this call.
    ///
    /// Deletions scheduled while these run wait for the following turn.
    /// Returns how many nodes were destroyed directly (not counting
    /// descendants).
    pub fn process_deferred_deletes(&mut self) -> usize {
        let queue = std::mem::take(&mut self.deferred);
        let mut destroyed = 0;
        for id in queue {
            if self.nodes.contains_key(id) {
                self.destroy(id);
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Rename a node, emitting `objectNameChanged` if the name differs.
    pub fn set_object_name(&mut self, id: ObjectId, name: Option<&str>) {
        let Some(data) = self.nodes.get_mut(id) else {
            return;
        };
        if data.destroying || data.name.as_deref() == name {
            return;
        }
        data.name = name.map(str::to_owned);
        let name = data.name.clone();
        self.emit::<ObjectNameChanged>(id, &name);
    }

    /// The object name of a node, if it has one.
    pub fn object_name(&self, id: ObjectId) -> Option<&str> {
        self.nodes.get(id).and_then(|d| d.name.as_deref())
    }

    /// The owner of a node, if it has one.
    pub fn owner(&self, id: ObjectId) -> Option<ObjectId> {
        self.owner.get(id).copied()
    }

    /// The children of a node in insertion order. Empty if the node has no
    /// children or does not exist.
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Walk from `id` up to the top-level owner, collecting owner ids.
    ///
    /// Starts with the immediate owner; does not include `id`.
    pub fn ancestors(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.owner.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: ObjectId) -> Option<&ObjectData> {
        self.nodes.get(id)
    }

    /// Whether the tree still holds the node (it may be mid-destruction).
    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether the node exists and its destruction has not begun.
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.nodes.get(id).is_some_and(|d| !d.destroying)
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn descendant_count(&self, id: ObjectId) -> usize {
        self.walk_depth_first(id).len().saturating_sub(1)
    }
}

impl Default for ObjectTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectTree")
            .field("nodes", &self.nodes.len())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}
