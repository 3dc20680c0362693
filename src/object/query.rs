//! Tree queries: find by name, predicate matching, traversal, debug dump.

use std::fmt::Write;

use super::node::{ObjectData, ObjectId};
use super::tree::ObjectTree;

impl ObjectTree {
    /// First descendant of `root` (depth-first, pre-order) named `name`.
    ///
    /// `root` itself is not considered.
    pub fn find_child(&self, root: ObjectId, name: &str) -> Option<ObjectId> {
        self.descendants(root)
            .into_iter()
            .find(|&id| self.get(id).is_some_and(|d| d.has_name(name)))
    }

    /// All descendants of `root` named `name`, in depth-first order.
    pub fn find_children(&self, root: ObjectId, name: &str) -> Vec<ObjectId> {
        self.find_children_by(root, |data| data.has_name(name))
    }

    /// All descendants of `root` matching `predicate`, in depth-first order.
    pub fn find_children_by(
        &self,
        root: ObjectId,
        predicate: impl Fn(&ObjectData) -> bool,
    ) -> Vec<ObjectId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.get(id).is_some_and(&predicate))
            .collect()
    }

    /// Pre-order depth-first traversal starting from (and including) `start`.
    pub fn walk_depth_first(&self, start: ObjectId) -> Vec<ObjectId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// Every node below `root`, depth-first, excluding `root`.
    pub fn descendants(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut all = self.walk_depth_first(root);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    /// Render the subtree rooted at `root` as indented `Class::name` lines.
    pub fn dump(&self, root: ObjectId) -> String {
        let mut out = String::new();
        self.dump_into(root, 0, &mut out);
        out
    }

    fn dump_into(&self, id: ObjectId, depth: usize, out: &mut String) {
        let Some(data) = self.get(id) else {
            return;
        };
        let _ = writeln!(
            out,
            "{:indent$}{}::{}",
            "",
            data.class_name,
            data.name.as_deref().unwrap_or(""),
            indent = depth * 2
        );
        for &child in self.children(id) {
            self.dump_into(child, depth + 1, out);
        }
    }
}
