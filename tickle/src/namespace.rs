//! The namespace tree.
//!
//! Namespaces live in an arena and refer to one another by index.  A node's parent is an
//! index, never an owning pointer, and a node's children are kept sorted by name so that
//! lookups are binary searches.  Deleted namespaces stay in the arena as empty tombstones,
//! which keeps every issued [`NsId`] valid for the frames that may still refer to it.

use crate::command::Executable;
use crate::scope::Scope;
use crate::types::TickleHasher;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use indexmap::IndexMap;

/// The index of a namespace in the interpreter's arena.
pub(crate) type NsId = usize;

/// The root namespace, `::`.
pub(crate) const ROOT: NsId = 0;

pub(crate) struct Namespace<Ctx> {
    pub name: String,
    pub parent: Option<NsId>,
    /// Child names and indices, sorted by name.
    children: Vec<(String, NsId)>,
    pub commands: IndexMap<String, Rc<Executable<Ctx>>, TickleHasher>,
    pub vars: Scope,
    pub deleted: bool,
}

impl<Ctx> Namespace<Ctx> {
    fn new(name: &str, parent: Option<NsId>) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            commands: IndexMap::default(),
            vars: Scope::new(),
            deleted: false,
        }
    }

    pub fn child(&self, name: &str) -> Option<NsId> {
        self.children
            .binary_search_by(|(child, _)| child.as_str().cmp(name))
            .ok()
            .map(|i| self.children[i].1)
    }

    /// Child indices in name order.
    pub fn children(&self) -> impl Iterator<Item = NsId> + '_ {
        self.children.iter().map(|(_, id)| *id)
    }
}

pub(crate) struct Namespaces<Ctx> {
    nodes: Vec<Namespace<Ctx>>,
}

impl<Ctx> Namespaces<Ctx> {
    /// Creates an arena holding just the root namespace.
    pub fn new() -> Self {
        Self {
            nodes: alloc::vec![Namespace::new("", None)],
        }
    }

    pub fn get(&self, id: NsId) -> &Namespace<Ctx> {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NsId) -> &mut Namespace<Ctx> {
        &mut self.nodes[id]
    }

    /// The fully qualified name of a namespace: `::` for the root, otherwise `::a::b`.
    pub fn path(&self, id: NsId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if node == ROOT {
                break;
            }
            names.push(self.nodes[node].name.as_str());
            cursor = self.nodes[node].parent;
        }

        if names.is_empty() {
            return String::from("::");
        }

        names.reverse();
        format!("::{}", names.join("::"))
    }

    /// Resolves a namespace name.  A name starting with `::` is absolute; anything else is
    /// looked up relative to `from` first, then relative to the root.
    pub fn find(&self, from: NsId, path: &str) -> Option<NsId> {
        if let Some(absolute) = path.strip_prefix("::") {
            return self.walk(ROOT, absolute);
        }
        self.walk(from, path).or_else(|| self.walk(ROOT, path))
    }

    fn walk(&self, start: NsId, path: &str) -> Option<NsId> {
        let mut id = start;
        for name in path.split("::").filter(|name| !name.is_empty()) {
            id = self.nodes[id].child(name)?;
        }
        Some(id)
    }

    /// Resolves a namespace name, creating any missing namespaces along the way.  Relative
    /// names are created relative to `from`.
    pub fn ensure(&mut self, from: NsId, path: &str) -> NsId {
        let (mut id, rest) = match path.strip_prefix("::") {
            Some(absolute) => (ROOT, absolute),
            None => (from, path),
        };

        for name in rest.split("::").filter(|name| !name.is_empty()) {
            id = match self.nodes[id].child(name) {
                Some(child) => child,
                None => self.add_child(id, name),
            };
        }

        id
    }

    fn add_child(&mut self, parent: NsId, name: &str) -> NsId {
        let id = self.nodes.len();
        self.nodes.push(Namespace::new(name, Some(parent)));

        let children = &mut self.nodes[parent].children;
        let pos = children
            .binary_search_by(|(child, _)| child.as_str().cmp(name))
            .unwrap_or_else(|pos| pos);
        children.insert(pos, (name.into(), id));

        tracing::debug!(namespace = %self.path(id), "created namespace");
        id
    }

    /// Deletes a namespace and all of its descendants.  The root can't be deleted.
    pub fn delete(&mut self, id: NsId) {
        if id == ROOT {
            return;
        }

        tracing::debug!(namespace = %self.path(id), "deleting namespace");

        if let Some(parent) = self.nodes[id].parent {
            self.nodes[parent].children.retain(|(_, child)| *child != id);
        }

        let mut doomed = alloc::vec![id];
        while let Some(node) = doomed.pop() {
            let ns = &mut self.nodes[node];
            doomed.extend(ns.children.drain(..).map(|(_, child)| child));
            ns.commands.clear();
            if !ns.vars.is_empty() {
                tracing::trace!(vars = ns.vars.len(), "dropping namespace variables");
                ns.vars.clear();
            }
            ns.deleted = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ensure_and_path() {
        let mut tree = Namespaces::<()>::new();
        let b = tree.ensure(ROOT, "a::b");
        assert_eq!(tree.path(b), "::a::b");
        assert_eq!(tree.path(ROOT), "::");

        let a = tree.find(ROOT, "a").unwrap();
        assert_eq!(tree.get(b).parent, Some(a));
        assert_eq!(tree.ensure(a, "b"), b);
        assert_eq!(tree.ensure(b, "::a"), a);
    }

    #[test]
    fn test_find_relative_then_root() {
        let mut tree = Namespaces::<()>::new();
        let x = tree.ensure(ROOT, "x");
        let inner = tree.ensure(ROOT, "a::y");
        let a = tree.find(ROOT, "::a").unwrap();

        assert_eq!(tree.find(a, "y"), Some(inner));
        assert_eq!(tree.find(a, "x"), Some(x));
        assert_eq!(tree.find(a, "::y"), None);
        assert_eq!(tree.find(ROOT, "::"), Some(ROOT));
    }

    #[test]
    fn test_children_sorted() {
        let mut tree = Namespaces::<()>::new();
        for name in ["m", "c", "x", "a"] {
            tree.ensure(ROOT, name);
        }
        let names: Vec<String> = tree
            .get(ROOT)
            .children()
            .map(|id| tree.get(id).name.clone())
            .collect();
        assert_eq!(names, ["a", "c", "m", "x"]);
    }

    #[test]
    fn test_delete() {
        let mut tree = Namespaces::<()>::new();
        let b = tree.ensure(ROOT, "a::b");
        let a = tree.find(ROOT, "a").unwrap();
        tree.get_mut(b).vars.set("v", "1".into());

        tree.delete(a);
        assert_eq!(tree.find(ROOT, "a"), None);
        assert!(tree.get(b).deleted);
        assert!(!tree.get(b).vars.contains("v"));

        tree.delete(ROOT);
        assert!(!tree.get(ROOT).deleted);
    }
}
