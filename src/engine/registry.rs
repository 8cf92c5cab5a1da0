//! Object Registry - the id → node arena.
//!
//! The single source of truth for what currently exists:
//! - O(1) lookup by id, keys unique at all times
//! - Parent edges stored as ids, resolved through the registry
//! - Reference resolution for ids embedded in command attributes
//!
//! Parent and child never own each other here. The native tree owns native
//! children; the registry only remembers which id a node was attached to.

use std::collections::HashMap;

use serde_json::Value;

use super::object::UiObject;
use crate::error::ObjectError;
use crate::types::{Attributes, Lifecycle, NodeFlags, ObjectId};

// =============================================================================
// Node
// =============================================================================

/// A registered live object plus the engine's bookkeeping for it.
pub struct Node {
    pub(crate) object: Box<dyn UiObject>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) flags: NodeFlags,
    pub(crate) lifecycle: Lifecycle,
}

impl Node {
    pub fn new(object: Box<dyn UiObject>, persistent: bool) -> Self {
        let mut flags = NodeFlags::NONE;
        flags.set(NodeFlags::PERSISTENT, persistent);
        Self {
            object,
            parent: None,
            flags,
            lifecycle: Lifecycle::Live,
        }
    }

    pub fn object(&self) -> &dyn UiObject {
        self.object.as_ref()
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parent.as_ref()
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_persistent(&self) -> bool {
        self.flags.contains(NodeFlags::PERSISTENT)
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct Registry {
    nodes: HashMap<ObjectId, Node>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Register `node` under `id`.
    ///
    /// Callers check for an existing entry first; an occupied id is handed
    /// back untouched so uniqueness can never be broken here.
    pub fn insert(&mut self, id: ObjectId, node: Node) -> Result<(), Node> {
        if self.nodes.contains_key(&id) {
            return Err(node);
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<(ObjectId, Node)> {
        self.nodes.remove_entry(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids whose node satisfies `predicate`, sorted.
    pub fn ids_where(&self, predicate: impl Fn(&Node) -> bool) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .nodes
            .iter()
            .filter(|(_, node)| predicate(node))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    // =========================================================================
    // Reference Resolution
    // =========================================================================

    /// Resolve the id stored under `key` in `attributes`.
    ///
    /// `None` means "not resolvable yet": the key is absent, not a string, or
    /// names nothing registered.
    pub fn resolve(&self, attributes: &Attributes, key: &str) -> Option<&ObjectId> {
        let id = attributes.get(key).and_then(Value::as_str)?;
        self.resolve_id(id)
    }

    /// Resolve a bare id to its registry key.
    pub fn resolve_id(&self, id: &str) -> Option<&ObjectId> {
        self.nodes.get_key_value(id).map(|(key, _)| key)
    }

    // =========================================================================
    // Tree Edges
    // =========================================================================

    /// Attach the registered `child_id` under the registered `parent_id`.
    ///
    /// Returns `Ok(false)` when either id is missing or the child would be
    /// attached to itself.
    pub fn attach(&mut self, child_id: &str, parent_id: &str) -> Result<bool, ObjectError> {
        if child_id == parent_id || !self.nodes.contains_key(parent_id) {
            return Ok(false);
        }
        let Some((key, mut child)) = self.nodes.remove_entry(child_id) else {
            return Ok(false);
        };

        let result = match self.nodes.get_mut(parent_id) {
            Some(parent) => parent.object.add_child(child.object.as_ref()),
            None => Ok(()),
        };
        if result.is_ok() {
            child.parent = self.resolve_id(parent_id).cloned();
        }
        self.nodes.insert(key, child);
        result.map(|()| true)
    }

    /// Drop every parent edge pointing at `parent_id`. Returns how many.
    pub fn detach_children_of(&mut self, parent_id: &str) -> usize {
        let mut detached = 0;
        for node in self.nodes.values_mut() {
            if node.parent.as_ref().is_some_and(|p| p.as_str() == parent_id) {
                node.parent = None;
                detached += 1;
            }
        }
        detached
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::object::{NativeHandle, ObjectBinding};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Minimal object that records the native handles of its children.
    pub(crate) struct StubObject {
        pub handle: u64,
        pub children: Rc<RefCell<Vec<NativeHandle>>>,
        pub reject_children: bool,
    }

    impl StubObject {
        pub(crate) fn boxed(handle: u64) -> Box<dyn UiObject> {
            Box::new(Self {
                handle,
                children: Rc::default(),
                reject_children: false,
            })
        }
    }

    impl UiObject for StubObject {
        fn mount(&mut self, _attributes: &Attributes) -> Result<(), ObjectError> {
            Ok(())
        }
        fn update(&mut self, _attributes: &Attributes) -> Result<(), ObjectError> {
            Ok(())
        }
        fn unmount(&mut self) -> Result<(), ObjectError> {
            Ok(())
        }
        fn add_child(&mut self, child: &dyn UiObject) -> Result<(), ObjectError> {
            if self.reject_children {
                return Err(ObjectError::Native("leaf".to_string()));
            }
            self.children.borrow_mut().push(child.native_handle());
            Ok(())
        }
        fn set_visible(&mut self, _visible: bool) {}
        fn native_handle(&self) -> NativeHandle {
            NativeHandle(self.handle)
        }
        fn bind(&mut self, _binding: ObjectBinding) {}
    }

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    #[test]
    fn test_insert_keeps_ids_unique() {
        let mut registry = Registry::new();
        assert!(registry.insert(id("a"), Node::new(StubObject::boxed(1), false)).is_ok());

        let rejected = registry.insert(id("a"), Node::new(StubObject::boxed(2), false));
        let node = rejected.err().unwrap();
        assert_eq!(node.object().native_handle(), NativeHandle(2));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().object().native_handle(), NativeHandle(1));
    }

    #[test]
    fn test_resolve_from_attributes() {
        let mut registry = Registry::new();
        registry.insert(id("root"), Node::new(StubObject::boxed(1), false)).ok();

        let attrs = json!({ "id": "child", "parent": "root" });
        let attrs = attrs.as_object().unwrap();
        assert_eq!(registry.resolve(attrs, "parent"), Some(&id("root")));
        assert_eq!(registry.resolve(attrs, "id"), None);
        assert_eq!(registry.resolve(attrs, "missing"), None);

        let attrs = json!({ "parent": 5 });
        assert_eq!(registry.resolve(attrs.as_object().unwrap(), "parent"), None);
    }

    #[test]
    fn test_persistent_flag() {
        let node = Node::new(StubObject::boxed(1), true);
        assert!(node.is_persistent());
        assert!(node.is_mounted());
        assert!(!Node::new(StubObject::boxed(2), false).is_persistent());
    }

    #[test]
    fn test_attach_records_edge_and_native_child() {
        let children = Rc::new(RefCell::new(Vec::new()));
        let parent = Box::new(StubObject {
            handle: 1,
            children: children.clone(),
            reject_children: false,
        });

        let mut registry = Registry::new();
        registry.insert(id("p"), Node::new(parent, false)).ok();
        registry.insert(id("c"), Node::new(StubObject::boxed(2), false)).ok();

        assert_eq!(registry.attach("c", "p"), Ok(true));
        assert_eq!(registry.get("c").unwrap().parent(), Some(&id("p")));
        assert_eq!(*children.borrow(), vec![NativeHandle(2)]);
        assert!(registry.contains("c"));
    }

    #[test]
    fn test_attach_missing_or_self() {
        let mut registry = Registry::new();
        registry.insert(id("a"), Node::new(StubObject::boxed(1), false)).ok();
        assert_eq!(registry.attach("a", "nope"), Ok(false));
        assert_eq!(registry.attach("nope", "a"), Ok(false));
        assert_eq!(registry.attach("a", "a"), Ok(false));
        assert!(registry.get("a").unwrap().parent().is_none());
    }

    #[test]
    fn test_attach_failure_keeps_child_registered() {
        let leaf = Box::new(StubObject {
            handle: 1,
            children: Rc::default(),
            reject_children: true,
        });
        let mut registry = Registry::new();
        registry.insert(id("leaf"), Node::new(leaf, false)).ok();
        registry.insert(id("c"), Node::new(StubObject::boxed(2), false)).ok();

        assert!(registry.attach("c", "leaf").is_err());
        assert!(registry.contains("c"));
        assert!(registry.get("c").unwrap().parent().is_none());
    }

    #[test]
    fn test_detach_children_of() {
        let mut registry = Registry::new();
        for (name, handle) in [("p", 1), ("a", 2), ("b", 3)] {
            registry.insert(id(name), Node::new(StubObject::boxed(handle), false)).ok();
        }
        registry.attach("a", "p").unwrap();
        registry.attach("b", "p").unwrap();

        assert_eq!(registry.detach_children_of("p"), 2);
        assert!(registry.get("a").unwrap().parent().is_none());
        assert_eq!(registry.ids(), vec![id("a"), id("b"), id("p")]);
    }
}
