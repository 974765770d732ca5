//! Direct mutation of live nodes.
//!
//! Each mutation validates first, then changes storage, then emits exactly
//! one patch that bubbles from the mutated node up to the root. Every
//! mutation runs in its own transaction scope.

use serde_json::Value;
use state_tree_path::{join_path, parse_index};
use tracing::trace;

use super::instantiate::instantiate;
use super::{Member, Node, Storage};
use crate::error::{Result, StateError};
use crate::patch::{Patch, PatchOp};
use crate::transaction::{self, transaction};
use crate::types::{Factory, TypeKind, ValidationContext};

/// A value about to be written: a snapshot to instantiate or an existing
/// detached node to attach.
enum Incoming<'a> {
    Value(Value),
    Node(&'a Node),
}

impl Node {
    /// Writes `value` to an object field, an existing array index or a map
    /// key.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        transaction(|| self.write(key, Incoming::Value(value)))
    }

    /// Attaches a detached node under `key`.
    pub fn set_node(&self, key: &str, node: &Node) -> Result<()> {
        transaction(|| self.write(key, Incoming::Node(node)))
    }

    /// Appends to an array node.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        transaction(|| self.insert_at(self.len(), Incoming::Value(value)))
    }

    pub fn push_node(&self, node: &Node) -> Result<()> {
        transaction(|| self.insert_at(self.len(), Incoming::Node(node)))
    }

    /// Inserts into an array node, shifting later elements.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        transaction(|| self.insert_at(index, Incoming::Value(value)))
    }

    pub fn insert_node(&self, index: usize, node: &Node) -> Result<()> {
        transaction(|| self.insert_at(index, Incoming::Node(node)))
    }

    /// Removes an array element or map entry, or nulls an object field whose
    /// type accepts `null`. Returns the removed member; a removed node is
    /// left detached.
    pub fn remove(&self, key: &str) -> Result<Member> {
        transaction(|| self.remove_key(key))
    }

    // ---------------------------------------------------------------------

    /// The declared type of the slot under `key`.
    pub(crate) fn slot_type(&self, key: &str) -> Result<Factory> {
        let factory = self.factory();
        match factory.kind() {
            TypeKind::Object(shape) => shape.get(key).cloned().ok_or_else(|| {
                StateError::InvalidKey {
                    type_name: factory.name().to_string(),
                    key: key.to_string(),
                }
                .into()
            }),
            TypeKind::Array(item) | TypeKind::Map(item) => Ok(item.clone()),
            _ => Err(StateError::NotInstantiable {
                type_name: factory.name().to_string(),
            }
            .into()),
        }
    }

    fn write(&self, key: &str, incoming: Incoming<'_>) -> Result<()> {
        let ty = self.slot_type(key)?;
        let op = {
            let inner = self.0.borrow();
            match &inner.storage {
                Storage::Object(_) => PatchOp::Replace,
                Storage::Map(entries) if entries.contains_key(key) => PatchOp::Replace,
                Storage::Map(_) => PatchOp::Add,
                Storage::Array(items) => {
                    if !parse_index(key).is_some_and(|i| i < items.len()) {
                        return Err(self.out_of_bounds(key, items.len()));
                    }
                    PatchOp::Replace
                }
            }
        };
        let member = self.prepare(&ty, key, incoming)?;
        let value = member.to_value();
        let previous = {
            let mut inner = self.0.borrow_mut();
            match &mut inner.storage {
                Storage::Object(fields) | Storage::Map(fields) => {
                    fields.insert(key.to_string(), member)
                }
                Storage::Array(items) => parse_index(key)
                    .and_then(|i| items.get_mut(i))
                    .map(|slot| std::mem::replace(slot, member)),
            }
        };
        if let Some(previous) = previous {
            orphan(previous);
        }
        self.changed(Patch {
            op,
            path: join_path(&[key]),
            value: Some(value),
        });
        Ok(())
    }

    fn insert_at(&self, index: usize, incoming: Incoming<'_>) -> Result<()> {
        let ty = self.slot_type(&index.to_string())?;
        let len = match &self.0.borrow().storage {
            Storage::Array(items) => items.len(),
            _ => {
                return Err(StateError::InvalidKey {
                    type_name: self.factory().name().to_string(),
                    key: index.to_string(),
                }
                .into())
            }
        };
        if index > len {
            return Err(self.out_of_bounds(&index.to_string(), len));
        }
        let member = self.prepare(&ty, &index.to_string(), incoming)?;
        let value = member.to_value();
        if let Storage::Array(items) = &mut self.0.borrow_mut().storage {
            items.insert(index, member);
            renumber(items, index + 1);
        }
        self.changed(Patch::add(join_path(&[index.to_string()]), value));
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<Member> {
        let factory = self.factory();
        let (removed, patch) = match factory.kind() {
            TypeKind::Object(shape) => {
                let field = shape.get(key).ok_or_else(|| StateError::InvalidKey {
                    type_name: factory.name().to_string(),
                    key: key.to_string(),
                })?;
                if !field.is(&Value::Null) {
                    return Err(StateError::FieldNotRemovable {
                        type_name: factory.name().to_string(),
                        key: key.to_string(),
                    }
                    .into());
                }
                let mut inner = self.0.borrow_mut();
                let previous = match &mut inner.storage {
                    Storage::Object(fields) => {
                        fields.insert(key.to_string(), Member::Leaf(Value::Null))
                    }
                    _ => None,
                };
                (previous, Patch::replace(join_path(&[key]), Value::Null))
            }
            TypeKind::Map(_) => {
                let mut inner = self.0.borrow_mut();
                let previous = match &mut inner.storage {
                    Storage::Map(entries) => entries.shift_remove(key),
                    _ => None,
                };
                (previous, Patch::remove(join_path(&[key])))
            }
            _ => {
                let mut inner = self.0.borrow_mut();
                let previous = match &mut inner.storage {
                    Storage::Array(items) => match parse_index(key) {
                        Some(index) if index < items.len() => {
                            let previous = items.remove(index);
                            renumber(items, index);
                            Some(previous)
                        }
                        _ => None,
                    },
                    _ => None,
                };
                (previous, Patch::remove(join_path(&[key])))
            }
        };
        let Some(removed) = removed else {
            return Err(match factory.kind() {
                TypeKind::Array(_) => self.out_of_bounds(key, self.len()),
                _ => StateError::MissingKey {
                    path: self.path(),
                    key: key.to_string(),
                }
                .into(),
            });
        };
        let removed = orphan(removed);
        self.changed(patch);
        Ok(removed)
    }

    /// Validates `incoming` against `ty` and turns it into a member stored
    /// under `key`.
    fn prepare(&self, ty: &Factory, key: &str, incoming: Incoming<'_>) -> Result<Member> {
        match incoming {
            Incoming::Value(value) => {
                ty.check(&value, ValidationContext::Snapshot)?;
                instantiate(ty, &value, self, key)
            }
            Incoming::Node(node) => {
                self.ensure_attachable(node)?;
                ty.check(&node.snapshot().to_value(), ValidationContext::Snapshot)?;
                node.adopt(self, key);
                Ok(Member::Node(node.clone()))
            }
        }
    }

    pub(crate) fn ensure_attachable(&self, node: &Node) -> Result<()> {
        if node.parent().is_some() {
            return Err(StateError::AlreadyAttached {
                type_name: node.factory().name().to_string(),
                path: node.path(),
            }
            .into());
        }
        if node.ptr_eq(&self.root()) {
            return Err(StateError::AttachToOwnSubtree.into());
        }
        Ok(())
    }

    fn out_of_bounds(&self, index: &str, len: usize) -> crate::error::StateTreeError {
        StateError::IndexOutOfBounds {
            path: self.path(),
            index: index.to_string(),
            len,
        }
        .into()
    }

    /// Invalidates snapshots from this node up to the root, schedules
    /// snapshot notification and delivers `patch` to every patch listener
    /// on the way up, each seeing it relative to its own node.
    pub(crate) fn changed(&self, patch: Patch) {
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            node.0.borrow_mut().snapshot = None;
            transaction::touch(&node);
            current = node.parent();
            chain.push(node);
        }
        trace!(node = self.id(), op = %patch.op, path = %patch.path, "emitting patch");
        let mut patch = patch;
        let last = chain.len() - 1;
        for (depth, node) in chain.iter().enumerate() {
            for listener in node.patch_listeners() {
                listener(&patch);
            }
            if depth < last {
                patch = patch.prefixed(&node.subpath());
            }
        }
    }

    /// Clears the parent link and pins the environment the node saw while
    /// attached.
    pub(crate) fn release(&self) {
        let environment = self.environment();
        let mut inner = self.0.borrow_mut();
        inner.parent = None;
        inner.subpath.clear();
        inner.environment = environment;
    }
}

fn orphan(member: Member) -> Member {
    if let Member::Node(node) = &member {
        node.release();
    }
    member
}

fn renumber(items: &[Member], from: usize) {
    for (index, member) in items.iter().enumerate().skip(from) {
        if let Member::Node(node) = member {
            node.0.borrow_mut().subpath = index.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateTreeError;
    use crate::types::{self, create_factory};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn todo() -> Factory {
        create_factory("Todo", json!({"title": "", "done": false})).unwrap()
    }

    fn store() -> Node {
        Factory::model("Store")
            .prop("todos", types::array(&todo()))
            .prop("tags", types::map(&types::string()))
            .prop("selected", types::maybe(&todo()))
            .build()
            .unwrap()
            .create(Some(json!({"todos": [{"title": "milk"}]})), None)
            .unwrap()
    }

    fn collect(node: &Node) -> Rc<RefCell<Vec<Patch>>> {
        let patches = Rc::new(RefCell::new(Vec::new()));
        let sink = patches.clone();
        let _ = node.add_patch_listener(Rc::new(move |p: &Patch| {
            sink.borrow_mut().push(p.clone())
        }));
        patches
    }

    #[test]
    fn test_set_field_bubbles_patch() {
        let root = store();
        let patches = collect(&root);
        let first = root.child("todos").unwrap().child("0").unwrap();
        let local = collect(&first);
        first.set("done", true).unwrap();
        assert_eq!(*local.borrow(), vec![Patch::replace("/done", json!(true))]);
        assert_eq!(*patches.borrow(), vec![Patch::replace("/todos/0/done", json!(true))]);
        assert_eq!(first.get_value("done"), Some(json!(true)));
    }

    #[test]
    fn test_equal_write_still_emits() {
        let root = store();
        let patches = collect(&root);
        let first = root.child("todos").unwrap().child("0").unwrap();
        first.set("title", "milk").unwrap();
        assert_eq!(patches.borrow().len(), 1);
    }

    #[test]
    fn test_set_validates_before_mutating() {
        let root = store();
        let patches = collect(&root);
        let first = root.child("todos").unwrap().child("0").unwrap();
        let err = first.set("done", "yes").unwrap_err();
        assert!(matches!(err, StateTreeError::Validation(_)));
        assert!(matches!(
            first.set("nope", 1).unwrap_err(),
            StateTreeError::State(StateError::InvalidKey { .. })
        ));
        assert!(patches.borrow().is_empty());
        assert_eq!(first.get_value("done"), Some(json!(false)));
    }

    #[test]
    fn test_array_insert_and_remove_renumber() {
        let root = store();
        let todos = root.child("todos").unwrap();
        let patches = collect(&root);
        todos.push(json!({"title": "eggs"})).unwrap();
        todos.insert(0, json!({"title": "bread"})).unwrap();
        let eggs = todos.child("2").unwrap();
        assert_eq!(eggs.path(), "/todos/2");
        let removed = todos.remove("0").unwrap().into_node().unwrap();
        assert!(removed.is_root());
        assert_eq!(eggs.path(), "/todos/1");
        assert_eq!(
            *patches.borrow(),
            vec![
                Patch::add("/todos/1", json!({"title": "eggs", "done": false})),
                Patch::add("/todos/0", json!({"title": "bread", "done": false})),
                Patch::remove("/todos/0"),
            ]
        );
        assert!(matches!(
            todos.remove("5").unwrap_err(),
            StateTreeError::State(StateError::IndexOutOfBounds { .. })
        ));
        assert!(todos.insert(9, json!({})).is_err());
        assert!(todos.set("2", json!({})).is_err());
    }

    #[test]
    fn test_map_add_replace_remove() {
        let root = store();
        let tags = root.child("tags").unwrap();
        let patches = collect(&tags);
        tags.set("a", "x").unwrap();
        tags.set("a", "y").unwrap();
        assert_eq!(tags.remove("a").unwrap(), Member::Leaf(json!("y")));
        assert_eq!(
            *patches.borrow(),
            vec![
                Patch::add("/a", json!("x")),
                Patch::replace("/a", json!("y")),
                Patch::remove("/a"),
            ]
        );
        assert_eq!(
            tags.remove("a").unwrap_err(),
            StateTreeError::State(StateError::MissingKey {
                path: "/tags".to_string(),
                key: "a".to_string()
            })
        );
    }

    #[test]
    fn test_remove_object_field() {
        let root = store();
        root.set("selected", json!({"title": "x"})).unwrap();
        let patches = collect(&root);
        let selected = root.remove("selected").unwrap().into_node().unwrap();
        assert!(selected.is_root());
        assert_eq!(root.get_value("selected"), Some(Value::Null));
        assert_eq!(*patches.borrow(), vec![Patch::replace("/selected", Value::Null)]);
        assert!(matches!(
            root.remove("todos").unwrap_err(),
            StateTreeError::State(StateError::FieldNotRemovable { .. })
        ));
    }

    #[test]
    fn test_attach_detached_node() {
        let root = store();
        let todos = root.child("todos").unwrap();
        let loose = todo().create(Some(json!({"title": "loose"})), None).unwrap();
        todos.push_node(&loose).unwrap();
        assert_eq!(loose.path(), "/todos/1");
        let err = root.set_node("selected", &loose).unwrap_err();
        assert!(matches!(err, StateTreeError::State(StateError::AlreadyAttached { .. })));
        let err = todos.push_node(&root).unwrap_err();
        assert_eq!(err, StateTreeError::State(StateError::AttachToOwnSubtree));
    }

    #[test]
    fn test_replaced_child_is_released() {
        let root = store();
        let todos = root.child("todos").unwrap();
        let old = todos.child("0").unwrap();
        todos.set("0", json!({"title": "new"})).unwrap();
        assert!(old.is_root());
        assert_eq!(old.path(), "");
        assert_eq!(old.get_value("title"), Some(json!("milk")));
    }

    #[test]
    fn test_snapshot_invalidation_keeps_siblings_shared() {
        let root = store();
        root.child("todos").unwrap().push(json!({"title": "b"})).unwrap();
        let before = root.snapshot();
        root.child("todos").unwrap().child("1").unwrap().set("done", true).unwrap();
        let after = root.snapshot();
        assert!(!before.ptr_eq(&after));
        let first_before = before.get("todos").and_then(|t| t.get("0")).unwrap();
        let first_after = after.get("todos").and_then(|t| t.get("0")).unwrap();
        assert!(first_before.ptr_eq(first_after));
        assert!(before.get("tags").unwrap().ptr_eq(after.get("tags").unwrap()));
    }
}
