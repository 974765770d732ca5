//! Applying patches and snapshots to live nodes.

use serde_json::Value;
use state_tree_path::{
    join_path, parse_index, split_path, validate_path, validate_segments, END_OF_ARRAY,
};
use tracing::debug;

use super::{Member, Node};
use crate::error::{Result, StateError};
use crate::patch::{Patch, PatchOp};
use crate::transaction::transaction;
use crate::types::{Factory, TypeKind, ValidationContext};

impl Node {
    /// Applies one patch addressed relative to this node.
    ///
    /// `add` inserts into arrays (`-` appends) and writes object fields and
    /// map keys; `replace` requires an existing key; `remove` deletes array
    /// elements and map entries and nulls object fields that accept `null`.
    /// A `replace` at the empty path applies `value` as a snapshot of this
    /// node. A missing `value` reads as `null`. Paths are pointers: `.`
    /// and `..` segments name children, they never navigate.
    pub fn apply_patch(&self, patch: &Patch) -> Result<()> {
        validate_path(&patch.path)?;
        let mut segments = split_path(&patch.path);
        validate_segments(&segments)?;
        debug!(node = self.id(), op = %patch.op, path = %patch.path, "applying patch");
        let value = patch.value.clone().unwrap_or(Value::Null);
        transaction(|| {
            let Some(key) = segments.pop() else {
                return match patch.op {
                    PatchOp::Replace => self.apply_snapshot(&value),
                    op => Err(StateError::InvalidRootPatch {
                        op: op.to_string(),
                    }
                    .into()),
                };
            };
            let target = self
                .resolve_segments(&segments)?
                .into_node()
                .ok_or_else(|| StateError::NotANode {
                    path: join_path(&segments),
                })?;
            let is_array = matches!(target.factory().kind(), TypeKind::Array(_));
            match patch.op {
                PatchOp::Add if is_array => {
                    let index = if key == END_OF_ARRAY {
                        Some(target.len())
                    } else {
                        parse_index(&key)
                    };
                    match index {
                        Some(index) => target.insert(index, value),
                        None => Err(StateError::IndexOutOfBounds {
                            path: target.path(),
                            index: key,
                            len: target.len(),
                        }
                        .into()),
                    }
                }
                PatchOp::Add => target.set(&key, value),
                PatchOp::Replace => {
                    let is_map = matches!(target.factory().kind(), TypeKind::Map(_));
                    if is_map && target.get(&key).is_none() {
                        return Err(StateError::MissingKey {
                            path: target.path(),
                            key,
                        }
                        .into());
                    }
                    target.set(&key, value)
                }
                PatchOp::Remove => target.remove(&key).map(|_| ()),
            }
        })
    }

    /// Applies `patches` in order inside one transaction, all or nothing.
    ///
    /// A batch of several patches is first run against a scratch copy of
    /// this node; the tree is only mutated once the whole batch applied
    /// there, so a failing patch leaves the tree untouched.
    pub fn apply_patches(&self, patches: &[Patch]) -> Result<()> {
        if patches.len() > 1 {
            let scratch = self
                .factory()
                .create(Some(self.snapshot().to_value()), None)?;
            if let Err(err) = patches.iter().try_for_each(|patch| scratch.apply_patch(patch)) {
                debug!(node = self.id(), patches = patches.len(), "rejected patch batch");
                return Err(err);
            }
        }
        transaction(|| patches.iter().try_for_each(|patch| self.apply_patch(patch)))
    }

    /// Replaces this node's state with `snapshot`.
    ///
    /// The snapshot is validated against this node's type before anything
    /// changes. Child nodes whose type still matches are updated in place,
    /// so handles to them stay valid; equal leaves are left untouched.
    pub fn apply_snapshot(&self, snapshot: &Value) -> Result<()> {
        self.factory().check(snapshot, ValidationContext::Snapshot)?;
        debug!(node = self.id(), "applying snapshot");
        transaction(|| self.reconcile(snapshot))
    }

    fn reconcile(&self, snapshot: &Value) -> Result<()> {
        let factory = self.factory();
        match factory.kind() {
            TypeKind::Object(shape) => {
                for (key, field_ty) in shape.fields() {
                    let value = snapshot
                        .get(key)
                        .cloned()
                        .or_else(|| field_ty.default_snapshot())
                        .unwrap_or(Value::Null);
                    self.reconcile_slot(key, field_ty, value)?;
                }
            }
            TypeKind::Map(item) => {
                let empty = serde_json::Map::new();
                let entries = snapshot.as_object().unwrap_or(&empty);
                for key in self.keys() {
                    if !entries.contains_key(&key) {
                        self.remove(&key)?;
                    }
                }
                for (key, entry) in entries {
                    self.reconcile_slot(key, item, entry.clone())?;
                }
            }
            TypeKind::Array(item) => {
                let empty = Vec::new();
                let items = snapshot.as_array().unwrap_or(&empty);
                let len = self.len();
                for (index, element) in items.iter().enumerate() {
                    if index < len {
                        self.reconcile_slot(&index.to_string(), item, element.clone())?;
                    } else {
                        self.insert(index, element.clone())?;
                    }
                }
                for index in (items.len()..len).rev() {
                    self.remove(&index.to_string())?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn reconcile_slot(&self, key: &str, ty: &Factory, value: Value) -> Result<()> {
        match self.get(key) {
            Some(Member::Node(child))
                if ty
                    .concrete_for(&value)
                    .is_some_and(|concrete| concrete.ptr_eq(&child.factory())) =>
            {
                child.reconcile(&value)
            }
            Some(Member::Leaf(existing)) if existing == value => Ok(()),
            _ => self.set(key, value),
        }
    }
}
