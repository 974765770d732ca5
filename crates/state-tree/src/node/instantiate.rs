//! Building live nodes from validated snapshots.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::debug;

use super::{Member, Node, Storage};
use crate::environment::Environment;
use crate::error::{Result, StateError};
use crate::types::{Factory, TypeKind, ValidationContext};

impl Factory {
    /// Instantiates a new root node.
    ///
    /// A missing snapshot means the type's default, or an empty container.
    /// The snapshot is validated first; missing fields are then filled from
    /// their defaults and nested composite values become child nodes.
    ///
    /// # Errors
    ///
    /// - [`StateError::NotInstantiable`] for primitive types, or when the
    ///   snapshot resolves to a primitive (e.g. `null` for a `maybe`)
    /// - [`crate::StateTreeError::Validation`] /
    ///   [`crate::StateTreeError::AmbiguousUnion`] for invalid snapshots
    pub fn create(
        &self,
        snapshot: Option<Value>,
        environment: Option<Environment>,
    ) -> Result<Node> {
        if let TypeKind::Primitive(_) = self.kind() {
            return Err(self.not_instantiable());
        }
        let snapshot = snapshot
            .or_else(|| self.default_snapshot())
            .unwrap_or_else(|| json!({}));
        self.check(&snapshot, ValidationContext::Snapshot)?;
        let concrete = self
            .concrete_for(&snapshot)
            .ok_or_else(|| self.not_instantiable())?;
        let node = build_node(&concrete, &snapshot, environment)?;
        debug!(node = node.id(), type_name = %concrete.name(), "created root node");
        Ok(node)
    }

    fn not_instantiable(&self) -> crate::error::StateTreeError {
        StateError::NotInstantiable {
            type_name: self.name().to_string(),
        }
        .into()
    }
}

/// Turns a validated `value` of type `ty` into a member of `parent` stored
/// under `subpath`.
pub(crate) fn instantiate(
    ty: &Factory,
    value: &Value,
    parent: &Node,
    subpath: &str,
) -> Result<Member> {
    let Some(concrete) = ty.concrete_for(value) else {
        return Ok(Member::Leaf(value.clone()));
    };
    let node = build_node(&concrete, value, None)?;
    node.adopt(parent, subpath);
    Ok(Member::Node(node))
}

fn build_node(ty: &Factory, value: &Value, environment: Option<Environment>) -> Result<Node> {
    let empty = match ty.kind() {
        TypeKind::Object(_) => Storage::Object(IndexMap::new()),
        TypeKind::Map(_) => Storage::Map(IndexMap::new()),
        _ => Storage::Array(Vec::new()),
    };
    let node = Node::new(ty.clone(), empty, environment);
    let storage = match ty.kind() {
        TypeKind::Object(shape) => {
            let mut fields = IndexMap::with_capacity(shape.len());
            for (key, field_ty) in shape.fields() {
                let field_value = value
                    .get(key)
                    .cloned()
                    .or_else(|| field_ty.default_snapshot())
                    .unwrap_or(Value::Null);
                fields.insert(key.clone(), instantiate(field_ty, &field_value, &node, key)?);
            }
            Storage::Object(fields)
        }
        TypeKind::Map(item) => {
            let mut entries = IndexMap::new();
            if let Some(object) = value.as_object() {
                for (key, entry) in object {
                    entries.insert(key.clone(), instantiate(item, entry, &node, key)?);
                }
            }
            Storage::Map(entries)
        }
        TypeKind::Array(item) => {
            let mut items = Vec::new();
            if let Some(array) = value.as_array() {
                for (index, element) in array.iter().enumerate() {
                    items.push(instantiate(item, element, &node, &index.to_string())?);
                }
            }
            Storage::Array(items)
        }
        _ => return Err(ty.not_instantiable()),
    };
    node.0.borrow_mut().storage = storage;
    Ok(node)
}

impl Node {
    /// Links this (parentless) node under `parent` at `subpath`.
    pub(crate) fn adopt(&self, parent: &Node, subpath: &str) {
        let mut inner = self.0.borrow_mut();
        inner.parent = Some(Rc::downgrade(&parent.0));
        inner.subpath = subpath.to_string();
    }
}
