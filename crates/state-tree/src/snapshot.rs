//! Immutable, structurally shared snapshots.
//!
//! A node memoizes its snapshot until something in its subtree changes.
//! Container snapshots hold their children behind `Rc`, so when a parent
//! recomputes its snapshot the untouched children are reused by reference
//! rather than rebuilt. [`Snapshot::ptr_eq`] exposes that sharing to callers
//! that want a cheap "did this subtree change" check.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
    /// A primitive leaf (`string`, `number`, `boolean` or `null`).
    Leaf(Value),
    /// An object or map node. Keys keep declaration/insertion order.
    Object(Rc<IndexMap<String, Snapshot>>),
    /// An array node.
    Array(Rc<Vec<Snapshot>>),
}

impl Snapshot {
    /// Returns true when both snapshots are the same allocation.
    ///
    /// Leaves are compared by value since they are not shared.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        match (self, other) {
            (Snapshot::Object(a), Snapshot::Object(b)) => Rc::ptr_eq(a, b),
            (Snapshot::Array(a), Snapshot::Array(b)) => Rc::ptr_eq(a, b),
            (Snapshot::Leaf(a), Snapshot::Leaf(b)) => a == b,
            _ => false,
        }
    }

    /// Looks up an object key or array index.
    pub fn get(&self, key: &str) -> Option<&Snapshot> {
        match self {
            Snapshot::Object(fields) => fields.get(key),
            Snapshot::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            Snapshot::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Snapshot::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Converts into a plain JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Snapshot::Leaf(value) => value.clone(),
            Snapshot::Object(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (key, child) in fields.iter() {
                    map.insert(key.clone(), child.to_value());
                }
                Value::Object(map)
            }
            Snapshot::Array(items) => Value::Array(items.iter().map(Snapshot::to_value).collect()),
        }
    }
}

impl From<&Snapshot> for Value {
    fn from(snapshot: &Snapshot) -> Self {
        snapshot.to_value()
    }
}

impl From<Snapshot> for Value {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.to_value()
    }
}

impl PartialEq<Value> for Snapshot {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Snapshot::Leaf(a), b) => a == b,
            (Snapshot::Object(fields), Value::Object(map)) => {
                fields.len() == map.len()
                    && fields
                        .iter()
                        .all(|(key, child)| map.get(key).is_some_and(|v| child == v))
            }
            (Snapshot::Array(items), Value::Array(values)) => {
                items.len() == values.len() && items.iter().zip(values).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl PartialEq<Snapshot> for Value {
    fn eq(&self, other: &Snapshot) -> bool {
        other == self
    }
}
