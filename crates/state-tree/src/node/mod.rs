//! Live tree nodes.
//!
//! Every object, array or map instance in a tree is a [`Node`]. A node owns
//! its children through its storage and knows its parent through a weak
//! back-reference, so a subtree is freed as soon as nothing holds its root.
//! Primitive values live directly in their parent's storage as
//! [`Member::Leaf`].

pub mod apply;
mod instantiate;
pub mod listeners;
mod mutate;
mod resolve;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::Value;
use state_tree_path::{join_path, parse_index};

use crate::environment::Environment;
use crate::snapshot::Snapshot;
use crate::types::Factory;

pub use listeners::{Disposer, PatchListener, SnapshotListener};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// What a key or path resolves to.
#[derive(Debug, Clone)]
pub enum Member {
    Leaf(Value),
    Node(Node),
}

impl Member {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Member::Node(node) => Some(node),
            Member::Leaf(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Member::Node(node) => Some(node),
            Member::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Member::Leaf(value) => Some(value),
            Member::Node(_) => None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        match self {
            Member::Leaf(value) => Snapshot::Leaf(value.clone()),
            Member::Node(node) => node.snapshot(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Member::Leaf(value) => value.clone(),
            Member::Node(node) => node.snapshot().to_value(),
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Member::Leaf(a), Member::Leaf(b)) => a == b,
            (Member::Node(a), Member::Node(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

pub(crate) enum Storage {
    Object(IndexMap<String, Member>),
    Array(Vec<Member>),
    Map(IndexMap<String, Member>),
}

impl Storage {
    fn get(&self, key: &str) -> Option<&Member> {
        match self {
            Storage::Object(fields) | Storage::Map(fields) => fields.get(key),
            Storage::Array(items) => parse_index(key).and_then(|i| items.get(i)),
        }
    }

    fn len(&self) -> usize {
        match self {
            Storage::Object(fields) | Storage::Map(fields) => fields.len(),
            Storage::Array(items) => items.len(),
        }
    }
}

pub(crate) struct NodeInner {
    pub(crate) id: u64,
    pub(crate) factory: Factory,
    pub(crate) parent: Option<Weak<RefCell<NodeInner>>>,
    pub(crate) subpath: String,
    pub(crate) environment: Option<Environment>,
    pub(crate) storage: Storage,
    pub(crate) snapshot: Option<Snapshot>,
    pub(crate) listeners: listeners::Listeners,
}

/// Handle to a live node. Cloning the handle does not clone the node.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<RefCell<NodeInner>>);

impl Node {
    pub(crate) fn new(
        factory: Factory,
        storage: Storage,
        environment: Option<Environment>,
    ) -> Self {
        Self(Rc::new(RefCell::new(NodeInner {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            factory,
            parent: None,
            subpath: String::new(),
            environment,
            storage,
            snapshot: None,
            listeners: listeners::Listeners::default(),
        })))
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<NodeInner>>) -> Self {
        Self(inner)
    }

    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    /// The concrete type this node was instantiated with.
    pub fn factory(&self) -> Factory {
        self.0.borrow().factory.clone()
    }

    pub fn parent(&self) -> Option<Node> {
        let inner = self.0.borrow();
        inner.parent.as_ref()?.upgrade().map(Node::from_inner)
    }

    /// The segment under which the parent stores this node; `""` for roots.
    pub fn subpath(&self) -> String {
        self.0.borrow().subpath.clone()
    }

    pub fn path_parts(&self) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            parts.push(current.subpath());
            current = parent;
        }
        parts.reverse();
        parts
    }

    pub fn path(&self) -> String {
        join_path(&self.path_parts())
    }

    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// The environment of the nearest node, starting at this one, that has
    /// one.
    pub fn environment(&self) -> Option<Environment> {
        let mut current = self.clone();
        loop {
            if let Some(env) = current.0.borrow().environment.clone() {
                return Some(env);
            }
            current = current.parent()?;
        }
    }

    /// The memoized snapshot of this subtree.
    ///
    /// Only subtrees invalidated since the last call are rebuilt; the
    /// snapshots of untouched children are reused by reference.
    pub fn snapshot(&self) -> Snapshot {
        if let Some(snapshot) = self.0.borrow().snapshot.clone() {
            return snapshot;
        }
        let snapshot = {
            let inner = self.0.borrow();
            match &inner.storage {
                Storage::Object(fields) | Storage::Map(fields) => Snapshot::Object(Rc::new(
                    fields
                        .iter()
                        .map(|(key, member)| (key.clone(), member.snapshot()))
                        .collect(),
                )),
                Storage::Array(items) => {
                    Snapshot::Array(Rc::new(items.iter().map(Member::snapshot).collect()))
                }
            }
        };
        self.0.borrow_mut().snapshot = Some(snapshot.clone());
        snapshot
    }

    /// The member under `key` (a field, map key or array index).
    pub fn get(&self, key: &str) -> Option<Member> {
        self.0.borrow().storage.get(key).cloned()
    }

    pub fn child(&self, key: &str) -> Option<Node> {
        self.get(key)?.into_node()
    }

    /// The snapshot value under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key).map(|member| member.to_value())
    }

    pub fn keys(&self) -> Vec<String> {
        match &self.0.borrow().storage {
            Storage::Object(fields) | Storage::Map(fields) => fields.keys().cloned().collect(),
            Storage::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.borrow().storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("type", &self.factory().name())
            .field("path", &self.path())
            .finish()
    }
}
