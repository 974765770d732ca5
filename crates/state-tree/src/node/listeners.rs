//! Per-node listener registries.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::{Node, NodeInner};
use crate::action::Middleware;
use crate::patch::Patch;
use crate::snapshot::Snapshot;

pub type PatchListener = Rc<dyn Fn(&Patch)>;
pub type SnapshotListener = Rc<dyn Fn(&Snapshot)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListenerKind {
    Patch,
    Snapshot,
    Middleware,
}

pub(crate) struct Listeners {
    next_id: u64,
    patch: BTreeMap<u64, PatchListener>,
    snapshot: BTreeMap<u64, SnapshotListener>,
    middleware: BTreeMap<u64, Middleware>,
}

impl Default for Listeners {
    fn default() -> Self {
        Self {
            next_id: 1,
            patch: BTreeMap::new(),
            snapshot: BTreeMap::new(),
            middleware: BTreeMap::new(),
        }
    }
}

impl Listeners {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn remove(&mut self, kind: ListenerKind, id: u64) -> bool {
        match kind {
            ListenerKind::Patch => self.patch.remove(&id).is_some(),
            ListenerKind::Snapshot => self.snapshot.remove(&id).is_some(),
            ListenerKind::Middleware => self.middleware.remove(&id).is_some(),
        }
    }
}

/// Handle returned by every listener registration.
///
/// Dropping a disposer does not unregister; call [`Disposer::dispose`].
#[derive(Debug, Clone)]
#[must_use = "a disposer is the only way to unregister the listener"]
pub struct Disposer {
    node: Weak<RefCell<NodeInner>>,
    kind: ListenerKind,
    id: u64,
}

impl Disposer {
    /// Unregisters the listener. Returns false when it was already removed
    /// or the node no longer exists.
    pub fn dispose(self) -> bool {
        match self.node.upgrade() {
            Some(inner) => inner.borrow_mut().listeners.remove(self.kind, self.id),
            None => false,
        }
    }
}

impl Node {
    fn register(&self, kind: ListenerKind, insert: impl FnOnce(&mut Listeners, u64)) -> Disposer {
        let mut inner = self.0.borrow_mut();
        let id = inner.listeners.next_id();
        insert(&mut inner.listeners, id);
        Disposer {
            node: Rc::downgrade(&self.0),
            kind,
            id,
        }
    }

    pub(crate) fn add_patch_listener(&self, listener: PatchListener) -> Disposer {
        self.register(ListenerKind::Patch, |l, id| {
            l.patch.insert(id, listener);
        })
    }

    pub(crate) fn add_snapshot_listener(&self, listener: SnapshotListener) -> Disposer {
        self.register(ListenerKind::Snapshot, |l, id| {
            l.snapshot.insert(id, listener);
        })
    }

    pub(crate) fn add_middleware(&self, middleware: Middleware) -> Disposer {
        self.register(ListenerKind::Middleware, |l, id| {
            l.middleware.insert(id, middleware);
        })
    }

    // Registries are cloned out before invoking so that listeners may
    // register, dispose or mutate the tree.

    pub(crate) fn patch_listeners(&self) -> Vec<PatchListener> {
        self.0.borrow().listeners.patch.values().cloned().collect()
    }

    pub(crate) fn snapshot_listeners(&self) -> Vec<SnapshotListener> {
        self.0.borrow().listeners.snapshot.values().cloned().collect()
    }

    pub(crate) fn middleware(&self) -> Vec<Middleware> {
        self.0.borrow().listeners.middleware.values().cloned().collect()
    }

    pub(crate) fn has_snapshot_listeners(&self) -> bool {
        !self.0.borrow().listeners.snapshot.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::create_factory;
    use serde_json::json;

    #[test]
    fn test_dispose_removes_once() {
        let node = create_factory("M", json!({"a": 1}))
            .unwrap()
            .create(None, None)
            .unwrap();
        let disposer = node.add_patch_listener(Rc::new(|_: &Patch| {}));
        assert_eq!(node.patch_listeners().len(), 1);
        assert!(disposer.clone().dispose());
        assert!(node.patch_listeners().is_empty());
        assert!(!disposer.dispose());
    }

    #[test]
    fn test_registration_order_is_kept() {
        let node = create_factory("M", json!({"a": 1}))
            .unwrap()
            .create(None, None)
            .unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let seen = seen.clone();
            let _ = node.add_patch_listener(Rc::new(move |_: &Patch| seen.borrow_mut().push(tag)));
        }
        for listener in node.patch_listeners() {
            listener(&Patch::remove("/a"));
        }
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }
}
