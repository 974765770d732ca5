//! Transaction scopes and deferred snapshot notification.
//!
//! Scopes nest; only leaving the outermost one flushes. Every node changed
//! inside the scope is recorded once, in first-touch order, and its
//! snapshot listeners are called once with the snapshot current at flush
//! time.

use std::cell::RefCell;
use std::rc::Weak;

use indexmap::IndexMap;
use tracing::trace;

use crate::node::{Node, NodeInner};

#[derive(Default)]
struct TransactionState {
    depth: usize,
    touched: IndexMap<u64, Weak<RefCell<NodeInner>>>,
}

thread_local! {
    static STATE: RefCell<TransactionState> = RefCell::new(TransactionState::default());
}

struct TransactionGuard;

impl TransactionGuard {
    fn enter() -> Self {
        STATE.with(|state| state.borrow_mut().depth += 1);
        TransactionGuard
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        let touched = STATE.with(|state| {
            let mut state = state.borrow_mut();
            state.depth -= 1;
            if state.depth == 0 {
                Some(std::mem::take(&mut state.touched))
            } else {
                None
            }
        });
        let Some(touched) = touched else {
            return;
        };
        // A panic unwinding through the scope drops pending notifications.
        if std::thread::panicking() {
            return;
        }
        trace!(nodes = touched.len(), "flushing transaction");
        for inner in touched.into_values() {
            let Some(inner) = inner.upgrade() else {
                continue;
            };
            let node = Node::from_inner(inner);
            let listeners = node.snapshot_listeners();
            if listeners.is_empty() {
                continue;
            }
            let snapshot = node.snapshot();
            for listener in listeners {
                listener(&snapshot);
            }
        }
    }
}

/// Runs `f` inside a transaction scope.
///
/// Snapshot listeners of nodes changed by `f` are notified once when the
/// outermost scope ends. Patch listeners and middleware are not deferred.
pub fn transaction<T>(f: impl FnOnce() -> T) -> T {
    let _guard = TransactionGuard::enter();
    f()
}

/// True while a transaction scope is open on this thread.
pub fn in_transaction() -> bool {
    STATE.with(|state| state.borrow().depth > 0)
}

/// Records `node` for snapshot notification at the end of the scope.
pub(crate) fn touch(node: &Node) {
    if !node.has_snapshot_listeners() {
        return;
    }
    let id = node.id();
    let weak = std::rc::Rc::downgrade(&node.0);
    STATE.with(|state| {
        state.borrow_mut().touched.entry(id).or_insert(weak);
    });
}
