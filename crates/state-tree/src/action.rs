//! Named actions and the middleware chain around them.
//!
//! An action invoked while no other action is running on this thread is a
//! root action: it passes through the middleware registered on the target
//! node and then on each ancestor up to the root, every middleware seeing
//! the call with a path relative to the node it was registered on. Actions
//! invoked from inside another action run directly.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use state_tree_path::prefix_path;
use tracing::{debug, trace};

use crate::error::{Result, StateError};
use crate::node::Node;
use crate::transaction::transaction;
use crate::types::ActionFn;

/// A serializable action invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    pub name: String,
    /// Path of the node to invoke the action on, relative to the node the
    /// call is applied to.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl ActionCall {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            path: String::new(),
            args,
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Intercepts root actions. Call [`Next::call`] to continue down the chain;
/// returning without calling it prevents the action from running.
pub type Middleware = Rc<dyn Fn(&ActionCall, Next<'_>) -> Result<Value>>;

/// The rest of a middleware chain.
pub struct Next<'a> {
    chain: &'a [(ActionCall, Middleware)],
    terminal: &'a dyn Fn() -> Result<Value>,
}

impl Next<'_> {
    pub fn call(self) -> Result<Value> {
        match self.chain.split_first() {
            Some(((call, middleware), rest)) => middleware(
                call,
                Next {
                    chain: rest,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(),
        }
    }
}

// -------------------------------------------------------------------------
// Action frames

thread_local! {
    static ACTION_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct ActionFrame;

impl ActionFrame {
    fn enter() -> Self {
        ACTION_DEPTH.with(|depth| depth.set(depth.get() + 1));
        ActionFrame
    }
}

impl Drop for ActionFrame {
    fn drop(&mut self) {
        ACTION_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// True while an action body is executing on this thread.
pub fn is_running_action() -> bool {
    ACTION_DEPTH.with(|depth| depth.get() > 0)
}

// -------------------------------------------------------------------------
// Dispatch

impl Node {
    /// Invokes the named action of this node's type.
    ///
    /// # Errors
    ///
    /// [`StateError::UnknownAction`] when the type declares no such action,
    /// otherwise whatever the action or a middleware returns.
    pub fn call_action(&self, name: &str, args: &[Value]) -> Result<Value> {
        let factory = self.factory();
        let action = factory.action(name).ok_or_else(|| StateError::UnknownAction {
            type_name: factory.name().to_string(),
            name: name.to_string(),
        })?;
        if is_running_action() {
            trace!(node = self.id(), action = name, "nested action");
            return self.run_action(&action, args);
        }

        let chain = self.middleware_chain(ActionCall::new(name, args.to_vec()));
        debug!(
            node = self.id(),
            action = name,
            middleware = chain.len(),
            "dispatching root action"
        );
        let ran = Cell::new(false);
        let terminal = || {
            ran.set(true);
            self.run_action(&action, args)
        };
        let result = transaction(|| {
            Next {
                chain: &chain,
                terminal: &terminal,
            }
            .call()
        });
        if !ran.get() {
            debug!(node = self.id(), action = name, "action short-circuited by middleware");
        }
        result
    }

    /// Resolves `call.path` from this node and invokes the action there.
    pub fn apply_action(&self, call: &ActionCall) -> Result<Value> {
        let target = self
            .resolve(&call.path)?
            .into_node()
            .ok_or_else(|| StateError::NotANode {
                path: call.path.clone(),
            })?;
        target.call_action(&call.name, &call.args)
    }

    /// Applies `calls` in order inside one transaction, all or nothing.
    ///
    /// Actions run arbitrary code, so the batch cannot be checked up front.
    /// When a call fails, this node is restored to its snapshot from before
    /// the batch; listeners see the restoring patches.
    pub fn apply_actions(&self, calls: &[ActionCall]) -> Result<()> {
        let before = self.snapshot();
        transaction(|| {
            let result = calls
                .iter()
                .try_for_each(|call| self.apply_action(call).map(|_| ()));
            if result.is_err() {
                debug!(node = self.id(), calls = calls.len(), "rolling back action batch");
                self.apply_snapshot(&before.to_value())?;
            }
            result
        })
    }

    fn run_action(&self, action: &ActionFn, args: &[Value]) -> Result<Value> {
        let _frame = ActionFrame::enter();
        transaction(|| action(self, args))
    }

    /// Middleware of this node in registration order, then of each
    /// ancestor, each paired with the call as seen from its node.
    fn middleware_chain(&self, mut call: ActionCall) -> Vec<(ActionCall, Middleware)> {
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            for middleware in node.middleware() {
                chain.push((call.clone(), middleware));
            }
            current = node.parent();
            if current.is_some() {
                call.path = prefix_path(&node.subpath(), &call.path);
            }
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateTreeError;
    use crate::types::{self, Factory};
    use serde_json::json;
    use std::cell::RefCell;

    fn counter() -> Factory {
        Factory::model("Counter")
            .prop("count", 0)
            .action("increment", |node, args| {
                let by = args.first().and_then(Value::as_i64).unwrap_or(1);
                let count = node.get_value("count").and_then(|v| v.as_i64()).unwrap_or(0);
                node.set("count", json!(count + by))?;
                Ok(json!(count + by))
            })
            .action("twice", |node, _| {
                node.call_action("increment", &[])?;
                node.call_action("increment", &[])
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_action_call_wire_defaults() {
        let call: ActionCall = serde_json::from_value(json!({"name": "increment"})).unwrap();
        assert_eq!(call, ActionCall::new("increment", vec![]));
        let call = ActionCall::new("increment", vec![json!(2)]).at("/counters/0");
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({"name": "increment", "path": "/counters/0", "args": [2]})
        );
    }

    #[test]
    fn test_unknown_action() {
        let node = counter().create(None, None).unwrap();
        let err = node.call_action("decrement", &[]).unwrap_err();
        assert_eq!(
            err,
            StateTreeError::State(StateError::UnknownAction {
                type_name: "Counter".to_string(),
                name: "decrement".to_string()
            })
        );
    }

    #[test]
    fn test_nested_actions_bypass_middleware() {
        let node = counter().create(None, None).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let _ = node.add_middleware(Rc::new(move |call: &ActionCall, next: Next<'_>| {
            log.borrow_mut().push(call.name.clone());
            next.call()
        }));
        assert_eq!(node.call_action("twice", &[]).unwrap(), json!(2));
        assert_eq!(*seen.borrow(), vec!["twice"]);
        assert!(!is_running_action());
    }

    #[test]
    fn test_ancestor_middleware_sees_relative_path() {
        let list = types::array(&counter())
            .create(Some(json!([{}, {"count": 5}])), None)
            .unwrap();
        let paths = Rc::new(RefCell::new(Vec::new()));
        let log = paths.clone();
        let _ = list.add_middleware(Rc::new(move |call: &ActionCall, next: Next<'_>| {
            log.borrow_mut().push(call.path.clone());
            next.call()
        }));
        let second = list.child("1").unwrap();
        assert_eq!(second.call_action("increment", &[json!(2)]).unwrap(), json!(7));
        assert_eq!(*paths.borrow(), vec!["/1"]);
    }

    #[test]
    fn test_middleware_order_and_short_circuit() {
        let node = counter().create(None, None).unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = order.clone();
        let _ = node.add_middleware(Rc::new(move |_: &ActionCall, next: Next<'_>| {
            first.borrow_mut().push("outer");
            next.call()
        }));
        let second = order.clone();
        let _ = node.add_middleware(Rc::new(move |_: &ActionCall, _next: Next<'_>| {
            second.borrow_mut().push("blocker");
            Ok(json!("blocked"))
        }));
        assert_eq!(node.call_action("increment", &[]).unwrap(), json!("blocked"));
        assert_eq!(*order.borrow(), vec!["outer", "blocker"]);
        assert_eq!(node.get_value("count"), Some(json!(0)));
    }

    #[test]
    fn test_failed_action_batch_is_rolled_back() {
        let node = counter().create(None, None).unwrap();
        let err = node
            .apply_actions(&[
                ActionCall::new("increment", vec![json!(3)]),
                ActionCall::new("decrement", vec![]),
            ])
            .unwrap_err();
        assert!(matches!(err, StateTreeError::State(StateError::UnknownAction { .. })));
        assert_eq!(node.get_value("count"), Some(json!(0)));
        node.apply_actions(&[ActionCall::new("increment", vec![json!(3)])]).unwrap();
        assert_eq!(node.get_value("count"), Some(json!(3)));
    }
}
