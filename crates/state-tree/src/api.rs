//! Free-function surface over [`Node`].
//!
//! Each function takes the node it operates on as its first argument; most
//! forward to the method of the same name.

use std::any::Any;
use std::rc::Rc;

use serde_json::Value;
use state_tree_path::{join_path, PARENT_SEGMENT};
use tracing::debug;

use crate::action::{ActionCall, Next};
use crate::environment::Environment;
use crate::error::{Result, StateError};
use crate::node::{Disposer, Member, Node};
use crate::patch::Patch;
use crate::recorder::{ActionRecorder, PatchRecorder};
use crate::snapshot::Snapshot;
use crate::types::Factory;

// -------------------------------------------------------------------------
// Listeners

/// Registers a middleware for root actions invoked on `target` or any of
/// its descendants.
pub fn on_action<F>(target: &Node, middleware: F) -> Disposer
where
    F: Fn(&ActionCall, Next<'_>) -> Result<Value> + 'static,
{
    target.add_middleware(Rc::new(middleware))
}

/// Registers a listener for every patch emitted in `target`'s subtree,
/// with paths relative to `target`.
pub fn on_patch<F>(target: &Node, listener: F) -> Disposer
where
    F: Fn(&Patch) + 'static,
{
    target.add_patch_listener(Rc::new(listener))
}

/// Registers a listener called once per transaction that changed
/// `target`'s subtree, with the snapshot at the end of the transaction.
pub fn on_snapshot<F>(target: &Node, listener: F) -> Disposer
where
    F: Fn(&Snapshot) + 'static,
{
    target.add_snapshot_listener(Rc::new(listener))
}

// -------------------------------------------------------------------------
// Operations

pub fn apply_patch(target: &Node, patch: &Patch) -> Result<()> {
    target.apply_patch(patch)
}

pub fn apply_patches(target: &Node, patches: &[Patch]) -> Result<()> {
    target.apply_patches(patches)
}

pub fn apply_action(target: &Node, call: &ActionCall) -> Result<Value> {
    target.apply_action(call)
}

pub fn apply_actions(target: &Node, calls: &[ActionCall]) -> Result<()> {
    target.apply_actions(calls)
}

pub fn apply_snapshot(target: &Node, snapshot: &Value) -> Result<()> {
    target.apply_snapshot(snapshot)
}

pub fn get_snapshot(target: &Node) -> Snapshot {
    target.snapshot()
}

pub fn record_patches(subject: &Node) -> PatchRecorder {
    PatchRecorder::start(subject)
}

pub fn record_actions(subject: &Node) -> ActionRecorder {
    ActionRecorder::start(subject)
}

// -------------------------------------------------------------------------
// Navigation

/// With `strict`, a node without a parent is an error rather than `false`.
pub fn has_parent(target: &Node, strict: bool) -> Result<bool> {
    get_parent(target, strict).map(|parent| parent.is_some())
}

/// With `strict`, a node without a parent is an error rather than `None`.
pub fn get_parent(target: &Node, strict: bool) -> Result<Option<Node>> {
    match target.parent() {
        Some(parent) => Ok(Some(parent)),
        None if strict => Err(StateError::NoParent.into()),
        None => Ok(None),
    }
}

pub fn get_root(target: &Node) -> Node {
    target.root()
}

pub fn get_path(target: &Node) -> String {
    target.path()
}

pub fn get_path_parts(target: &Node) -> Vec<String> {
    target.path_parts()
}

pub fn is_root(target: &Node) -> bool {
    target.is_root()
}

pub fn get_type(target: &Node) -> Factory {
    target.factory()
}

/// The path that leads from `base` to `target`, using `..` to step up.
///
/// # Errors
///
/// [`StateError::DifferentTrees`] when the nodes have different roots.
pub fn get_relative_path(base: &Node, target: &Node) -> Result<String> {
    if !base.root().ptr_eq(&target.root()) {
        return Err(StateError::DifferentTrees.into());
    }
    let from = base.path_parts();
    let to = target.path_parts();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let down = join_path(&to[common..]);
    if from.len() == common {
        return Ok(down);
    }
    let up = vec![PARENT_SEGMENT; from.len() - common].join("/");
    Ok(format!("{up}{down}"))
}

pub fn resolve(target: &Node, path: &str) -> Result<Member> {
    target.resolve(path)
}

pub fn try_resolve(target: &Node, path: &str) -> Option<Member> {
    target.try_resolve(path)
}

/// Looks `key` up in the nearest environment above (or on) `target`.
pub fn get_from_environment<T: Any>(target: &Node, key: &str) -> Option<Rc<T>> {
    target.environment()?.get::<T>(key)
}

// -------------------------------------------------------------------------
// Structure

/// Creates an independent copy of `source` from its snapshot.
///
/// Without an explicit environment the copy shares the source's effective
/// environment.
pub fn clone(source: &Node, environment: Option<Environment>) -> Result<Node> {
    let environment = environment.or_else(|| source.environment());
    source
        .factory()
        .create(Some(source.snapshot().to_value()), environment)
}

/// Removes `target` from its container and returns it as a new root.
///
/// Array elements and map entries are removed; an object field is set to
/// `null`, which requires its type to accept `null`. A root is returned
/// unchanged.
pub fn detach(target: &Node) -> Result<Node> {
    let Some(parent) = target.parent() else {
        return Ok(target.clone());
    };
    let subpath = target.subpath();
    debug!(node = target.id(), from = %target.path(), "detaching node");
    parent.remove(&subpath)?;
    Ok(target.clone())
}
