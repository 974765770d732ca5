//! Patch and action recorders.
//!
//! A recorder subscribes to its subject when created and keeps every event
//! until stopped. Replaying applies the recorded events in order, inside one
//! transaction, to any node of the same shape; a replay that fails part way
//! leaves the target as it was.

use std::cell::RefCell;
use std::rc::Rc;

use crate::action::{ActionCall, Next};
use crate::error::Result;
use crate::node::{Disposer, Node};
use crate::patch::Patch;

#[derive(Debug)]
pub struct PatchRecorder {
    patches: Rc<RefCell<Vec<Patch>>>,
    disposer: Option<Disposer>,
}

impl PatchRecorder {
    pub(crate) fn start(subject: &Node) -> Self {
        let patches = Rc::new(RefCell::new(Vec::new()));
        let sink = patches.clone();
        let disposer = subject.add_patch_listener(Rc::new(move |patch: &Patch| {
            sink.borrow_mut().push(patch.clone());
        }));
        Self {
            patches,
            disposer: Some(disposer),
        }
    }

    /// Patches recorded so far, relative to the subject.
    pub fn patches(&self) -> Vec<Patch> {
        self.patches.borrow().clone()
    }

    pub fn is_recording(&self) -> bool {
        self.disposer.is_some()
    }

    /// Stops recording; what was recorded is kept.
    pub fn stop(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            let _ = disposer.dispose();
        }
    }

    pub fn replay(&self, target: &Node) -> Result<()> {
        let patches = self.patches();
        target.apply_patches(&patches)
    }
}

#[derive(Debug)]
pub struct ActionRecorder {
    actions: Rc<RefCell<Vec<ActionCall>>>,
    disposer: Option<Disposer>,
}

impl ActionRecorder {
    pub(crate) fn start(subject: &Node) -> Self {
        let actions = Rc::new(RefCell::new(Vec::new()));
        let sink = actions.clone();
        let disposer = subject.add_middleware(Rc::new(move |call: &ActionCall, next: Next<'_>| {
            sink.borrow_mut().push(call.clone());
            next.call()
        }));
        Self {
            actions,
            disposer: Some(disposer),
        }
    }

    /// Root actions recorded so far, with paths relative to the subject.
    pub fn actions(&self) -> Vec<ActionCall> {
        self.actions.borrow().clone()
    }

    pub fn is_recording(&self) -> bool {
        self.disposer.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            let _ = disposer.dispose();
        }
    }

    pub fn replay(&self, target: &Node) -> Result<()> {
        target.apply_actions(&self.actions())
    }
}
