//! Application-wide state slot.
//!
//! [`AppState`] holds at most one root node. The free functions operate on
//! a slot scoped to the current thread; callers that want an explicit
//! context can own an [`AppState`] directly.

use std::cell::RefCell;

use serde_json::Value;
use tracing::debug;

use crate::environment::Environment;
use crate::error::{Result, StateError};
use crate::node::Node;
use crate::types::Factory;

#[derive(Debug, Default)]
pub struct AppState {
    slot: Option<Node>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the root node and stores it.
    ///
    /// # Errors
    ///
    /// [`StateError::AppStateAlreadyInitialized`] if a node is already
    /// stored, otherwise any creation error.
    pub fn initialize(
        &mut self,
        factory: &Factory,
        snapshot: Option<Value>,
        environment: Option<Environment>,
    ) -> Result<Node> {
        if self.slot.is_some() {
            return Err(StateError::AppStateAlreadyInitialized.into());
        }
        let node = factory.create(snapshot, environment)?;
        debug!(node = node.id(), type_name = %factory.name(), "initialized app state");
        self.slot = Some(node.clone());
        Ok(node)
    }

    pub fn get(&self) -> Result<Node> {
        self.slot
            .clone()
            .ok_or_else(|| StateError::AppStateUninitialized.into())
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    /// Clears the slot, returning the node that was stored.
    pub fn reset(&mut self) -> Option<Node> {
        let previous = self.slot.take();
        if previous.is_some() {
            debug!("reset app state");
        }
        previous
    }
}

thread_local! {
    static APP_STATE: RefCell<AppState> = RefCell::new(AppState::new());
}

/// Initializes this thread's app state.
pub fn initialize_app_state(
    factory: &Factory,
    snapshot: Option<Value>,
    environment: Option<Environment>,
) -> Result<Node> {
    APP_STATE.with(|state| state.borrow_mut().initialize(factory, snapshot, environment))
}

pub fn get_app_state() -> Result<Node> {
    APP_STATE.with(|state| state.borrow().get())
}

pub fn reset_app_state() -> Option<Node> {
    APP_STATE.with(|state| state.borrow_mut().reset())
}
