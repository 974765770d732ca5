//! Error taxonomy for the state tree.
//!
//! Every fallible operation returns [`StateTreeError`]. Validation and union
//! resolution happen before any mutation takes effect, so an error always
//! means the tree was left untouched by the failing operation.

use serde_json::Value;
use state_tree_path::PathError;
use thiserror::Error;

pub use crate::types::validate::{MismatchReason, TypeMismatch, ValidationContext, ValidationError};

pub type Result<T, E = StateTreeError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateTreeError {
    /// A snapshot or default value does not match its type.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A union snapshot matched zero or several variants and the union has
    /// no dispatcher.
    #[error(
        "Ambiguous snapshot {snapshot} for union {union}, candidates: {}. Please provide a dispatch in the union declaration.",
        .candidates.join(" | ")
    )]
    AmbiguousUnion {
        snapshot: Value,
        union: String,
        candidates: Vec<String>,
    },
    /// A path segment could not be found during resolution.
    #[error("Could not resolve '{segment}' in '{path}'")]
    PathResolution { segment: String, path: String },
    /// A structural invariant of the tree would be violated.
    #[error(transparent)]
    State(#[from] StateError),
    /// A path string is malformed.
    #[error(transparent)]
    Path(#[from] PathError),
    /// Raised by user code running inside an action or middleware.
    #[error("{0}")]
    Action(String),
}

impl StateTreeError {
    /// Builds an error for an action or middleware to return.
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Cannot attach node of type {type_name}: it is already attached at '{path}'")]
    AlreadyAttached { type_name: String, path: String },
    #[error("Cannot attach a node inside its own subtree")]
    AttachToOwnSubtree,
    #[error("Key '{key}' does not exist at '{path}'")]
    MissingKey { path: String, key: String },
    #[error("Index '{index}' is out of bounds at '{path}' (length {len})")]
    IndexOutOfBounds {
        path: String,
        index: String,
        len: usize,
    },
    #[error("Type {type_name} has no field '{key}'")]
    InvalidKey { type_name: String, key: String },
    #[error("Field '{key}' of type {type_name} does not accept null and cannot be removed")]
    FieldNotRemovable { type_name: String, key: String },
    #[error("Type {type_name} has no action named '{name}'")]
    UnknownAction { type_name: String, name: String },
    #[error("Value at '{path}' is not a node")]
    NotANode { path: String },
    #[error("Node has no parent")]
    NoParent,
    #[error("Nodes do not belong to the same tree")]
    DifferentTrees,
    #[error("Type {type_name} cannot be instantiated as a node")]
    NotInstantiable { type_name: String },
    #[error("Cannot apply '{op}' to the root of a node")]
    InvalidRootPatch { op: String },
    #[error("Cannot infer a type for field '{key}' from default value {value}")]
    CannotInferType { key: String, value: String },
    #[error("App state is already initialized")]
    AppStateAlreadyInitialized,
    #[error("App state is not initialized")]
    AppStateUninitialized,
}
