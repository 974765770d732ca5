//! Typed, observable state tree.
//!
//! Application state is a tree of typed [`Node`]s created from a
//! [`Factory`]. Every node has a path, produces structurally shared
//! [`Snapshot`]s, emits a [`Patch`] for each mutation and runs named actions
//! through a middleware chain.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use state_tree::{create_factory, on_patch, types, Factory};
//!
//! let todo = create_factory("Todo", json!({"title": "", "done": false})).unwrap();
//! let store = Factory::model("Store")
//!     .prop("todos", types::array(&todo))
//!     .build()
//!     .unwrap()
//!     .create(None, None)
//!     .unwrap();
//!
//! let _listener = on_patch(&store, |patch| println!("{}", serde_json::to_string(patch).unwrap()));
//! store.child("todos").unwrap().push(json!({"title": "milk"})).unwrap();
//! assert_eq!(store.snapshot(), json!({"todos": [{"title": "milk", "done": false}]}));
//! ```

pub mod action;
pub mod api;
pub mod app_state;
pub mod environment;
pub mod error;
pub mod node;
pub mod patch;
pub mod recorder;
pub mod snapshot;
pub mod transaction;
pub mod types;

pub use action::{is_running_action, ActionCall, Middleware, Next};
pub use api::{
    apply_action, apply_actions, apply_patch, apply_patches, apply_snapshot, clone, detach,
    get_from_environment, get_parent, get_path, get_path_parts, get_relative_path, get_root,
    get_snapshot, get_type, has_parent, is_root, on_action, on_patch, on_snapshot,
    record_actions, record_patches, resolve, try_resolve,
};
pub use app_state::{get_app_state, initialize_app_state, reset_app_state, AppState};
pub use environment::Environment;
pub use error::{
    MismatchReason, Result, StateError, StateTreeError, TypeMismatch, ValidationContext,
    ValidationError,
};
pub use node::{Disposer, Member, Node};
pub use patch::{Patch, PatchOp};
pub use recorder::{ActionRecorder, PatchRecorder};
pub use snapshot::Snapshot;
pub use state_tree_path::{escape_segment, unescape_segment, PathError};
pub use transaction::{in_transaction, transaction};
pub use types::{create_factory, Factory, ModelBuilder, Property, TypeKind};
