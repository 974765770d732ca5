//! Caller-supplied context inherited down the tree.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Opaque key/value context attached to a root node.
///
/// Values are stored type-erased and looked up by key and expected type.
/// Cloning is cheap; `with` copies the table on write.
#[derive(Clone, Default)]
pub struct Environment {
    entries: Rc<HashMap<String, Rc<dyn Any>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Any>(mut self, key: impl Into<String>, value: T) -> Self {
        Rc::make_mut(&mut self.entries).insert(key.into(), Rc::new(value));
        self
    }

    /// Returns the value under `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        self.entries.get(key).cloned()?.downcast::<T>().ok()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("Environment").field("keys", &keys).finish()
    }
}
