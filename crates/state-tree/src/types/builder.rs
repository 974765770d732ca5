//! Object type declaration.
//!
//! A model is declared either from a JSON object of defaults
//! ([`create_factory`]) or field by field with a [`ModelBuilder`], which also
//! accepts explicit field types and named actions.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::{boolean, number, string, with_default, ActionFn, Factory, ObjectShape, TypeKind};
use crate::error::{Result, StateError};
use crate::node::Node;

/// Name given to object types inferred from nested defaults.
const ANONYMOUS_MODEL: &str = "AnonymousModel";

/// A field declaration: either a default to infer the type from, or a type.
#[derive(Debug, Clone)]
pub enum Property {
    Default(Value),
    Type(Factory),
}

impl From<Factory> for Property {
    fn from(ty: Factory) -> Self {
        Property::Type(ty)
    }
}

impl From<&Factory> for Property {
    fn from(ty: &Factory) -> Self {
        Property::Type(ty.clone())
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Default(value)
    }
}

macro_rules! property_from_default {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Property {
                fn from(value: $ty) -> Self {
                    Property::Default(Value::from(value))
                }
            }
        )*
    };
}

property_from_default!(i32, i64, u32, u64, f64, bool, &str, String);

pub struct ModelBuilder {
    name: String,
    props: Vec<(String, Property)>,
    actions: IndexMap<String, ActionFn>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Vec::new(),
            actions: IndexMap::new(),
        }
    }

    /// Declares a field. Redeclaring a field replaces it in place.
    pub fn prop(mut self, key: impl Into<String>, property: impl Into<Property>) -> Self {
        let key = key.into();
        let property = property.into();
        match self.props.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = property,
            None => self.props.push((key, property)),
        }
        self
    }

    /// Declares a named action. Actions run with the node they were
    /// invoked on and the call arguments.
    pub fn action<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Node, &[Value]) -> Result<Value> + 'static,
    {
        self.actions.insert(name.into(), Rc::new(f));
        self
    }

    /// # Errors
    ///
    /// Fails when a default cannot be inferred into a type (`null` and
    /// arrays) or when an inferred default does not validate.
    pub fn build(self) -> Result<Factory> {
        let mut shape = ObjectShape::new();
        for (key, property) in self.props {
            let ty = match property {
                Property::Type(ty) => ty,
                Property::Default(value) => infer(&key, value)?,
            };
            shape = shape.field(key, ty);
        }
        Ok(Factory::with_actions(
            self.name,
            TypeKind::Object(shape),
            self.actions,
        ))
    }
}

/// Declares an object type whose fields are inferred from `defaults`.
///
/// Primitive values become fields of that primitive type defaulting to the
/// value; nested objects become nested anonymous models.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use state_tree::create_factory;
///
/// let todo = create_factory("Todo", json!({"title": "", "done": false})).unwrap();
/// assert_eq!(todo.describe(), "{ title: string; done: boolean }");
/// ```
pub fn create_factory(name: impl Into<String>, defaults: Value) -> Result<Factory> {
    let name = name.into();
    let fields = match defaults {
        Value::Object(fields) => fields,
        other => {
            return Err(StateError::CannotInferType {
                key: name,
                value: other.to_string(),
            }
            .into())
        }
    };
    fields
        .into_iter()
        .fold(ModelBuilder::new(name), |builder, (key, value)| {
            builder.prop(key, value)
        })
        .build()
}

fn infer(key: &str, value: Value) -> Result<Factory> {
    let primitive = match &value {
        Value::String(_) => string(),
        Value::Number(_) => number(),
        Value::Bool(_) => boolean(),
        Value::Object(_) => return create_factory(ANONYMOUS_MODEL, value),
        Value::Null | Value::Array(_) => {
            return Err(StateError::CannotInferType {
                key: key.to_string(),
                value: value.to_string(),
            }
            .into())
        }
    };
    with_default(&primitive, value)
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
