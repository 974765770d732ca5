//! Type descriptors and factories.
//!
//! A [`Factory`] binds one [`TypeKind`] to a display name (and, for object
//! shapes, a table of named actions). Every kind can validate an arbitrary
//! JSON snapshot and, for the composite kinds, instantiate a live
//! [`Node`](crate::node::Node) from a valid one.
//!
//! | kind | snapshot | signature |
//! |---|---|---|
//! | `Primitive` | string, number or boolean | `string` |
//! | `Object` | object with declared fields | `{ a: number; b: string }` |
//! | `Array` | array of the element type | `T[]` |
//! | `Map` | object of the value type | `Map<string, T>` |
//! | `Union` | whichever variant resolves | `A \| B` |
//! | `WithDefault` | inner type, may be omitted | inner signature |
//! | `Maybe` | inner type or `null` | `T \| null` |

pub mod builder;
pub mod dispatch;
pub mod validate;

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::error::Result;
use crate::node::Node;

pub use builder::{create_factory, ModelBuilder, Property};
pub use dispatch::{Dispatcher, UnionType};
pub use validate::{MismatchReason, TypeMismatch, ValidationContext, ValidationError};

/// A named action: receives the node it runs on and the call arguments.
pub type ActionFn = Rc<dyn Fn(&Node, &[Value]) -> Result<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Number,
    Boolean,
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Primitive::String => value.is_string(),
            Primitive::Number => value.is_number(),
            Primitive::Boolean => value.is_boolean(),
        }
    }
}

/// Ordered field declarations of an object type.
#[derive(Clone, Default)]
pub struct ObjectShape {
    fields: IndexMap<String, Factory>,
}

impl ObjectShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, ty: Factory) -> Self {
        self.fields.insert(key.into(), ty);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Factory> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Factory)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Clone)]
pub enum TypeKind {
    Primitive(Primitive),
    Object(ObjectShape),
    Array(Factory),
    Map(Factory),
    Union(UnionType),
    WithDefault(Factory, Value),
    Maybe(Factory),
}

struct FactoryInner {
    name: String,
    kind: TypeKind,
    actions: IndexMap<String, ActionFn>,
}

/// Cheap-to-clone handle to a type descriptor.
#[derive(Clone)]
pub struct Factory(Rc<FactoryInner>);

impl Factory {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self::with_actions(name, kind, IndexMap::new())
    }

    pub(crate) fn with_actions(
        name: impl Into<String>,
        kind: TypeKind,
        actions: IndexMap<String, ActionFn>,
    ) -> Self {
        Self(Rc::new(FactoryInner {
            name: name.into(),
            kind,
            actions,
        }))
    }

    /// Starts declaring an object type.
    pub fn model(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    pub fn action(&self, name: &str) -> Option<ActionFn> {
        self.0.actions.get(name).cloned()
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.0.actions.keys().map(String::as_str)
    }

    pub fn ptr_eq(&self, other: &Factory) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Object, array and map types instantiate into nodes.
    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::Object(_) | TypeKind::Array(_) | TypeKind::Map(_)
        )
    }

    /// Snapshot used when a value of this type is omitted, if any.
    ///
    /// Objects have one when every field has one; arrays and maps default
    /// to empty containers.
    pub fn default_snapshot(&self) -> Option<Value> {
        match self.kind() {
            TypeKind::Primitive(_) | TypeKind::Union(_) => None,
            TypeKind::WithDefault(_, default) => Some(default.clone()),
            TypeKind::Maybe(_) => Some(Value::Null),
            TypeKind::Array(_) => Some(json!([])),
            TypeKind::Map(_) => Some(json!({})),
            TypeKind::Object(shape) => shape
                .fields()
                .all(|(_, field)| field.default_snapshot().is_some())
                .then(|| json!({})),
        }
    }

    /// The composite type a valid `snapshot` of this type instantiates as.
    ///
    /// Unwraps defaults, `maybe` and unions; `None` for primitive values.
    pub fn concrete_for(&self, snapshot: &Value) -> Option<Factory> {
        match self.kind() {
            TypeKind::Object(_) | TypeKind::Array(_) | TypeKind::Map(_) => Some(self.clone()),
            TypeKind::Primitive(_) => None,
            TypeKind::WithDefault(inner, _) => inner.concrete_for(snapshot),
            TypeKind::Maybe(inner) => {
                if snapshot.is_null() {
                    None
                } else {
                    inner.concrete_for(snapshot)
                }
            }
            TypeKind::Union(union) => union.resolve(snapshot).ok()?.concrete_for(snapshot),
        }
    }

    /// Renders the structural signature used in error messages.
    pub fn describe(&self) -> String {
        match self.kind() {
            TypeKind::Primitive(p) => p.name().to_string(),
            TypeKind::Object(shape) if shape.is_empty() => "{}".to_string(),
            TypeKind::Object(shape) => {
                let fields: Vec<String> = shape
                    .fields()
                    .map(|(key, ty)| format!("{key}: {}", ty.describe()))
                    .collect();
                format!("{{ {} }}", fields.join("; "))
            }
            TypeKind::Array(item) if item.is_alternative() => format!("({})[]", item.describe()),
            TypeKind::Array(item) => format!("{}[]", item.describe()),
            TypeKind::Map(item) => format!("Map<string, {}>", item.describe()),
            TypeKind::Union(union) => union
                .variants()
                .iter()
                .map(Factory::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeKind::WithDefault(inner, _) => inner.describe(),
            TypeKind::Maybe(inner) => format!("{} | null", inner.describe()),
        }
    }

    fn is_alternative(&self) -> bool {
        match self.kind() {
            TypeKind::Union(_) | TypeKind::Maybe(_) => true,
            TypeKind::WithDefault(inner, _) => inner.is_alternative(),
            _ => false,
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Factory").field(&self.name()).finish()
    }
}

impl fmt::Display for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -------------------------------------------------------------------------
// Constructors

pub fn string() -> Factory {
    Factory::new("string", TypeKind::Primitive(Primitive::String))
}

pub fn number() -> Factory {
    Factory::new("number", TypeKind::Primitive(Primitive::Number))
}

pub fn boolean() -> Factory {
    Factory::new("boolean", TypeKind::Primitive(Primitive::Boolean))
}

pub fn array(item: &Factory) -> Factory {
    Factory::new(format!("{}[]", item.name()), TypeKind::Array(item.clone()))
}

pub fn map(item: &Factory) -> Factory {
    Factory::new(
        format!("Map<string, {}>", item.name()),
        TypeKind::Map(item.clone()),
    )
}

pub fn maybe(inner: &Factory) -> Factory {
    Factory::new(
        format!("{} | null", inner.name()),
        TypeKind::Maybe(inner.clone()),
    )
}

/// Wraps `inner` so that omitted values take `default`.
///
/// # Errors
///
/// The default is checked here, at definition time; an invalid one fails
/// with `Default value <json> is not assignable to type <name>. Expected "<signature>"`.
pub fn with_default(inner: &Factory, default: Value) -> Result<Factory> {
    inner.check(&default, ValidationContext::Default)?;
    Ok(Factory::new(
        inner.name(),
        TypeKind::WithDefault(inner.clone(), default),
    ))
}

/// Union resolved by which variant accepts the snapshot.
pub fn union(variants: &[Factory]) -> Factory {
    let union = UnionType::new(variants.to_vec(), None);
    Factory::new(union.default_name(), TypeKind::Union(union))
}

/// Union resolved by an explicit dispatcher.
pub fn union_with_dispatcher<F>(dispatcher: F, variants: &[Factory]) -> Factory
where
    F: Fn(&Value) -> Factory + 'static,
{
    let union = UnionType::new(variants.to_vec(), Some(Rc::new(dispatcher)));
    Factory::new(union.default_name(), TypeKind::Union(union))
}
