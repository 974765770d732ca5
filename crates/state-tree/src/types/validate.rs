//! Snapshot validation against type descriptors.
//!
//! Validation walks the value and the descriptor together and collects a
//! [`TypeMismatch`] for every problem, each addressed by the pointer path of
//! the offending field.

use std::fmt;

use serde_json::Value;
use state_tree_path::join_path;
use thiserror::Error;

use super::{Factory, TypeKind};
use crate::error::{Result, StateTreeError};
use crate::node::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchReason {
    WrongType,
    MissingField,
    UnknownField,
    Ambiguous {
        union: String,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeMismatch {
    /// Pointer path of the offending value, relative to the validated root.
    pub path: String,
    /// Signature of the expected type.
    pub expected: String,
    /// The offending value; `None` when a required field is missing.
    pub actual: Option<Value>,
    pub reason: MismatchReason,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.path.is_empty() { "/" } else { &self.path };
        match &self.reason {
            MismatchReason::WrongType => match &self.actual {
                Some(actual) => write!(f, "at '{at}': value {actual} is not a {}", self.expected),
                None => write!(f, "at '{at}': expected {}", self.expected),
            },
            MismatchReason::MissingField => {
                write!(f, "at '{at}': missing value of type {}", self.expected)
            }
            MismatchReason::UnknownField => write!(f, "at '{at}': field is not declared"),
            MismatchReason::Ambiguous { union, candidates } => write!(
                f,
                "at '{at}': ambiguous snapshot for union {union} ({})",
                candidates.join(" | ")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationContext {
    /// A default declared with `with_default`, checked at definition time.
    Default,
    /// A snapshot given at instantiation or mutation time.
    Snapshot,
}

impl ValidationContext {
    pub fn label(&self) -> &'static str {
        match self {
            ValidationContext::Default => "Default value",
            ValidationContext::Snapshot => "Snapshot",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{} {value} is not assignable to type {type_name}. Expected \"{signature}\"", .context.label())]
pub struct ValidationError {
    pub context: ValidationContext,
    pub value: Value,
    pub type_name: String,
    pub signature: String,
    pub mismatches: Vec<TypeMismatch>,
}

impl Factory {
    /// Collects every mismatch between `value` and this type.
    pub fn validate(&self, value: &Value) -> Vec<TypeMismatch> {
        let mut out = Vec::new();
        validate_at(self, value, &mut Vec::new(), &mut out);
        out
    }

    /// True when `value` is a valid snapshot of this type.
    ///
    /// For unions this applies the same resolution rule used at
    /// instantiation, so an ambiguous snapshot is not accepted.
    pub fn is(&self, value: &Value) -> bool {
        self.validate(value).is_empty()
    }

    /// True when the live node's current snapshot is valid for this type.
    pub fn is_instance(&self, node: &Node) -> bool {
        self.is(&node.snapshot().to_value())
    }

    /// Validates and converts the first problem into an error.
    ///
    /// Union ambiguity anywhere in the value is reported as
    /// [`StateTreeError::AmbiguousUnion`]; everything else as a
    /// [`ValidationError`].
    pub(crate) fn check(&self, value: &Value, context: ValidationContext) -> Result<()> {
        let mismatches = self.validate(value);
        if mismatches.is_empty() {
            return Ok(());
        }
        let ambiguity = mismatches.iter().find_map(|m| match &m.reason {
            MismatchReason::Ambiguous { union, candidates } => {
                Some((m.actual.clone(), union.clone(), candidates.clone()))
            }
            _ => None,
        });
        if let Some((snapshot, union, candidates)) = ambiguity {
            return Err(StateTreeError::AmbiguousUnion {
                snapshot: snapshot.unwrap_or(Value::Null),
                union,
                candidates,
            });
        }
        Err(ValidationError {
            context,
            value: value.clone(),
            type_name: self.name().to_string(),
            signature: self.describe(),
            mismatches,
        }
        .into())
    }
}

fn mismatch(
    path: &[String],
    ty: &Factory,
    actual: Option<&Value>,
    reason: MismatchReason,
) -> TypeMismatch {
    TypeMismatch {
        path: join_path(path),
        expected: ty.describe(),
        actual: actual.cloned(),
        reason,
    }
}

fn validate_at(ty: &Factory, value: &Value, path: &mut Vec<String>, out: &mut Vec<TypeMismatch>) {
    match ty.kind() {
        TypeKind::Primitive(primitive) => {
            if !primitive.accepts(value) {
                out.push(mismatch(path, ty, Some(value), MismatchReason::WrongType));
            }
        }
        TypeKind::WithDefault(inner, _) => validate_at(inner, value, path, out),
        TypeKind::Maybe(inner) => {
            if !value.is_null() {
                validate_at(inner, value, path, out);
            }
        }
        TypeKind::Object(shape) => {
            let Some(fields) = value.as_object() else {
                out.push(mismatch(path, ty, Some(value), MismatchReason::WrongType));
                return;
            };
            for (key, field_value) in fields {
                if !shape.contains(key) {
                    path.push(key.clone());
                    out.push(mismatch(path, ty, Some(field_value), MismatchReason::UnknownField));
                    path.pop();
                }
            }
            for (key, field_ty) in shape.fields() {
                path.push(key.clone());
                match fields.get(key) {
                    Some(field_value) => validate_at(field_ty, field_value, path, out),
                    None if field_ty.default_snapshot().is_none() => {
                        out.push(mismatch(path, field_ty, None, MismatchReason::MissingField));
                    }
                    None => {}
                }
                path.pop();
            }
        }
        TypeKind::Array(item) => {
            let Some(items) = value.as_array() else {
                out.push(mismatch(path, ty, Some(value), MismatchReason::WrongType));
                return;
            };
            for (index, element) in items.iter().enumerate() {
                path.push(index.to_string());
                validate_at(item, element, path, out);
                path.pop();
            }
        }
        TypeKind::Map(item) => {
            let Some(entries) = value.as_object() else {
                out.push(mismatch(path, ty, Some(value), MismatchReason::WrongType));
                return;
            };
            for (key, entry) in entries {
                path.push(key.clone());
                validate_at(item, entry, path, out);
                path.pop();
            }
        }
        TypeKind::Union(union) => match union.resolve(value) {
            Ok(variant) => validate_at(&variant, value, path, out),
            Err(candidates) => out.push(mismatch(
                path,
                ty,
                Some(value),
                MismatchReason::Ambiguous {
                    union: ty.name().to_string(),
                    candidates,
                },
            )),
        },
    }
}
