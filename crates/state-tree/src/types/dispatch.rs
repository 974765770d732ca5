//! Union variant resolution.
//!
//! With a dispatcher the dispatcher's choice is final. Without one, the
//! candidates are the variants (in declaration order) that accept the
//! snapshot: for object variants that means every snapshot key is a
//! declared field, every present value validates, and every absent field
//! has a default. Exactly one candidate resolves; zero or several is an
//! ambiguity the caller reports.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::Factory;

/// Picks the union variant for a snapshot.
pub type Dispatcher = Rc<dyn Fn(&Value) -> Factory>;

#[derive(Clone)]
pub struct UnionType {
    variants: Vec<Factory>,
    dispatcher: Option<Dispatcher>,
}

impl UnionType {
    pub fn new(variants: Vec<Factory>, dispatcher: Option<Dispatcher>) -> Self {
        Self {
            variants,
            dispatcher,
        }
    }

    pub fn variants(&self) -> &[Factory] {
        &self.variants
    }

    pub(crate) fn default_name(&self) -> String {
        self.variants
            .iter()
            .map(|v| v.name().to_string())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Resolves the variant for `snapshot`.
    ///
    /// On ambiguity returns the candidate names: the matching variants when
    /// several match, every declared variant when none does.
    pub fn resolve(&self, snapshot: &Value) -> Result<Factory, Vec<String>> {
        if let Some(dispatcher) = &self.dispatcher {
            return Ok(dispatcher(snapshot));
        }
        let mut matching = self.variants.iter().filter(|variant| variant.is(snapshot));
        match (matching.next(), matching.next()) {
            (Some(only), None) => Ok(only.clone()),
            (Some(first), Some(second)) => {
                let mut names = vec![first.name().to_string(), second.name().to_string()];
                names.extend(matching.map(|v| v.name().to_string()));
                Err(names)
            }
            (None, _) => Err(self
                .variants
                .iter()
                .map(|v| v.name().to_string())
                .collect()),
        }
    }
}

impl fmt::Debug for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionType")
            .field("variants", &self.variants)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}
