//! Value Objects module
//!
//! Immutable domain primitives shared by the schema model, the validator and
//! the derivation engine.

pub mod field_value;
pub mod kind;
pub mod rules;
pub mod snapshot;

pub use field_value::FieldValue;
pub use kind::{BuiltIn, InputKind};
pub use rules::{PasswordRule, ValidationRules};
pub use snapshot::Snapshot;

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Field identifier, generated once at field creation and never reassigned
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    /// Generate a fresh random id.
    ///
    /// The `f` prefix keeps every generated id a valid formula identifier.
    pub fn generate() -> Self {
        Self(format!("f{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FieldId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FieldId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(id: &str) -> Self {
        Self::from_string(id)
    }
}
