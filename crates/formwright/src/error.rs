//! Error types for Formwright
//!
//! Validation failures are data (`Vec<String>` per field) and formula failures
//! are swallowed by the derivation engine, so neither appears here as a
//! top-level variant.

use thiserror::Error;

use crate::domain::value_objects::FieldId;

/// Builder edits that would break a schema invariant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No field with this id in the draft
    #[error("field not found: {0}")]
    UnknownField(FieldId),

    /// A derived field listed itself as a parent
    #[error("derived field {0} cannot depend on itself")]
    SelfReference(FieldId),

    /// A derived field listed a parent that is not in the form
    #[error("derived field {field} references unknown parent {parent}")]
    UnknownParent { field: FieldId, parent: FieldId },

    /// Choice fields need at least one option
    #[error("field {0} needs at least one option")]
    MissingOptions(FieldId),

    /// Option edits only apply to select, radio and checkbox fields
    #[error("field {0} has no options")]
    NotAChoice(FieldId),

    /// Option index out of range
    #[error("field {field} has no option at index {index}")]
    OptionOutOfRange { field: FieldId, index: usize },

    /// Two fields share an id
    #[error("duplicate field id: {0}")]
    DuplicateId(FieldId),

    /// A persisted record mixes input and derived attributes
    #[error("malformed field record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}

/// Edits and submits refused by a filling session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No field with this id in the form
    #[error("field not found: {0}")]
    UnknownField(FieldId),

    /// Derived values are computed, never entered
    #[error("field {0} is derived and read-only")]
    ReadOnlyField(FieldId),

    /// Option toggling only applies to checkbox fields
    #[error("field {0} is not a checkbox")]
    NotACheckbox(FieldId),

    /// The form was already accepted
    #[error("session already accepted")]
    Closed,
}

/// Form store read/write failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted collection could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused a write larger than its quota
    #[error("storage quota exceeded: {needed} bytes needed, {quota} available")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Telemetry could not be installed
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum FormsError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for Formwright
pub type Result<T> = std::result::Result<T, FormsError>;
