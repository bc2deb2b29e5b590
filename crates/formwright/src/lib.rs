//! Formwright - form builder core
//!
//! Schema model, validation and derived-value evaluation for user-composed
//! forms, plus a pluggable store for saved form definitions.
//!
//! ## Architecture
//!
//! - **Domain Layer**: field/form aggregates, value objects, validator and
//!   derivation engine (with a closed formula language)
//! - **Application Layer**: the saved-form library
//! - **Ports Layer**: the `FormStore` persistence interface
//! - **Infrastructure Layer**: in-memory and JSON file stores
//!
//! ## Lifecycle
//!
//! A [`FormDraft`] is edited in the builder and turned into a [`Form`] on save.
//! The [`FormLibrary`] keeps saved forms and persists them through an injected
//! [`FormStore`]. Opening a saved form for filling creates a [`FillSession`],
//! which owns the values snapshot, validates edits and keeps derived fields
//! up to date.

#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;
pub mod telemetry;

// Re-exports for convenience
pub use application::FormLibrary;
pub use config::{FormsConfig, LogConfig, StorageBackend, StorageConfig};
pub use domain::aggregates::{
    DerivedField, Field, FillSession, Form, FormDraft, InputField, SessionState, SubmitOutcome,
};
pub use domain::services::derivation::{Clock, DerivationEngine, RecomputeOutcome};
pub use domain::services::formula::{Formula, FormulaError};
pub use domain::SessionEvent;
pub use domain::services::validator::{validate, validate_all, FieldErrors};
pub use domain::value_objects::{
    BuiltIn, FieldId, FieldValue, InputKind, PasswordRule, Snapshot, ValidationRules,
};
pub use error::{ConfigError, FormsError, Result, SchemaError, SessionError, StoreError};
pub use infrastructure::persistence::{JsonFileStore, MemoryFormStore};
pub use ports::outbound::FormStore;
