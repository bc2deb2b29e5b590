//! Aggregates module

pub mod draft;
pub mod field;
pub mod form;
pub mod session;

pub use draft::FormDraft;
pub use field::{DerivedField, Field, InputField};
pub use form::Form;
pub use session::{FillSession, SessionState, SubmitOutcome};
