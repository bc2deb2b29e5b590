//! Filling Session
//!
//! Runtime state of one saved form being filled in. The session owns the
//! values snapshot and replaces it on every edit, then brings derived fields
//! up to date before returning.
//!
//! ```text
//! Initializing -> Ready -> (Editing <-> Ready) -> Submitting -> Accepted
//!                                                           \-> Rejected -> Editing ...
//! ```

use chrono::Utc;

use super::field::Field;
use super::form::Form;
use crate::domain::events::SessionEvent;
use crate::domain::services::derivation::DerivationEngine;
use crate::domain::services::validator::{self, FieldErrors};
use crate::domain::value_objects::{FieldId, FieldValue, InputKind, Snapshot};
use crate::error::SessionError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Initializing,
    Ready,
    Editing,
    Submitting,
    /// Terminal
    Accepted,
    /// Not terminal, the user may edit and resubmit
    Rejected,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(FieldErrors),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Debug)]
pub struct FillSession {
    form: Form,
    engine: DerivationEngine,
    snapshot: Snapshot,
    errors: FieldErrors,
    state: SessionState,
    events: Vec<SessionEvent>,
}

impl FillSession {
    /// Start filling `form`: seed the snapshot with defaults and compute
    /// derived values once.
    pub fn open(form: Form, engine: DerivationEngine) -> Self {
        let initial: Snapshot = form
            .fields
            .iter()
            .map(|field| {
                let value = match field {
                    Field::Input(input) => input.initial_value(),
                    Field::Derived(_) => FieldValue::Empty,
                };
                (field.id().clone(), value)
            })
            .collect();

        let mut session = Self {
            form,
            engine,
            snapshot: Snapshot::new(),
            errors: FieldErrors::default(),
            state: SessionState::Initializing,
            events: Vec::new(),
        };

        let outcome = session
            .engine
            .recompute_all_traced(session.form.derived_fields(), &initial);
        session.snapshot = outcome.snapshot;
        session.state = SessionState::Ready;
        session.events.push(SessionEvent::Opened {
            form_id: session.form.id.clone(),
            converged: outcome.converged,
            opened_at: Utc::now(),
        });
        tracing::debug!(form = %session.form.id, fields = session.form.fields.len(), "session opened");
        session
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Set an input field's value and return its validation messages
    pub fn edit(
        &mut self,
        id: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Vec<String>, SessionError> {
        self.ensure_open()?;
        let field = self.editable(id)?;
        let field_id = field.id().clone();
        let value = value.into();
        let field_errors = validator::validate(field, &value);

        self.state = SessionState::Editing;
        let edited = self.snapshot.with(field_id.clone(), value);
        self.snapshot = self.engine.recompute_all(self.form.derived_fields(), &edited);
        self.errors.set(&field_id, field_errors.clone());
        self.state = SessionState::Ready;

        self.events.push(SessionEvent::FieldEdited {
            form_id: self.form.id.clone(),
            field_id,
            error_count: field_errors.len(),
        });
        Ok(field_errors)
    }

    /// Check `option` on a checkbox field if unchecked, uncheck it otherwise.
    ///
    /// Checked options keep the order they were checked in.
    pub fn toggle_option(&mut self, id: &str, option: &str) -> Result<Vec<String>, SessionError> {
        self.ensure_open()?;
        let field = self.editable(id)?;
        if field.as_input().map(|input| input.kind) != Some(InputKind::Checkbox) {
            return Err(SessionError::NotACheckbox(field.id().clone()));
        }

        let mut checked = match self.snapshot.get(id) {
            Some(FieldValue::List(items)) => items.clone(),
            _ => Vec::new(),
        };
        match checked.iter().position(|item| item == option) {
            Some(index) => {
                checked.remove(index);
            }
            None => checked.push(option.to_string()),
        }
        self.edit(id, FieldValue::List(checked))
    }

    /// Validate every field; accept the form if nothing fails
    pub fn submit(&mut self) -> Result<SubmitOutcome, SessionError> {
        self.ensure_open()?;
        self.state = SessionState::Submitting;
        self.errors = validator::validate_all(&self.form.fields, &self.snapshot);

        if self.errors.is_empty() {
            self.state = SessionState::Accepted;
            self.events.push(SessionEvent::Accepted {
                form_id: self.form.id.clone(),
                accepted_at: Utc::now(),
            });
            tracing::info!(form = %self.form.id, "form submission accepted");
            Ok(SubmitOutcome::Accepted)
        } else {
            self.state = SessionState::Rejected;
            self.events.push(SessionEvent::Rejected {
                form_id: self.form.id.clone(),
                failed_fields: self.errors.iter().map(|(id, _)| id.clone()).collect(),
            });
            tracing::debug!(form = %self.form.id, failed = self.errors.len(), "form submission rejected");
            Ok(SubmitOutcome::Rejected(self.errors.clone()))
        }
    }

    /// Current messages for one field
    pub fn errors(&self, id: &str) -> &[String] {
        self.errors.get(id).unwrap_or_default()
    }

    /// Message shown under a field
    pub fn first_error(&self, id: &str) -> Option<&str> {
        self.errors(id).first().map(String::as_str)
    }

    pub fn all_errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn value(&self, id: &str) -> Option<&FieldValue> {
        self.snapshot.get(id)
    }

    pub fn values(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Accepted => Err(SessionError::Closed),
            _ => Ok(()),
        }
    }

    fn editable(&self, id: &str) -> Result<&Field, SessionError> {
        let field = self
            .form
            .field(id)
            .ok_or_else(|| SessionError::UnknownField(FieldId::from(id)))?;
        if field.is_derived() {
            return Err(SessionError::ReadOnlyField(field.id().clone()));
        }
        Ok(field)
    }
}
