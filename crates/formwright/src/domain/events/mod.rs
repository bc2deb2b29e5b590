//! Domain Events
//!
//! Raised by a filling session and drained by its owner with `take_events`.

use chrono::{DateTime, Utc};

use crate::domain::value_objects::FieldId;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Opened {
        form_id: String,
        /// Whether the initial derivation reached a fixed point
        converged: bool,
        opened_at: DateTime<Utc>,
    },

    FieldEdited {
        form_id: String,
        field_id: FieldId,
        error_count: usize,
    },

    Accepted {
        form_id: String,
        accepted_at: DateTime<Utc>,
    },

    Rejected {
        form_id: String,
        failed_fields: Vec<FieldId>,
    },
}

impl SessionEvent {
    /// Form the event belongs to
    pub fn form_id(&self) -> &str {
        match self {
            Self::Opened { form_id, .. }
            | Self::FieldEdited { form_id, .. }
            | Self::Accepted { form_id, .. }
            | Self::Rejected { form_id, .. } => form_id,
        }
    }
}
