//! Form Aggregate
//!
//! A named, saved list of fields. Saved forms are replaced or deleted whole,
//! never edited in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::field::{DerivedField, Field, InputField};
use crate::domain::value_objects::FieldId;
use crate::error::SchemaError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Display order
    pub fields: Vec<Field>,
}

impl Form {
    pub fn create(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            fields,
        }
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id().as_str() == id)
    }

    pub fn input_fields(&self) -> impl Iterator<Item = &InputField> {
        self.fields.iter().filter_map(Field::as_input)
    }

    pub fn derived_fields(&self) -> impl Iterator<Item = &DerivedField> {
        self.fields.iter().filter_map(Field::as_derived)
    }

    /// Check the cross-field invariants: unique ids, options on choice
    /// fields, and derived parents that exist and are not the field itself.
    pub fn check_integrity(&self) -> Result<(), SchemaError> {
        check_fields(&self.fields)
    }
}

pub(crate) fn check_fields(fields: &[Field]) -> Result<(), SchemaError> {
    let mut seen: HashSet<&FieldId> = HashSet::with_capacity(fields.len());
    for field in fields {
        if !seen.insert(field.id()) {
            return Err(SchemaError::DuplicateId(field.id().clone()));
        }
    }

    for field in fields {
        match field {
            Field::Input(input) => input.check()?,
            Field::Derived(derived) => check_parents(derived, &seen)?,
        }
    }
    Ok(())
}

pub(crate) fn check_parents(
    derived: &DerivedField,
    known: &HashSet<&FieldId>,
) -> Result<(), SchemaError> {
    for parent in &derived.parent_ids {
        if *parent == derived.id {
            return Err(SchemaError::SelfReference(derived.id.clone()));
        }
        if !known.contains(parent) {
            return Err(SchemaError::UnknownParent {
                field: derived.id.clone(),
                parent: parent.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{BuiltIn, InputKind};

    fn sample() -> Form {
        Form::create(
            "Signup",
            vec![
                InputField::with_id("first", InputKind::Text).into(),
                InputField::with_id("last", InputKind::Text).into(),
                DerivedField::with_id("full")
                    .parents(["first", "last"])
                    .built_in(BuiltIn::Concat)
                    .into(),
            ],
        )
    }

    #[test]
    fn test_form_lookup() {
        let form = sample();
        assert_eq!(form.field("last").map(Field::label), Some("text field"));
        assert_eq!(form.input_fields().count(), 2);
        assert_eq!(form.derived_fields().count(), 1);
        assert!(form.check_integrity().is_ok());
    }

    #[test]
    fn test_integrity_errors() {
        let mut form = sample();
        form.fields.push(InputField::with_id("first", InputKind::Date).into());
        assert_eq!(
            form.check_integrity(),
            Err(SchemaError::DuplicateId(FieldId::from("first")))
        );

        let mut form = sample();
        form.fields
            .push(DerivedField::with_id("loop").parents(["loop"]).into());
        assert_eq!(
            form.check_integrity(),
            Err(SchemaError::SelfReference(FieldId::from("loop")))
        );

        let mut form = sample();
        form.fields
            .push(DerivedField::with_id("orphan").parents(["ghost"]).into());
        assert!(matches!(
            form.check_integrity(),
            Err(SchemaError::UnknownParent { .. })
        ));
    }

    #[test]
    fn test_form_json_shape() {
        let form = sample();
        let json = serde_json::to_value(&form).unwrap();
        assert!(json["createdAt"].is_string());
        assert_eq!(json["fields"][2]["kind"], "derived");
        let back: Form = serde_json::from_value(json).unwrap();
        assert_eq!(back, form);
    }
}
