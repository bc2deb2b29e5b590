//! Builder working copy
//!
//! A [`FormDraft`] is the mutable form being composed. Every edit either
//! keeps the schema invariants or is refused with a [`SchemaError`] and
//! leaves the draft unchanged. Saving goes through [`FormDraft::to_form`],
//! which copies the fields, so later edits never reach a saved form.

use std::collections::HashSet;

use super::field::{DerivedField, Field, InputField};
use super::form::{self, Form};
use crate::domain::value_objects::{FieldId, InputKind};
use crate::error::SchemaError;

pub const DEFAULT_DRAFT_NAME: &str = "Untitled Form";
const BLANK_FORM_NAME: &str = "Untitled";

#[derive(Clone, Debug, PartialEq)]
pub struct FormDraft {
    name: String,
    fields: Vec<Field>,
}

impl Default for FormDraft {
    fn default() -> Self {
        Self {
            name: DEFAULT_DRAFT_NAME.to_string(),
            fields: Vec::new(),
        }
    }
}

impl FormDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft seeded from a saved form, for building a variant of it
    pub fn from_form(form: &Form) -> Self {
        Self {
            name: form.name.clone(),
            fields: form.fields.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id().as_str() == id)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Replace the whole field list, provided it is consistent
    pub fn set_fields(&mut self, fields: Vec<Field>) -> Result<(), SchemaError> {
        form::check_fields(&fields)?;
        self.fields = fields;
        Ok(())
    }

    /// Append an input field of `kind` with its defaults
    pub fn add_field(&mut self, kind: InputKind) -> FieldId {
        self.push(InputField::new(kind).into())
    }

    /// Append a derived field with no parents and an empty formula
    pub fn add_derived(&mut self) -> FieldId {
        self.push(DerivedField::new().into())
    }

    fn push(&mut self, field: Field) -> FieldId {
        let id = field.id().clone();
        tracing::debug!(field = %id, kind = field.kind_name(), "field added");
        self.fields.push(field);
        id
    }

    /// Replace the field with the same id.
    ///
    /// Derived parents are de-duplicated, keeping first occurrence.
    pub fn update_field(&mut self, field: impl Into<Field>) -> Result<(), SchemaError> {
        let mut field = field.into();
        let index = self.index_of(field.id())?;

        match &mut field {
            Field::Input(input) => input.check()?,
            Field::Derived(derived) => {
                let mut seen = HashSet::new();
                derived.parent_ids.retain(|p| seen.insert(p.clone()));
                let known: HashSet<&FieldId> = self.fields.iter().map(Field::id).collect();
                form::check_parents(derived, &known)?;
            }
        }

        self.fields[index] = field;
        Ok(())
    }

    /// Remove a field and drop it from every derived field's parents
    pub fn remove_field(&mut self, id: &str) -> Option<Field> {
        let index = self.fields.iter().position(|f| f.id().as_str() == id)?;
        let removed = self.fields.remove(index);

        for derived in self.fields.iter_mut().filter_map(Field::as_derived_mut) {
            derived.parent_ids.retain(|p| p.as_str() != id);
        }
        Some(removed)
    }

    /// Move the field at `from` to position `to`.
    ///
    /// Out-of-range indices leave the order unchanged and return `false`.
    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        if from >= self.fields.len() || to >= self.fields.len() {
            return false;
        }
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        true
    }

    pub fn add_option(&mut self, id: &str, option: impl Into<String>) -> Result<(), SchemaError> {
        self.options_mut(id)?.push(option.into());
        Ok(())
    }

    pub fn set_option(
        &mut self,
        id: &str,
        index: usize,
        option: impl Into<String>,
    ) -> Result<(), SchemaError> {
        let options = self.options_mut(id)?;
        let slot = options
            .get_mut(index)
            .ok_or_else(|| SchemaError::OptionOutOfRange {
                field: FieldId::from(id),
                index,
            })?;
        *slot = option.into();
        Ok(())
    }

    /// Remove one option; the last remaining option cannot be removed
    pub fn remove_option(&mut self, id: &str, index: usize) -> Result<String, SchemaError> {
        let options = self.options_mut(id)?;
        if index >= options.len() {
            return Err(SchemaError::OptionOutOfRange {
                field: FieldId::from(id),
                index,
            });
        }
        if options.len() == 1 {
            return Err(SchemaError::MissingOptions(FieldId::from(id)));
        }
        Ok(options.remove(index))
    }

    /// Snapshot this draft as a new saved form.
    ///
    /// A blank name is saved as `"Untitled"`.
    pub fn to_form(&self) -> Form {
        let name = match self.name.trim() {
            "" => BLANK_FORM_NAME.to_string(),
            name => name.to_string(),
        };
        Form::create(name, self.fields.clone())
    }

    fn index_of(&self, id: &FieldId) -> Result<usize, SchemaError> {
        self.fields
            .iter()
            .position(|f| f.id() == id)
            .ok_or_else(|| SchemaError::UnknownField(id.clone()))
    }

    fn options_mut(&mut self, id: &str) -> Result<&mut Vec<String>, SchemaError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.id().as_str() == id)
            .ok_or_else(|| SchemaError::UnknownField(FieldId::from(id)))?;
        field
            .as_input_mut()
            .and_then(|input| input.options.as_mut())
            .ok_or_else(|| SchemaError::NotAChoice(FieldId::from(id)))
    }
}
