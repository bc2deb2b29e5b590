//! Field Validator
//!
//! Pure checks of one value against one field's rules. Failures are returned
//! as user-facing messages, never as `Err`.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::aggregates::Field;
use crate::domain::value_objects::{FieldId, FieldValue, Snapshot, ValidationRules};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const EMAIL_MESSAGE: &str = "Invalid email address";
pub const PASSWORD_NUMBER_MESSAGE: &str = "Password must contain a number";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static pattern"));

/// Messages for `value` under `field`'s rules, in rule order.
///
/// A failed required check is reported alone. Derived fields only carry the
/// required check.
pub fn validate(field: &Field, value: &FieldValue) -> Vec<String> {
    if field.required() && value.is_blank() {
        return vec![REQUIRED_MESSAGE.to_string()];
    }

    match field {
        Field::Input(input) => check_rules(&input.validations, &value.to_display_string()),
        Field::Derived(_) => Vec::new(),
    }
}

fn check_rules(rules: &ValidationRules, text: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let len = text.chars().count();

    if let Some(min) = rules.min_length {
        if len < min {
            errors.push(format!("Minimum length is {min}"));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            errors.push(format!("Maximum length is {max}"));
        }
    }

    if rules.email && !EMAIL.is_match(text) {
        errors.push(EMAIL_MESSAGE.to_string());
    }

    if let Some(rule) = &rules.password_rule {
        if len < rule.min_length {
            errors.push(format!("Password min {}", rule.min_length));
        }
        if rule.must_contain_number && !text.chars().any(|c| c.is_ascii_digit()) {
            errors.push(PASSWORD_NUMBER_MESSAGE.to_string());
        }
    }

    errors
}

/// Per-field error lists, in field order, holding only fields that failed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(FieldId, Vec<String>)>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(field, _)| field.as_str() == id)
            .map(|(_, errors)| errors.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &[String])> {
        self.0.iter().map(|(id, errors)| (id, errors.as_slice()))
    }

    /// Replace the entry for `id`, dropping it when `errors` is empty
    pub(crate) fn set(&mut self, id: &FieldId, errors: Vec<String>) {
        let position = self.0.iter().position(|(field, _)| field == id);
        match (position, errors.is_empty()) {
            (Some(i), true) => {
                self.0.remove(i);
            }
            (Some(i), false) => self.0[i].1 = errors,
            (None, false) => self.0.push((id.clone(), errors)),
            (None, true) => {}
        }
    }
}

/// Validate every field against its value in `snapshot`
pub fn validate_all<'a>(
    fields: impl IntoIterator<Item = &'a Field>,
    snapshot: &Snapshot,
) -> FieldErrors {
    FieldErrors(
        fields
            .into_iter()
            .filter_map(|field| {
                let errors = validate(field, &snapshot.value_or_empty(field.id().as_str()));
                (!errors.is_empty()).then(|| (field.id().clone(), errors))
            })
            .collect(),
    )
}
