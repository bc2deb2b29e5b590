//! Field schema
//!
//! A field is either entered by the user ([`InputField`]) or computed from
//! other fields ([`DerivedField`]). Both share one JSON record shape with a
//! `kind` discriminant; conversion through [`FieldRecord`] rejects records
//! that mix input and derived attributes.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{BuiltIn, FieldId, FieldValue, InputKind, ValidationRules};
use crate::error::SchemaError;

const DERIVED_KIND: &str = "derived";

/// One slot in a form's schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldRecord", into = "FieldRecord")]
pub enum Field {
    Input(InputField),
    Derived(DerivedField),
}

impl Field {
    pub fn id(&self) -> &FieldId {
        match self {
            Self::Input(f) => &f.id,
            Self::Derived(f) => &f.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Input(f) => &f.label,
            Self::Derived(f) => &f.label,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Self::Input(f) => f.required,
            Self::Derived(f) => f.required,
        }
    }

    /// Wire name of the kind (`"text"`, ..., `"derived"`)
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Input(f) => f.kind.as_str(),
            Self::Derived(_) => DERIVED_KIND,
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Derived(_))
    }

    pub fn as_input(&self) -> Option<&InputField> {
        match self {
            Self::Input(f) => Some(f),
            Self::Derived(_) => None,
        }
    }

    pub fn as_derived(&self) -> Option<&DerivedField> {
        match self {
            Self::Derived(f) => Some(f),
            Self::Input(_) => None,
        }
    }

    pub(crate) fn as_input_mut(&mut self) -> Option<&mut InputField> {
        match self {
            Self::Input(f) => Some(f),
            Self::Derived(_) => None,
        }
    }

    pub(crate) fn as_derived_mut(&mut self) -> Option<&mut DerivedField> {
        match self {
            Self::Derived(f) => Some(f),
            Self::Input(_) => None,
        }
    }
}

impl From<InputField> for Field {
    fn from(field: InputField) -> Self {
        Self::Input(field)
    }
}

impl From<DerivedField> for Field {
    fn from(field: DerivedField) -> Self {
        Self::Derived(field)
    }
}

/// User-entered field
#[derive(Clone, Debug, PartialEq)]
pub struct InputField {
    pub id: FieldId,
    pub kind: InputKind,
    pub label: String,
    /// Starting value; [`FieldValue::Empty`] falls back to the kind's default
    pub default_value: FieldValue,
    pub required: bool,
    pub validations: ValidationRules,
    /// Present (and non-empty) exactly for choice kinds
    pub options: Option<Vec<String>>,
}

impl InputField {
    /// New field of `kind` with a fresh id and the kind's defaults
    pub fn new(kind: InputKind) -> Self {
        Self::with_id(FieldId::generate(), kind)
    }

    pub fn with_id(id: impl Into<FieldId>, kind: InputKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: kind.default_label(),
            default_value: kind.default_value(),
            required: false,
            validations: ValidationRules::default(),
            options: kind.default_options(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn validations(mut self, rules: ValidationRules) -> Self {
        self.validations = rules;
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Value a new snapshot starts with
    pub fn initial_value(&self) -> FieldValue {
        match &self.default_value {
            FieldValue::Empty => self.kind.default_value(),
            value => value.clone(),
        }
    }

    pub(crate) fn check(&self) -> Result<(), SchemaError> {
        match (&self.options, self.kind.is_choice()) {
            (Some(options), true) if !options.is_empty() => Ok(()),
            (_, true) => Err(SchemaError::MissingOptions(self.id.clone())),
            (Some(_), false) => Err(SchemaError::MalformedRecord {
                id: self.id.to_string(),
                reason: format!("{} fields carry no options", self.kind),
            }),
            (None, false) => Ok(()),
        }
    }
}

/// Computed field, read-only while filling
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedField {
    pub id: FieldId,
    pub label: String,
    pub required: bool,
    /// Fields this one reads, in declared order
    pub parent_ids: Vec<FieldId>,
    pub built_in: Option<BuiltIn>,
    pub formula: Option<String>,
}

impl DerivedField {
    pub fn new() -> Self {
        Self::with_id(FieldId::generate())
    }

    pub fn with_id(id: impl Into<FieldId>) -> Self {
        Self {
            id: id.into(),
            label: "Derived Field".to_string(),
            required: false,
            parent_ids: Vec::new(),
            built_in: None,
            formula: Some(String::new()),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn parents<I: Into<FieldId>>(mut self, parents: impl IntoIterator<Item = I>) -> Self {
        self.parent_ids = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn built_in(mut self, built_in: BuiltIn) -> Self {
        self.built_in = Some(built_in);
        self
    }

    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Parents in declared order, never including this field itself
    pub fn parents_excluding_self(&self) -> impl Iterator<Item = &FieldId> {
        self.parent_ids.iter().filter(move |p| **p != self.id)
    }
}

impl Default for DerivedField {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted shape shared by both field variants
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldRecord {
    id: FieldId,
    kind: String,
    label: String,
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validations: Option<ValidationRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_ids: Option<Vec<FieldId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    built_in: Option<BuiltIn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
}

impl From<Field> for FieldRecord {
    fn from(field: Field) -> Self {
        match field {
            Field::Input(f) => Self {
                id: f.id,
                kind: f.kind.as_str().to_string(),
                label: f.label,
                required: f.required,
                default_value: Some(f.default_value),
                validations: Some(f.validations),
                options: f.options,
                parent_ids: None,
                built_in: None,
                formula: None,
            },
            Field::Derived(f) => Self {
                id: f.id,
                kind: DERIVED_KIND.to_string(),
                label: f.label,
                required: f.required,
                default_value: None,
                validations: None,
                options: None,
                parent_ids: Some(f.parent_ids),
                built_in: f.built_in,
                formula: f.formula,
            },
        }
    }
}

impl TryFrom<FieldRecord> for Field {
    type Error = SchemaError;

    fn try_from(record: FieldRecord) -> Result<Self, Self::Error> {
        let record_id = record.id.to_string();
        let malformed = |reason: &str| SchemaError::MalformedRecord {
            id: record_id.clone(),
            reason: reason.to_string(),
        };

        if record.kind == DERIVED_KIND {
            if record.options.is_some()
                || record.default_value.is_some()
                || record.validations.is_some()
            {
                return Err(malformed(
                    "derived fields carry no options, default value or validations",
                ));
            }
            return Ok(Field::Derived(DerivedField {
                id: record.id,
                label: record.label,
                required: record.required,
                parent_ids: record.parent_ids.unwrap_or_default(),
                built_in: record.built_in,
                formula: record.formula,
            }));
        }

        let kind = InputKind::parse(&record.kind)
            .ok_or_else(|| malformed(&format!("unknown kind {:?}", record.kind)))?;
        if record.parent_ids.is_some() || record.built_in.is_some() || record.formula.is_some() {
            return Err(malformed(
                "input fields carry no parents, built-in or formula",
            ));
        }

        let field = InputField {
            id: record.id,
            kind,
            label: record.label,
            default_value: record.default_value.unwrap_or_default(),
            required: record.required,
            validations: record.validations.unwrap_or_default(),
            options: record.options,
        };
        field.check()?;
        Ok(Field::Input(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::PasswordRule;

    #[test]
    fn test_new_input_field_defaults() {
        let field = InputField::new(InputKind::Select);
        assert_eq!(field.label, "select field");
        assert!(!field.required);
        assert_eq!(field.options.as_deref().map(<[String]>::len), Some(2));
        assert!(field.check().is_ok());

        let text = InputField::new(InputKind::Text);
        assert!(text.options.is_none());
        assert_eq!(text.default_value, FieldValue::empty_text());
    }

    #[test]
    fn test_initial_value_falls_back_to_kind_default() {
        let field = InputField::with_id("c", InputKind::Checkbox).default_value(FieldValue::Empty);
        assert_eq!(field.initial_value(), FieldValue::List(vec![]));

        let field = InputField::with_id("t", InputKind::Text).default_value("hello");
        assert_eq!(field.initial_value(), FieldValue::text("hello"));
    }

    #[test]
    fn test_input_field_json_roundtrip() {
        let field: Field = InputField::with_id("pw", InputKind::Text)
            .label("Password")
            .required(true)
            .validations(ValidationRules::default().password(PasswordRule {
                min_length: 8,
                must_contain_number: true,
            }))
            .into();

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["defaultValue"], "");
        assert!(json.get("parentIds").is_none());

        let back: Field = serde_json::from_value(json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_derived_field_json_roundtrip() {
        let field: Field = DerivedField::with_id("age")
            .parents(["dob"])
            .built_in(BuiltIn::AgeFromDob)
            .into();

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["kind"], "derived");
        assert_eq!(json["builtIn"], "ageFromDOB");
        assert_eq!(json["parentIds"][0], "dob");
        assert!(json.get("options").is_none());
        assert!(json.get("validations").is_none());

        let back: Field = serde_json::from_value(json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_rejects_mixed_records() {
        let derived_with_options = serde_json::json!({
            "id": "d", "kind": "derived", "label": "D", "options": ["x"]
        });
        assert!(serde_json::from_value::<Field>(derived_with_options).is_err());

        let input_with_formula = serde_json::json!({
            "id": "t", "kind": "text", "label": "T", "formula": "1 + 1"
        });
        assert!(serde_json::from_value::<Field>(input_with_formula).is_err());
    }

    #[test]
    fn test_rejects_choice_without_options() {
        let radio = serde_json::json!({ "id": "r", "kind": "radio", "label": "R", "options": [] });
        assert!(serde_json::from_value::<Field>(radio).is_err());

        let unknown = serde_json::json!({ "id": "x", "kind": "slider", "label": "X" });
        assert!(serde_json::from_value::<Field>(unknown).is_err());
    }

    #[test]
    fn test_parents_excluding_self() {
        let field = DerivedField::with_id("d").parents(["a", "d", "b"]);
        let parents: Vec<_> = field.parents_excluding_self().map(FieldId::as_str).collect();
        assert_eq!(parents, ["a", "b"]);
    }
}
