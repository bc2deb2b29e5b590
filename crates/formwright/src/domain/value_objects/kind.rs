//! Field kinds and built-in derivations

use serde::{Deserialize, Serialize};
use std::fmt;

use super::FieldValue;

/// Kind of a user-entered field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
}

impl InputKind {
    pub const ALL: [InputKind; 7] = [
        Self::Text,
        Self::Number,
        Self::Textarea,
        Self::Select,
        Self::Radio,
        Self::Checkbox,
        Self::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }

    /// Kinds whose value is picked from an option list
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Select | Self::Radio | Self::Checkbox)
    }

    /// Starting value of a new field of this kind
    pub fn default_value(&self) -> FieldValue {
        match self {
            Self::Checkbox => FieldValue::List(Vec::new()),
            _ => FieldValue::empty_text(),
        }
    }

    /// Options a freshly added choice field starts with
    pub fn default_options(&self) -> Option<Vec<String>> {
        self.is_choice()
            .then(|| vec!["Option 1".to_string(), "Option 2".to_string()])
    }

    pub fn default_label(&self) -> String {
        format!("{} field", self.as_str())
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in derivations that need no formula
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltIn {
    /// Whole years elapsed since the date in the first parent
    #[serde(rename = "ageFromDOB")]
    AgeFromDob,
    /// Parent values joined with a single space
    #[serde(rename = "concat")]
    Concat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_defaults() {
        assert_eq!(InputKind::Checkbox.default_value(), FieldValue::List(vec![]));
        assert_eq!(InputKind::Date.default_value(), FieldValue::empty_text());
        assert_eq!(InputKind::Radio.default_options().unwrap().len(), 2);
        assert!(InputKind::Checkbox.default_options().is_some());
        assert!(InputKind::Textarea.default_options().is_none());
        assert_eq!(InputKind::Select.default_label(), "select field");
    }

    #[test]
    fn test_kind_parse() {
        for kind in InputKind::ALL {
            assert_eq!(InputKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(InputKind::parse("derived"), None);
    }

    #[test]
    fn test_builtin_wire_names() {
        assert_eq!(
            serde_json::to_string(&BuiltIn::AgeFromDob).unwrap(),
            "\"ageFromDOB\""
        );
        let concat: BuiltIn = serde_json::from_str("\"concat\"").unwrap();
        assert_eq!(concat, BuiltIn::Concat);
    }
}
