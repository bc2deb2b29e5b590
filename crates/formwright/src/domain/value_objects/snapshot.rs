//! Values snapshot of a filling session

use std::collections::HashMap;

use super::{FieldId, FieldValue};

/// Mapping from field id to current value
///
/// Runtime only. A session replaces its snapshot wholesale on every edit, so
/// the mutating helpers here are meant for building the next snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    values: HashMap<FieldId, FieldValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.values.get(id)
    }

    /// Value of `id`, treating a missing entry as [`FieldValue::Empty`]
    pub fn value_or_empty(&self, id: &str) -> FieldValue {
        self.values.get(id).cloned().unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    pub fn set(&mut self, id: FieldId, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(id, value)
    }

    /// Copy of this snapshot with one value replaced
    pub fn with(&self, id: FieldId, value: FieldValue) -> Self {
        let mut next = self.clone();
        next.set(id, value);
        next
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
        self.values.iter()
    }
}

impl<K: Into<FieldId>, V: Into<FieldValue>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
