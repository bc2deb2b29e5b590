//! In-memory form store
//!
//! A key to JSON-text map, the shape of browser local storage. An optional
//! byte quota makes oversized writes fail the way a full browser store does.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::aggregates::Form;
use crate::error::StoreError;
use crate::ports::outbound::{FormStore, DEFAULT_STORE_KEY};

#[derive(Debug)]
pub struct MemoryFormStore {
    key: String,
    quota: Option<usize>,
    entries: RwLock<HashMap<String, String>>,
}

impl Default for MemoryFormStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFormStore {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_STORE_KEY)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            quota: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cap the total bytes held across all keys
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw text stored under `key`
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Store raw text under `key`, bypassing serialization and quota
    pub fn put_raw(&self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.write().insert(key.into(), text.into());
    }

    fn used_by_others(entries: &HashMap<String, String>, key: &str) -> usize {
        entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl FormStore for MemoryFormStore {
    fn load_all(&self) -> Result<Vec<Form>, StoreError> {
        match self.entries.read().get(&self.key) {
            Some(text) => Ok(serde_json::from_str(text)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_all(&self, forms: &[Form]) -> Result<(), StoreError> {
        let text = serde_json::to_string(forms)?;
        let mut entries = self.entries.write();

        if let Some(quota) = self.quota {
            let needed = Self::used_by_others(&entries, &self.key) + self.key.len() + text.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }

        entries.insert(self.key.clone(), text);
        Ok(())
    }
}
