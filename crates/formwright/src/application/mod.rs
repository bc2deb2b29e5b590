//! Application Layer
//!
//! The saved-form library. Store failures never surface to callers: they are
//! logged and the in-memory collection carries on, so it may run ahead of
//! what is persisted.

use crate::domain::aggregates::{Form, FormDraft};
use crate::ports::outbound::FormStore;

pub struct FormLibrary<S: FormStore> {
    store: S,
    /// Most recent first
    forms: Vec<Form>,
}

impl<S: FormStore> FormLibrary<S> {
    /// Load the saved collection from `store`; a failed load starts empty
    pub fn open(store: S) -> Self {
        let forms = load(&store);
        Self { store, forms }
    }

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    pub fn get(&self, id: &str) -> Option<&Form> {
        self.forms.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Add `form` at the front and persist the collection
    pub fn save_form(&mut self, form: Form) -> &Form {
        tracing::info!(form = %form.id, name = %form.name, fields = form.fields.len(), "saving form");
        self.forms.insert(0, form);
        self.persist();
        &self.forms[0]
    }

    /// Save a snapshot of the builder's draft
    pub fn save_draft(&mut self, draft: &FormDraft) -> &Form {
        self.save_form(draft.to_form())
    }

    /// Remove a form by id and persist; false when no form matched
    pub fn delete_form(&mut self, id: &str) -> bool {
        let before = self.forms.len();
        self.forms.retain(|f| f.id != id);
        if self.forms.len() == before {
            return false;
        }
        tracing::info!(form = id, "deleted form");
        self.persist();
        true
    }

    /// Discard in-memory state and load again from the store
    pub fn reload(&mut self) {
        self.forms = load(&self.store);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&self) {
        if let Err(e) = self.store.save_all(&self.forms) {
            tracing::error!(error = %e, forms = self.forms.len(), "Failed to persist saved forms");
        }
    }
}

fn load(store: &impl FormStore) -> Vec<Form> {
    match store.load_all() {
        Ok(forms) => {
            tracing::debug!(forms = forms.len(), "loaded saved forms");
            forms
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load saved forms");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::InputKind;
    use crate::error::StoreError;
    use crate::infrastructure::persistence::MemoryFormStore;
    use std::sync::Arc;

    fn draft(name: &str) -> FormDraft {
        let mut draft = FormDraft::new();
        draft.set_name(name);
        draft.add_field(InputKind::Text);
        draft
    }

    #[test]
    fn test_save_prepends_and_persists() {
        let store = Arc::new(MemoryFormStore::new());
        let mut library = FormLibrary::open(Arc::clone(&store));
        assert!(library.is_empty());

        let first = library.save_draft(&draft("First")).id.clone();
        let second = library.save_draft(&draft("Second")).id.clone();
        let order: Vec<_> = library.forms().iter().map(|f| f.id.clone()).collect();
        assert_eq!(order, vec![second.clone(), first.clone()]);

        let reopened = FormLibrary::open(Arc::clone(&store));
        assert_eq!(reopened.forms(), library.forms());
        assert_eq!(reopened.get(&first).map(|f| f.name.as_str()), Some("First"));
    }

    #[test]
    fn test_duplicate_names_are_allowed() {
        let mut library = FormLibrary::open(MemoryFormStore::new());
        library.save_draft(&draft("Same"));
        library.save_draft(&draft("Same"));
        assert_eq!(library.len(), 2);
        assert_ne!(library.forms()[0].id, library.forms()[1].id);
    }

    #[test]
    fn test_delete_form() {
        let store = Arc::new(MemoryFormStore::new());
        let mut library = FormLibrary::open(Arc::clone(&store));
        let id = library.save_draft(&draft("Doomed")).id.clone();
        library.save_draft(&draft("Kept"));

        assert!(library.delete_form(&id));
        assert!(!library.delete_form(&id));
        assert!(library.get(&id).is_none());
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_load_starts_empty() {
        let store = MemoryFormStore::new();
        store.put_raw(store.key().to_string(), "garbage");
        let library = FormLibrary::open(store);
        assert!(library.is_empty());
    }

    #[test]
    fn test_quota_failure_keeps_memory_ahead_of_store() {
        let store = Arc::new(MemoryFormStore::new().with_quota(16));
        let mut library = FormLibrary::open(Arc::clone(&store));
        library.save_draft(&draft("Too big"));

        assert_eq!(library.len(), 1);
        assert!(store.load_all().unwrap().is_empty());
        assert!(matches!(
            store.save_all(library.forms()),
            Err(StoreError::QuotaExceeded { quota: 16, .. })
        ));

        library.reload();
        assert!(library.is_empty());
    }
}
