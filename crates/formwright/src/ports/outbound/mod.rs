//! Outbound ports (driven side)

use crate::domain::aggregates::Form;
use crate::error::StoreError;

/// Default storage key for the saved-form collection
pub const DEFAULT_STORE_KEY: &str = "myforms_v1";

/// Persistence for the saved-form collection.
///
/// The collection is read and written whole; the last writer wins.
pub trait FormStore: Send + Sync {
    /// Every saved form, in stored order. An empty store yields an empty list.
    fn load_all(&self) -> Result<Vec<Form>, StoreError>;

    /// Replace the stored collection with `forms`
    fn save_all(&self, forms: &[Form]) -> Result<(), StoreError>;
}

impl<S: FormStore + ?Sized> FormStore for Box<S> {
    fn load_all(&self) -> Result<Vec<Form>, StoreError> {
        (**self).load_all()
    }

    fn save_all(&self, forms: &[Form]) -> Result<(), StoreError> {
        (**self).save_all(forms)
    }
}

impl<S: FormStore + ?Sized> FormStore for std::sync::Arc<S> {
    fn load_all(&self) -> Result<Vec<Form>, StoreError> {
        (**self).load_all()
    }

    fn save_all(&self, forms: &[Form]) -> Result<(), StoreError> {
        (**self).save_all(forms)
    }
}
