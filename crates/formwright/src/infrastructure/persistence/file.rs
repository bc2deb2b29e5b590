//! JSON file form store
//!
//! Keeps the collection in `<directory>/<key>.json`. Writes go to a sibling
//! temporary file that is renamed over the target, so readers never observe
//! a partial write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::domain::aggregates::Form;
use crate::error::StoreError;
use crate::ports::outbound::{FormStore, DEFAULT_STORE_KEY};

#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(directory: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: directory.as_ref().join(format!("{key}.json")),
        }
    }

    /// Store under the default key in `directory`
    pub fn in_directory(directory: impl AsRef<Path>) -> Self {
        Self::new(directory, DEFAULT_STORE_KEY)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl FormStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Form>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_all(&self, forms: &[Form]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(forms)?;

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)?;
        file.write_all(&content)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &self.path)?;

        tracing::debug!(path = %self.path.display(), forms = forms.len(), "form store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::InputField;
    use crate::domain::value_objects::{InputKind, ValidationRules};

    fn sample(name: &str) -> Form {
        Form::create(
            name,
            vec![InputField::with_id("email", InputKind::Text)
                .required(true)
                .validations(ValidationRules::default().email())
                .into()],
        )
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_directory(dir.path().join("nested"));
        assert!(store.load_all().unwrap().is_empty());
        assert!(store.path().ends_with("myforms_v1.json"));
    }

    #[test]
    fn test_save_replaces_whole_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "forms");

        let first = vec![sample("one"), sample("two")];
        store.save_all(&first).unwrap();
        assert_eq!(store.load_all().unwrap(), first);

        let second = vec![sample("three")];
        store.save_all(&second).unwrap();
        assert_eq!(store.load_all().unwrap(), second);

        // no temp file left behind
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["forms.json"]);
    }

    #[test]
    fn test_persisted_shape_is_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_directory(dir.path());
        store.save_all(&[sample("shape")]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw[0]["name"], "shape");
        assert_eq!(raw[0]["fields"][0]["validations"]["email"], true);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_directory(dir.path());
        fs::write(store.path(), "[{").unwrap();
        assert!(matches!(store.load_all(), Err(StoreError::Serialization(_))));
    }
}
