//! Configuration
//!
//! ```toml
//! [storage]
//! backend = "file"          # or "memory"
//! directory = "/var/lib/formwright"
//! key = "myforms_v1"
//! quota_bytes = 5242880     # memory backend only
//!
//! [log]
//! filter = "formwright=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::infrastructure::persistence::{JsonFileStore, MemoryFormStore};
use crate::ports::outbound::{FormStore, DEFAULT_STORE_KEY};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "FORMWRIGHT_CONFIG";

const APP_DIR: &str = "formwright";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    pub storage: StorageConfig,
    pub log: LogConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Defaults to the platform data directory
    pub directory: Option<PathBuf>,
    pub key: String,
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            directory: None,
            key: DEFAULT_STORE_KEY.to_string(),
            quota_bytes: None,
        }
    }
}

impl StorageConfig {
    /// Configured directory, else `<data dir>/formwright`, else the working directory
    pub fn data_directory(&self) -> PathBuf {
        self.directory
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl FormsConfig {
    /// Read a TOML config file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from `$FORMWRIGHT_CONFIG`, else the platform config path
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV).map(PathBuf::from).or_else(Self::default_path) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// `<config dir>/formwright/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Build the configured store adapter
    pub fn open_store(&self) -> Result<Box<dyn FormStore>, ConfigError> {
        let storage = &self.storage;
        match storage.backend {
            StorageBackend::Memory => {
                let store = MemoryFormStore::with_key(storage.key.clone());
                Ok(Box::new(match storage.quota_bytes {
                    Some(quota) => store.with_quota(quota),
                    None => store,
                }))
            }
            StorageBackend::File => {
                let directory = storage.data_directory();
                fs::create_dir_all(&directory)?;
                tracing::info!(path = %directory.display(), "using file form store");
                Ok(Box::new(JsonFileStore::new(directory, &storage.key)))
            }
        }
    }
}
