//! Forms configuration
//!
//! Loaded from a TOML file, then overridden by environment variables:
//!
//! | Variable | Effect |
//! |---|---|
//! | `FORMS_CONFIG` | config file path (default `forms.toml`) |
//! | `APP_URL` | base URL for share links |
//! | `FORMS_DATA_DIR` | directory of the file tier |
//! | `FILE_STORAGE` | `true`/`false`, enables the file tier |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{FormsError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "forms.toml";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// Base of derived share URLs, `{base_url}/form/{id}`
    pub base_url: String,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// When false the file tier is skipped even if listed
    pub file_storage: bool,
    /// Most durable first
    pub tiers: Vec<StorageTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    File,
    Memory,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            file_storage: true,
            tiers: vec![StorageTier::File, StorageTier::Memory],
        }
    }
}

impl FormsConfig {
    /// Parse a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// File at `FORMS_CONFIG` (or `forms.toml`) if present, defaults
    /// otherwise, then environment overrides
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("FORMS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = if Path::new(&path).exists() {
            Self::load(&path)?
        } else {
            warn!(path = %path, "Config not found, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("APP_URL") {
            self.base_url = url;
        }
        if let Some(dir) = lookup("FORMS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("FILE_STORAGE") {
            self.storage.file_storage = flag.parse().map_err(|_| {
                FormsError::Config(format!("FILE_STORAGE must be true or false, got {}", flag))
            })?;
        }
        Ok(())
    }

    /// Tiers in use after the `file_storage` switch
    pub fn enabled_tiers(&self) -> Vec<StorageTier> {
        self.storage
            .tiers
            .iter()
            .copied()
            .filter(|tier| self.storage.file_storage || *tier != StorageTier::File)
            .collect()
    }
}
