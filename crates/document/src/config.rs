//! Store configuration via `stratadoc.toml`
//!
//! On first open of a store directory, a default `stratadoc.toml` is
//! created. To change settings, edit the file and reopen the store.

use crate::backend::BackendRef;
use crate::memory::{MemoryBackend, DEFAULT_ID_FIELD};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use stratadoc_core::{Error, Result};

/// Config file name placed in the store directory.
pub const CONFIG_FILE_NAME: &str = "stratadoc.toml";

/// Backends that can be named in the configuration
pub const KNOWN_BACKENDS: [&str; 1] = ["memory"];

/// Store configuration loaded from `stratadoc.toml`.
///
/// # Example
///
/// ```toml
/// backend = "memory"
/// id_field = "_id"
/// installed_namespaces = ["people", "billing"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Storage backend: `"memory"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Name of the field that carries document ids.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Namespaces whose schemas are flagged installed.
    #[serde(default)]
    pub installed_namespaces: Vec<String>,
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            id_field: default_id_field(),
            installed_namespaces: Vec::new(),
        }
    }
}

impl StoreConfig {
    /// Check the configured values.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown backend or an empty id field.
    pub fn validate(&self) -> Result<()> {
        if !KNOWN_BACKENDS.contains(&self.backend.as_str()) {
            return Err(Error::Config(format!(
                "Invalid backend '{}' in {}. Expected one of: {}.",
                self.backend,
                CONFIG_FILE_NAME,
                KNOWN_BACKENDS.join(", ")
            )));
        }
        if self.id_field.trim().is_empty() {
            return Err(Error::Config(format!(
                "id_field in {} must not be empty",
                CONFIG_FILE_NAME
            )));
        }
        Ok(())
    }

    /// Build the configured backend.
    pub fn build_backend(&self) -> Result<BackendRef> {
        self.validate()?;
        match self.backend.as_str() {
            "memory" => Ok(Arc::new(MemoryBackend::with_id_field(self.id_field.clone()))),
            other => Err(Error::Config(format!("Unsupported backend '{}'", other))),
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# stratadoc store configuration
#
# Storage backend (default: "memory")
#   "memory" = records held in process memory, nothing is persisted
backend = "memory"

# Field that carries document ids (default: "_id")
id_field = "_id"

# Namespaces (app labels) whose schemas are flagged as installed
installed_namespaces = []
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
