//! Configuration management for the proto schema registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (proto-schema.toml)
//! - Environment variables (PROTO_SCHEMA__*)
//!
//! ## Example config file (proto-schema.toml):
//! ```toml
//! [storage]
//! path = "./schema-registry"
//!
//! [extract]
//! include_paths = ["proto", "third_party/proto"]
//! alias_root_references = false
//!
//! [logging]
//! filter = "info"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::extract::ExtractOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the file-backed registry keeps its data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Schema extraction settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractConfig {
    /// Include paths used when compiling `.proto` sources
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,

    /// Name references back to the root `record`
    #[serde(default)]
    pub alias_root_references: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./schema-registry")
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl ExtractConfig {
    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            alias_root_references: self.alias_root_references,
        }
    }
}

impl RegistryConfig {
    /// Load configuration, with an explicit file layered over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "proto-schema.toml",
            ".proto-schema.toml",
            "config/proto-schema.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "proto-schema", "proto-schema") {
            let xdg_config = config_dir.config_dir().join("proto-schema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // PROTO_SCHEMA__STORAGE__PATH and friends
        builder = builder.add_source(
            Environment::with_prefix("PROTO_SCHEMA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_toml()?)
    }

    pub fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Storage path, with relative paths resolved against the working directory
    pub fn storage_path(&self) -> PathBuf {
        if self.storage.path.is_absolute() {
            self.storage.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.storage.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.storage.path, PathBuf::from("./schema-registry"));
        assert!(config.extract.include_paths.is_empty());
        assert!(!config.extract.options().alias_root_references);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = RegistryConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("[extract]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[storage]\npath = \"/var/lib/schemas\"\n\n[extract]\ninclude_paths = [\"proto\"]\nalias_root_references = true\n",
        )
        .unwrap();

        let config = RegistryConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.storage_path(), PathBuf::from("/var/lib/schemas"));
        assert_eq!(config.extract.include_paths, vec![PathBuf::from("proto")]);
        assert!(config.extract.options().alias_root_references);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");

        let mut config = RegistryConfig::default();
        config.logging.filter = "debug".to_string();
        config.save(&path).unwrap();

        let reloaded = RegistryConfig::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.logging.filter, "debug");
    }
}
