//! Rulekit Configuration System
//!
//! Loads the static declarative sources the resolver works from:
//! - Rules manifest (`rules.toml`): target and build-script declarations
//! - Settings block: platform defaults and build flags
//! - User configuration (`~/.rulekit/config.toml`)
//!
//! # Configuration Hierarchy
//!
//! Settings are merged in the following order (later overrides earlier):
//! 1. User config (~/.rulekit/config.toml)
//! 2. `[settings]` in rules.toml
//! 3. Environment variables (RULEKIT_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use rulekit_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("{} targets", config.manifest.targets.len());
//! ```

pub mod global;
pub mod loader;
pub mod manifest;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the rules manifest file
pub const MANIFEST_FILE: &str = "rules.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Missing required field '{field}' in {owner}")]
    MissingField { field: String, owner: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Read and parse a TOML file, mapping failures onto [`ConfigError`]
pub(crate) fn read_toml<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> ConfigResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::IoError(e)
        }
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
        file: path.to_path_buf(),
        error: e,
    })
}

/// Editions accepted for `edition` fields
pub fn is_valid_edition(edition: &str) -> bool {
    matches!(edition, "2015" | "2018" | "2021" | "2024")
}

// Re-export main types
pub use global::UserConfig;
pub use loader::{Config, ConfigLoader};
pub use manifest::{BuildScriptDecl, CrateKind, RulesManifest, TargetDecl};
pub use settings::{FlagValue, Settings};
