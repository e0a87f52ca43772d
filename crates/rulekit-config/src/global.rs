//! User Configuration (~/.rulekit/config.toml)
//!
//! Handles user-level defaults shared across workspaces.

use crate::settings::Settings;
use crate::{read_toml, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration from ~/.rulekit/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Default target platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Default host platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_platform: Option<String>,

    /// Default worker count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl UserConfig {
    /// Load user configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let config: Self = read_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the user configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.as_settings().validate().map_err(|e| match e {
            ConfigError::InvalidValue { field, reason } => ConfigError::InvalidValue {
                field: field.replace("settings.", "defaults."),
                reason,
            },
            other => other,
        })
    }

    /// Get the user config file path (~/.rulekit/config.toml)
    pub fn user_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".rulekit").join("config.toml"))
    }

    /// Express the defaults as settings, for merging under a manifest
    pub fn as_settings(&self) -> Settings {
        let defaults = self.defaults.clone().unwrap_or_default();
        Settings {
            default_platform: defaults.platform,
            host_platform: defaults.host_platform,
            jobs: defaults.jobs,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_user_config() {
        let config: UserConfig = toml::from_str("[defaults]\n").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.as_settings(), Settings::default());
    }

    #[test]
    fn test_parse_full_user_config() {
        let toml = r#"
[defaults]
platform = "aarch64-apple-darwin"
host_platform = "aarch64-apple-darwin"
jobs = 8
"#;
        let config: UserConfig = toml::from_str(toml).unwrap();
        let settings = config.as_settings();
        assert_eq!(
            settings.default_platform.as_deref(),
            Some("aarch64-apple-darwin")
        );
        assert_eq!(settings.jobs, Some(8));
    }

    #[test]
    fn test_invalid_jobs_reports_defaults_field() {
        let config: UserConfig = toml::from_str("[defaults]\njobs = 0\n").unwrap();
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "defaults.jobs"),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }
}
