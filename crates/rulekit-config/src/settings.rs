//! Build settings
//!
//! The `[settings]` block of rules.toml. Settings are loaded once and handed to
//! the resolver by reference; there is no process-wide flag registry.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings shared by every resolution in a build invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Platform used when the caller does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_platform: Option<String>,

    /// Platform build scripts and proc-macros run on (default: the active platform)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_platform: Option<String>,

    /// Worker threads for plan resolution (default: one per core)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Compiler flags appended to every resolved target
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_rustc_flags: Vec<String>,

    /// Free-form build flags
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, FlagValue>,
}

/// Value of a build flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<String>),
}

impl Settings {
    /// Validate the settings
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(platform) = &self.default_platform {
            validate_platform("settings.default_platform", platform)?;
        }
        if let Some(platform) = &self.host_platform {
            validate_platform("settings.host_platform", platform)?;
        }
        if self.jobs == Some(0) {
            return Err(ConfigError::invalid_value(
                "settings.jobs",
                "must be at least 1",
            ));
        }
        for name in self.flags.keys() {
            if name.is_empty() {
                return Err(ConfigError::invalid_value(
                    "settings.flags",
                    "flag name cannot be empty",
                ));
            }
        }
        Ok(())
    }

    /// Look up a flag
    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// Look up a boolean flag
    pub fn bool_flag(&self, name: &str) -> Option<bool> {
        match self.flags.get(name) {
            Some(FlagValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Fill unset values from `defaults`
    ///
    /// Values already present in `self` win.
    pub fn merge_defaults(&mut self, defaults: &Settings) {
        if self.default_platform.is_none() {
            self.default_platform = defaults.default_platform.clone();
        }
        if self.host_platform.is_none() {
            self.host_platform = defaults.host_platform.clone();
        }
        if self.jobs.is_none() {
            self.jobs = defaults.jobs;
        }
        if self.extra_rustc_flags.is_empty() {
            self.extra_rustc_flags = defaults.extra_rustc_flags.clone();
        }
        for (name, value) in &defaults.flags {
            self.flags
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

fn validate_platform(field: &str, platform: &str) -> ConfigResult<()> {
    if platform.trim().is_empty() {
        return Err(ConfigError::invalid_value(field, "platform cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings_with_flags() {
        let toml = r#"
default_platform = "x86_64-unknown-linux-gnu"
jobs = 4
extra_rustc_flags = ["-Copt-level=1"]

[flags]
pipelined_compilation = true
error_format = "human"
incompatible_limit = 3
extra_exec_rustc_flags = ["-g"]
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.jobs, Some(4));
        assert_eq!(settings.bool_flag("pipelined_compilation"), Some(true));
        assert_eq!(
            settings.flag("error_format"),
            Some(&FlagValue::String("human".to_string()))
        );
        assert_eq!(settings.flag("incompatible_limit"), Some(&FlagValue::Int(3)));
        assert_eq!(settings.bool_flag("error_format"), None);
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let settings = Settings {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_blank_platform_rejected() {
        let settings = Settings {
            host_platform: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Settings, _> = toml::from_str("platforms = []");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_defaults_keeps_explicit_values() {
        let mut settings = Settings {
            default_platform: Some("aarch64-apple-darwin".to_string()),
            ..Default::default()
        };
        settings
            .flags
            .insert("pipelined_compilation".to_string(), FlagValue::Bool(false));

        let mut defaults = Settings {
            default_platform: Some("x86_64-unknown-linux-gnu".to_string()),
            jobs: Some(2),
            ..Default::default()
        };
        defaults
            .flags
            .insert("pipelined_compilation".to_string(), FlagValue::Bool(true));
        defaults
            .flags
            .insert("stamp".to_string(), FlagValue::Bool(true));

        settings.merge_defaults(&defaults);

        assert_eq!(
            settings.default_platform.as_deref(),
            Some("aarch64-apple-darwin")
        );
        assert_eq!(settings.jobs, Some(2));
        assert_eq!(settings.bool_flag("pipelined_compilation"), Some(false));
        assert_eq!(settings.bool_flag("stamp"), Some(true));
    }
}
