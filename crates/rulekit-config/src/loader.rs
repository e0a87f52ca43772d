//! Configuration Loader
//!
//! Handles loading the rules manifest and merging settings from multiple
//! sources with proper precedence.

use crate::global::UserConfig;
use crate::manifest::RulesManifest;
use crate::settings::Settings;
use crate::{ConfigError, ConfigResult, MANIFEST_FILE};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration loader
///
/// Loads configuration from multiple sources and merges settings with proper
/// precedence:
/// 1. User config (~/.rulekit/config.toml) - lowest priority
/// 2. `[settings]` in rules.toml - overrides user config
/// 3. Environment variables (RULEKIT_*) - overrides rules.toml
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached user config path
    user_config_path: Option<PathBuf>,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Rules manifest with effective settings
    pub manifest: RulesManifest,

    /// User configuration
    pub user: UserConfig,

    /// Directory containing rules.toml
    pub manifest_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            user_config_path: None,
        }
    }

    /// Use a specific user config file instead of ~/.rulekit/config.toml
    pub fn with_user_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find rules.toml. A tree without one
    /// yields an empty manifest.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (manifest_root, manifest) = self.find_manifest(start_dir)?;
        self.finish(manifest, manifest_root)
    }

    /// Load configuration from a specific manifest file
    pub fn load_from_file(&mut self, manifest_path: &Path) -> ConfigResult<Config> {
        let manifest = RulesManifest::load_from_file(manifest_path)?;
        let manifest_root = manifest_path.parent().map(|p| p.to_path_buf());
        self.finish(manifest, manifest_root)
    }

    fn finish(
        &mut self,
        mut manifest: RulesManifest,
        manifest_root: Option<PathBuf>,
    ) -> ConfigResult<Config> {
        // An unreadable user config is reported and skipped
        let user = match self.load_user_config() {
            Ok(user) => user,
            Err(e) => {
                warn!("ignoring user config: {}", e);
                UserConfig::default()
            }
        };

        manifest.settings.merge_defaults(&user.as_settings());
        manifest.settings = self.apply_env_overrides(manifest.settings)?;
        manifest.settings.validate()?;

        Ok(Config {
            manifest,
            user,
            manifest_root,
        })
    }

    /// Find rules.toml by walking up the directory tree
    fn find_manifest(&self, start_dir: &Path) -> ConfigResult<(Option<PathBuf>, RulesManifest)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let manifest_path = current.join(MANIFEST_FILE);

            if manifest_path.exists() {
                let manifest = RulesManifest::load_from_file(&manifest_path)?;
                return Ok((Some(current), manifest));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, RulesManifest::default())),
            }
        }
    }

    /// Load the user configuration
    fn load_user_config(&mut self) -> ConfigResult<UserConfig> {
        let path = match &self.user_config_path {
            Some(path) => path.clone(),
            None => {
                let path = UserConfig::user_config_path()?;
                self.user_config_path = Some(path.clone());
                path
            }
        };

        // User config is optional
        if !path.exists() {
            debug!(path = %path.display(), "no user config");
            return Ok(UserConfig::default());
        }

        UserConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to settings
    ///
    /// - RULEKIT_PLATFORM: default target platform
    /// - RULEKIT_HOST_PLATFORM: host platform
    /// - RULEKIT_JOBS: worker count
    fn apply_env_overrides(&self, mut settings: Settings) -> ConfigResult<Settings> {
        if let Ok(platform) = env::var("RULEKIT_PLATFORM") {
            settings.default_platform = Some(platform);
        }

        if let Ok(platform) = env::var("RULEKIT_HOST_PLATFORM") {
            settings.host_platform = Some(platform);
        }

        if let Ok(jobs) = env::var("RULEKIT_JOBS") {
            let jobs = jobs
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid_value("RULEKIT_JOBS", e))?;
            settings.jobs = Some(jobs);
        }

        Ok(settings)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Effective settings
    pub fn settings(&self) -> &Settings {
        &self.manifest.settings
    }

    /// Default target platform, if any source set one
    pub fn default_platform(&self) -> Option<&str> {
        self.manifest.settings.default_platform.as_deref()
    }

    /// Directory containing rules.toml
    pub fn manifest_root(&self) -> Option<&Path> {
        self.manifest_root.as_deref()
    }

    /// Check whether a rules.toml was found
    pub fn has_manifest(&self) -> bool {
        self.manifest_root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_manifest_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    fn loader(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new().with_user_config_path(dir.path().join("no-user-config.toml"))
    }

    #[test]
    #[serial]
    fn test_load_manifest() {
        let temp_dir = TempDir::new().unwrap();
        create_manifest_file(
            temp_dir.path(),
            r#"
[settings]
default_platform = "x86_64-unknown-linux-gnu"

[[target]]
name = "itoa"
srcs = ["src/lib.rs"]
"#,
        );

        let config = loader(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(config.has_manifest());
        assert_eq!(config.default_platform(), Some("x86_64-unknown-linux-gnu"));
        assert_eq!(config.manifest.targets.len(), 1);
    }

    #[test]
    #[serial]
    fn test_find_manifest_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_manifest_file(temp_dir.path(), "");

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let config = loader(&temp_dir).load_from_directory(&sub_dir).unwrap();
        assert_eq!(config.manifest_root(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_env_override_platform() {
        let temp_dir = TempDir::new().unwrap();
        create_manifest_file(
            temp_dir.path(),
            "[settings]\ndefault_platform = \"x86_64-unknown-linux-gnu\"\n",
        );

        env::set_var("RULEKIT_PLATFORM", "aarch64-unknown-linux-gnu");
        let config = loader(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var("RULEKIT_PLATFORM");

        assert_eq!(
            config.unwrap().default_platform(),
            Some("aarch64-unknown-linux-gnu")
        );
    }

    #[test]
    #[serial]
    fn test_env_override_jobs_invalid() {
        let temp_dir = TempDir::new().unwrap();
        create_manifest_file(temp_dir.path(), "");

        env::set_var("RULEKIT_JOBS", "many");
        let result = loader(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var("RULEKIT_JOBS");

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_user_config_fills_unset_settings() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_manifest_file(temp_dir.path(), "[settings]\njobs = 2\n");
        let user_path = temp_dir.path().join("user.toml");
        fs::write(
            &user_path,
            "[defaults]\nplatform = \"aarch64-apple-darwin\"\njobs = 16\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_user_config_path(&user_path)
            .load_from_file(&path)
            .unwrap();

        assert_eq!(config.default_platform(), Some("aarch64-apple-darwin"));
        assert_eq!(config.settings().jobs, Some(2));
    }

    #[test]
    #[serial]
    fn test_malformed_user_config_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_manifest_file(temp_dir.path(), "[settings]
jobs = 2
");
        let user_path = temp_dir.path().join("user.toml");
        fs::write(&user_path, "[defaults
platform = ").unwrap();

        let config = ConfigLoader::new()
            .with_user_config_path(&user_path)
            .load_from_file(&path)
            .unwrap();

        assert_eq!(config.user, UserConfig::default());
        assert_eq!(config.default_platform(), None);
        assert_eq!(config.settings().jobs, Some(2));
    }
}
