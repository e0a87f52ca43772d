pub mod check;
pub mod plan;
pub mod platforms;
pub mod resolve;

use anyhow::{bail, Context, Result};
use rulekit_config::{Config, ConfigLoader};
use rulekit_resolver::{Platform, TargetTable};
use std::path::Path;

/// Loaded configuration and the target table built from it
pub struct Workspace {
    pub config: Config,
    pub table: TargetTable,
}

impl Workspace {
    /// Load an explicit manifest, or search upward from the current directory
    pub fn load(manifest: Option<&Path>) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        let config = match manifest {
            Some(path) => loader
                .load_from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => {
                let cwd = std::env::current_dir()?;
                loader
                    .load_from_directory(&cwd)
                    .context("Failed to load rules.toml")?
            }
        };

        let table = TargetTable::from_manifest(&config.manifest)
            .context("Invalid target declaration")?;

        tracing::debug!(
            targets = table.len(),
            root = ?config.manifest_root(),
            "loaded rules manifest"
        );

        Ok(Self { config, table })
    }

    /// Platform from a CLI flag, falling back to the configured default
    pub fn platform(&self, flag: Option<&str>) -> Result<Platform> {
        let id = match flag.or(self.config.default_platform()) {
            Some(id) => id,
            None => bail!("No platform given; pass --platform or set settings.default_platform"),
        };
        Platform::from_label(id).with_context(|| format!("Invalid platform '{}'", id))
    }

    /// Fail when no rules.toml was found
    pub fn require_manifest(&self) -> Result<()> {
        if !self.config.has_manifest() {
            bail!("No rules.toml found in this directory or any parent");
        }
        Ok(())
    }
}
