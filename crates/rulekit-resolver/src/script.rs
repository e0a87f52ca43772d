//! Build script targets
//!
//! A build script is a code-generation step compiled and run on the host
//! before its parent crate. It produces environment variables and extra
//! compiled objects the parent consumes.

use crate::error::ResolveResult;
use crate::platform::Platform;
use crate::targets::{Target, TargetKind};
use rulekit_config::BuildScriptDecl;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Build script target definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildScriptTarget {
    /// Common target fields; `kind` is always [`TargetKind::BuildScript`]
    pub target: Target,
    /// Static environment for the script run
    pub build_script_env: BTreeMap<String, String>,
    /// Native library the script links
    pub links: Option<String>,
    /// Runtime data labels
    pub data: Vec<String>,
    /// Tool labels available to the script
    pub tools: Vec<String>,
}

impl BuildScriptTarget {
    /// Create a new build script
    pub fn new(name: impl Into<String>, crate_root: impl Into<PathBuf>) -> Self {
        let crate_root = crate_root.into();
        let target = Target::new(name, TargetKind::BuildScript)
            .with_sources(vec![crate_root.display().to_string()])
            .with_crate_root(crate_root);
        Self {
            target,
            build_script_env: BTreeMap::new(),
            links: None,
            data: Vec::new(),
            tools: Vec::new(),
        }
    }

    /// Set the native library name
    pub fn with_links(mut self, links: impl Into<String>) -> Self {
        self.links = Some(links.into());
        self
    }

    /// Add a static environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.build_script_env.insert(key.into(), value.into());
        self
    }

    /// Replace the common target fields, keeping the build-script kind
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Target {
            kind: TargetKind::BuildScript,
            ..target
        };
        self
    }

    /// Convert a manifest declaration
    pub fn from_decl(decl: &BuildScriptDecl) -> ResolveResult<Self> {
        let mut target = Target::from_decl(&decl.target)?;
        target.kind = TargetKind::BuildScript;

        Ok(Self {
            target,
            build_script_env: decl.build_script_env.clone(),
            links: decl.links.clone(),
            data: decl.data.clone(),
            tools: decl.tools.clone(),
        })
    }
}

/// Execution context for a build script feeding a parent crate
#[derive(Debug, Clone)]
pub struct ScriptContext<'a> {
    /// The script
    pub script: &'a BuildScriptTarget,
    /// Parent crate name
    pub package_name: &'a str,
    /// Parent crate version
    pub package_version: Option<&'a str>,
    /// Platform the parent is built for
    pub target_platform: &'a Platform,
    /// Platform the script runs on
    pub host_platform: &'a Platform,
    /// Features enabled on the parent crate
    pub features: &'a BTreeSet<String>,
}

impl<'a> ScriptContext<'a> {
    /// Get environment variables for the script run
    ///
    /// Declared `build_script_env` entries override computed ones.
    pub fn environment(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        env.insert("TARGET".to_string(), self.target_platform.to_string());
        env.insert("HOST".to_string(), self.host_platform.to_string());
        env.insert(
            "CARGO_CFG_TARGET_ARCH".to_string(),
            self.target_platform.arch().to_string(),
        );
        env.insert("CARGO_PKG_NAME".to_string(), self.package_name.to_string());
        env.insert(
            "CARGO_PKG_VERSION".to_string(),
            self.package_version.unwrap_or("0.0.0").to_string(),
        );

        if let Some(links) = &self.script.links {
            env.insert("CARGO_MANIFEST_LINKS".to_string(), links.clone());
        }

        for feature in self.features {
            env.insert(feature_env_var(feature), "1".to_string());
        }

        for (key, value) in &self.script.build_script_env {
            env.insert(key.clone(), value.clone());
        }

        env
    }
}

/// `CARGO_FEATURE_<NAME>` for a feature
fn feature_env_var(feature: &str) -> String {
    format!(
        "CARGO_FEATURE_{}",
        feature.to_uppercase().replace('-', "_")
    )
}
