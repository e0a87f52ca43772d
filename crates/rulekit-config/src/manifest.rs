//! Rules Manifest (rules.toml)
//!
//! The declarative table of targets and build scripts, usually produced by a
//! dependency generator and checked in next to the build files.

use crate::settings::Settings;
use crate::{is_valid_edition, read_toml, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Rules manifest loaded from rules.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RulesManifest {
    /// Build settings
    #[serde(default)]
    pub settings: Settings,

    /// Library, proc-macro and binary targets
    #[serde(default, rename = "target")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetDecl>,

    /// Build-script targets
    #[serde(default, rename = "build_script")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub build_scripts: Vec<BuildScriptDecl>,
}

/// Crate kind of a declared target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrateKind {
    #[default]
    Library,
    ProcMacro,
    Binary,
}

/// A `[[target]]` declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetDecl {
    pub name: String,

    #[serde(default)]
    pub kind: CrateKind,

    /// Source file globs
    #[serde(default)]
    pub srcs: Vec<String>,

    /// Crate root, relative to the package
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crate_root: Option<PathBuf>,

    #[serde(default = "default_edition")]
    pub edition: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Enabled features
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,

    /// Feature name -> implied features and dependency activations
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_map: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rustc_flags: Vec<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rustc_env: BTreeMap<String, String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proc_macro_deps: Vec<String>,

    /// Dependencies that only participate when a feature activates them
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub optional_deps: Vec<String>,

    /// Dependency name -> name it is imported under
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,

    /// Platform -> labels; `//conditions:default` is the fallback entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible_with: Option<BTreeMap<String, Vec<String>>>,
}

/// A `[[build_script]]` declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "BuildScriptFields", into = "BuildScriptFields")]
pub struct BuildScriptDecl {
    pub target: TargetDecl,

    /// Static environment for the script run
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_script_env: BTreeMap<String, String>,

    /// Native library the script links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

/// On-disk shape of a `[[build_script]]` table.
///
/// Spelled out field by field so unknown keys are rejected; a flattened
/// `TargetDecl` would swallow them. Build scripts have no `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct BuildScriptFields {
    name: String,
    #[serde(default)]
    srcs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crate_root: Option<PathBuf>,
    #[serde(default = "default_edition")]
    edition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    features: Vec<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    feature_map: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rustc_flags: Vec<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    rustc_env: BTreeMap<String, String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deps: Vec<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    proc_macro_deps: Vec<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    optional_deps: Vec<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    aliases: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compatible_with: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    build_script_env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    links: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    data: Vec<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<String>,
}

impl From<BuildScriptFields> for BuildScriptDecl {
    fn from(fields: BuildScriptFields) -> Self {
        Self {
            target: TargetDecl {
                name: fields.name,
                kind: CrateKind::Library,
                srcs: fields.srcs,
                crate_root: fields.crate_root,
                edition: fields.edition,
                version: fields.version,
                features: fields.features,
                feature_map: fields.feature_map,
                rustc_flags: fields.rustc_flags,
                rustc_env: fields.rustc_env,
                tags: fields.tags,
                deps: fields.deps,
                proc_macro_deps: fields.proc_macro_deps,
                optional_deps: fields.optional_deps,
                aliases: fields.aliases,
                compatible_with: fields.compatible_with,
            },
            build_script_env: fields.build_script_env,
            links: fields.links,
            data: fields.data,
            tools: fields.tools,
        }
    }
}

impl From<BuildScriptDecl> for BuildScriptFields {
    fn from(decl: BuildScriptDecl) -> Self {
        let target = decl.target;
        Self {
            name: target.name,
            srcs: target.srcs,
            crate_root: target.crate_root,
            edition: target.edition,
            version: target.version,
            features: target.features,
            feature_map: target.feature_map,
            rustc_flags: target.rustc_flags,
            rustc_env: target.rustc_env,
            tags: target.tags,
            deps: target.deps,
            proc_macro_deps: target.proc_macro_deps,
            optional_deps: target.optional_deps,
            aliases: target.aliases,
            compatible_with: target.compatible_with,
            build_script_env: decl.build_script_env,
            links: decl.links,
            data: decl.data,
            tools: decl.tools,
        }
    }
}

fn default_edition() -> String {
    "2015".to_string()
}

impl RulesManifest {
    /// Load a manifest from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let manifest: Self = read_toml(path)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from TOML text
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let manifest: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: PathBuf::from(crate::MANIFEST_FILE),
            error: e,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> ConfigResult<()> {
        self.settings.validate()?;

        for target in &self.targets {
            target.validate("target")?;
        }

        for script in &self.build_scripts {
            script.target.validate("build_script")?;
            if script.target.crate_root.is_none() {
                return Err(ConfigError::MissingField {
                    field: "crate_root".to_string(),
                    owner: format!("build_script '{}'", script.target.name),
                });
            }
            if let Some(links) = &script.links {
                if links.is_empty() {
                    return Err(ConfigError::invalid_value(
                        format!("build_script '{}'.links", script.target.name),
                        "cannot be empty",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Total number of declarations
    pub fn len(&self) -> usize {
        self.targets.len() + self.build_scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TargetDecl {
    fn validate(&self, section: &str) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::invalid_value(
                format!("{}.name", section),
                "name cannot be empty",
            ));
        }

        if !is_valid_edition(&self.edition) {
            return Err(ConfigError::invalid_value(
                format!("{} '{}'.edition", section, self.name),
                format!("invalid edition '{}'", self.edition),
            ));
        }

        for dep in self.aliases.keys() {
            let declared = self.deps.contains(dep)
                || self.proc_macro_deps.contains(dep)
                || self.optional_deps.contains(dep);
            if !declared {
                return Err(ConfigError::invalid_value(
                    format!("{} '{}'.aliases", section, self.name),
                    format!("'{}' is not a dependency", dep),
                ));
            }
        }

        if let Some(conditions) = &self.compatible_with {
            if conditions.keys().any(|key| key.trim().is_empty()) {
                return Err(ConfigError::invalid_value(
                    format!("{} '{}'.compatible_with", section, self.name),
                    "condition keys cannot be empty",
                ));
            }
        }

        Ok(())
    }
}
