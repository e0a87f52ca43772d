/// Build target types
use crate::constraint::ConstraintMap;
use crate::error::{ResolveError, ResolveResult};
use rulekit_config::{CrateKind, TargetDecl};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Kind of build target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// Reusable library crate
    Library,
    /// Procedural macro crate, loaded by the compiler on the host
    ProcMacro,
    /// Executable binary
    Binary,
    /// Build script run before compiling its parent crate
    BuildScript,
}

impl TargetKind {
    /// Whether this kind executes on the host while building
    pub fn runs_on_host(&self) -> bool {
        matches!(self, Self::ProcMacro | Self::BuildScript)
    }

    /// Whether this kind requires an explicit crate root
    pub fn requires_crate_root(&self) -> bool {
        matches!(self, Self::BuildScript)
    }
}

impl From<CrateKind> for TargetKind {
    fn from(kind: CrateKind) -> Self {
        match kind {
            CrateKind::Library => Self::Library,
            CrateKind::ProcMacro => Self::ProcMacro,
            CrateKind::Binary => Self::Binary,
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::ProcMacro => write!(f, "proc-macro"),
            Self::Binary => write!(f, "binary"),
            Self::BuildScript => write!(f, "build-script"),
        }
    }
}

/// Target tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Excluded from wildcard builds
    pub fn is_manual(&self) -> bool {
        self.contains("manual")
    }

    pub fn runs_clippy(&self) -> bool {
        !self.contains("noclippy")
    }

    pub fn runs_rustfmt(&self) -> bool {
        !self.contains("norustfmt")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|tag| tag.as_str())
    }
}

/// A build target specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name
    pub name: String,
    /// Target kind
    pub kind: TargetKind,
    /// Source file globs
    pub srcs: Vec<String>,
    /// Crate root, relative to the package
    pub crate_root: Option<PathBuf>,
    /// Language edition
    pub edition: String,
    /// Crate version
    pub version: Option<String>,
    /// Enabled features
    pub features: BTreeSet<String>,
    /// Feature name -> implied features and dependency activations
    pub feature_map: BTreeMap<String, Vec<String>>,
    /// Compiler flags
    pub rustc_flags: Vec<String>,
    /// Compile-time environment
    pub rustc_env: BTreeMap<String, String>,
    /// Tags
    pub tags: Tags,
    /// Dependencies (target names)
    pub deps: Vec<String>,
    /// Proc-macro dependencies, resolved on the host platform
    pub proc_macro_deps: Vec<String>,
    /// Dependencies activated only by features
    pub optional_deps: Vec<String>,
    /// Dependency name -> name it is imported under
    pub aliases: BTreeMap<String, String>,
    /// Platform constraints; `None` means compatible everywhere
    pub constraints: Option<ConstraintMap>,
}

impl Target {
    /// Create a new target
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            srcs: Vec::new(),
            crate_root: None,
            edition: "2015".to_string(),
            version: None,
            features: BTreeSet::new(),
            feature_map: BTreeMap::new(),
            rustc_flags: Vec::new(),
            rustc_env: BTreeMap::new(),
            tags: Tags::default(),
            deps: Vec::new(),
            proc_macro_deps: Vec::new(),
            optional_deps: Vec::new(),
            aliases: BTreeMap::new(),
            constraints: None,
        }
    }

    /// Create a library target
    pub fn library(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::Library).with_sources(vec!["src/**/*.rs".to_string()])
    }

    /// Set source globs
    pub fn with_sources(mut self, srcs: Vec<String>) -> Self {
        self.srcs = srcs;
        self
    }

    /// Set the crate root
    pub fn with_crate_root(mut self, crate_root: impl Into<PathBuf>) -> Self {
        self.crate_root = Some(crate_root.into());
        self
    }

    /// Set the edition
    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.edition = edition.into();
        self
    }

    /// Set the version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set dependencies
    pub fn with_deps(mut self, deps: Vec<String>) -> Self {
        self.deps = deps;
        self
    }

    /// Set proc-macro dependencies
    pub fn with_proc_macro_deps(mut self, deps: Vec<String>) -> Self {
        self.proc_macro_deps = deps;
        self
    }

    /// Set optional dependencies
    pub fn with_optional_deps(mut self, deps: Vec<String>) -> Self {
        self.optional_deps = deps;
        self
    }

    /// Import a dependency under another name
    pub fn with_alias(mut self, dep: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.insert(dep.into(), alias.into());
        self
    }

    /// Name a dependency is referred to by in this target's feature map
    pub fn local_name<'t>(&'t self, dep: &'t str) -> &'t str {
        self.aliases.get(dep).map(String::as_str).unwrap_or(dep)
    }

    /// Set enabled features
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Add a feature map entry
    pub fn with_feature(mut self, feature: impl Into<String>, implies: Vec<String>) -> Self {
        self.feature_map.insert(feature.into(), implies);
        self
    }

    /// Set compiler flags
    pub fn with_rustc_flags(mut self, flags: Vec<String>) -> Self {
        self.rustc_flags = flags;
        self
    }

    /// Set tags
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Set platform constraints
    pub fn with_constraints(mut self, constraints: ConstraintMap) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Convert a manifest declaration
    pub fn from_decl(decl: &TargetDecl) -> ResolveResult<Self> {
        let constraints = decl
            .compatible_with
            .as_ref()
            .map(ConstraintMap::from_conditions)
            .transpose()?;

        Ok(Self {
            name: decl.name.clone(),
            kind: decl.kind.into(),
            srcs: decl.srcs.clone(),
            crate_root: decl.crate_root.clone(),
            edition: decl.edition.clone(),
            version: decl.version.clone(),
            features: decl.features.iter().cloned().collect(),
            feature_map: decl.feature_map.clone(),
            rustc_flags: decl.rustc_flags.clone(),
            rustc_env: decl.rustc_env.clone(),
            tags: Tags::new(decl.tags.iter().cloned()),
            deps: decl.deps.clone(),
            proc_macro_deps: decl.proc_macro_deps.clone(),
            optional_deps: decl.optional_deps.clone(),
            aliases: decl.aliases.clone(),
            constraints,
        })
    }

    /// Every dependency name the target can refer to, including labels its
    /// constraint map may select
    pub fn all_dependency_names(&self) -> impl Iterator<Item = &str> {
        self.deps
            .iter()
            .chain(&self.proc_macro_deps)
            .chain(&self.optional_deps)
            .map(|dep| dep.as_str())
            .chain(self.constraints.iter().flat_map(|c| c.all_labels()))
    }

    /// Validate the target configuration
    pub fn validate(&self) -> ResolveResult<()> {
        if self.name.is_empty() {
            return Err(ResolveError::invalid_target(
                "<unnamed>",
                "target name cannot be empty",
            ));
        }

        if self.srcs.is_empty() {
            return Err(ResolveError::invalid_target(
                &self.name,
                "target has no source files",
            ));
        }

        if self.kind.requires_crate_root() && self.crate_root.is_none() {
            return Err(ResolveError::invalid_target(
                &self.name,
                format!("{} target requires a crate root", self.kind),
            ));
        }

        if !rulekit_config::is_valid_edition(&self.edition) {
            return Err(ResolveError::invalid_target(
                &self.name,
                format!("invalid edition '{}'", self.edition),
            ));
        }

        if let Some(dep) = self.aliases.keys().find(|dep| {
            !self.deps.contains(dep)
                && !self.proc_macro_deps.contains(dep)
                && !self.optional_deps.contains(dep)
        }) {
            return Err(ResolveError::invalid_target(
                &self.name,
                format!("alias for '{}', which is not a dependency", dep),
            ));
        }

        if self.all_dependency_names().any(|dep| dep == self.name) {
            return Err(ResolveError::CyclicDependency {
                path: vec![self.name.clone(), self.name.clone()],
            });
        }

        Ok(())
    }
}
