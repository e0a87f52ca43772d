//! Target table
//!
//! The immutable set of rules a resolution runs against, keyed by name.

use crate::build_order::{BuildGraph, UnitNode};
use crate::error::{ResolveError, ResolveResult};
use crate::script::BuildScriptTarget;
use crate::targets::Target;
use rulekit_config::RulesManifest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rule in the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Target(Target),
    BuildScript(BuildScriptTarget),
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.target().name
    }

    /// Common target fields
    pub fn target(&self) -> &Target {
        match self {
            Self::Target(target) => target,
            Self::BuildScript(script) => &script.target,
        }
    }

    pub fn as_build_script(&self) -> Option<&BuildScriptTarget> {
        match self {
            Self::BuildScript(script) => Some(script),
            Self::Target(_) => None,
        }
    }

    pub fn is_build_script(&self) -> bool {
        matches!(self, Self::BuildScript(_))
    }
}

impl From<Target> for Rule {
    fn from(target: Target) -> Self {
        Self::Target(target)
    }
}

impl From<BuildScriptTarget> for Rule {
    fn from(script: BuildScriptTarget) -> Self {
        Self::BuildScript(script)
    }
}

/// Rules by name
#[derive(Debug, Clone, Default)]
pub struct TargetTable {
    rules: BTreeMap<String, Rule>,
}

impl TargetTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a rules manifest
    pub fn from_manifest(manifest: &RulesManifest) -> ResolveResult<Self> {
        let mut table = Self::new();
        for decl in &manifest.targets {
            table.insert(Target::from_decl(decl)?)?;
        }
        for decl in &manifest.build_scripts {
            table.insert(BuildScriptTarget::from_decl(decl)?)?;
        }
        Ok(table)
    }

    /// Add a rule; names must be unique
    pub fn insert(&mut self, rule: impl Into<Rule>) -> ResolveResult<()> {
        let rule = rule.into();
        rule.target().validate()?;

        if self.rules.contains_key(rule.name()) {
            return Err(ResolveError::DuplicateTarget {
                target: rule.name().to_string(),
            });
        }

        self.rules.insert(rule.name().to_string(), rule);
        Ok(())
    }

    /// Builder-style insert
    pub fn with(mut self, rule: impl Into<Rule>) -> ResolveResult<Self> {
        self.insert(rule)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Rules in name order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check every dependency exists and the declared graph is acyclic
    ///
    /// Considers every edge a rule can have on some platform, including
    /// optional dependencies and labels selected by constraint maps.
    pub fn validate(&self) -> ResolveResult<()> {
        let mut graph = BuildGraph::new();

        for rule in self.rules() {
            let target = rule.target();
            let mut deps = Vec::new();
            for dep in target.all_dependency_names() {
                if !self.rules.contains_key(dep) {
                    return Err(ResolveError::unresolved(&target.name, dep));
                }
                deps.push(dep.to_string());
            }
            graph.add_unit(UnitNode::new(&target.name).with_dependencies(deps));
        }

        graph.compute_build_order()?;
        Ok(())
    }
}
