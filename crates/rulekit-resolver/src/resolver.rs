//! Compatibility resolution
//!
//! [`Resolver::resolve`] decides whether a target participates in a build for
//! the active platform and, if it does, resolves its dependency closure:
//! - the target's constraint map is looked up by exact platform, then by
//!   `//conditions:default`
//! - an incompatible dependency makes its dependents incompatible
//! - build-script dependencies and proc-macros resolve on the host platform
//! - features requested through `dep/feature` entries are unified onto the
//!   dependency's unit
//! - cycles are reported with the full path
//!
//! Resolution is a pure function of the table, the settings and the platform.

use crate::build_order::{BuildGraph, UnitNode};
use crate::constraint::Selection;
use crate::error::{ResolveError, ResolveResult};
use crate::features::flatten_features;
use crate::platform::{Platform, DEFAULT_CONDITION};
use crate::script::ScriptContext;
use crate::table::{Rule, TargetTable};
use crate::targets::{Target, TargetKind};
use rulekit_config::Settings;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, trace};

/// A target at a platform
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UnitKey {
    pub name: String,
    pub platform: Platform,
}

impl UnitKey {
    pub fn new(name: impl Into<String>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            platform,
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.platform)
    }
}

/// One resolved build unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUnit {
    pub key: UnitKey,
    pub kind: TargetKind,
    /// Flattened features
    pub features: BTreeSet<String>,
    /// Target flags followed by the settings' extra flags
    pub rustc_flags: Vec<String>,
    /// Direct dependencies, in declaration order
    pub deps: Vec<UnitKey>,
    /// Environment produced by direct build-script dependencies
    pub build_script_env: BTreeMap<String, String>,
    /// Dependency name -> import name, for renamed direct dependencies
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}

/// A compatible target with its resolved dependency closure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    /// The original rule
    pub rule: Rule,
    /// The rule resolved at the requested platform
    pub unit: ResolvedUnit,
    /// Transitive dependencies, each after its own dependencies
    pub closure: Vec<ResolvedUnit>,
}

impl ResolvedTarget {
    pub fn name(&self) -> &str {
        self.rule.name()
    }

    pub fn target(&self) -> &Target {
        self.rule.target()
    }

    pub fn platform(&self) -> &Platform {
        &self.unit.key.platform
    }

    /// Whether `name` is anywhere in the closure
    pub fn depends_on(&self, name: &str) -> bool {
        self.closure.iter().any(|unit| unit.key.name == name)
    }

    /// Closure unit for a target at a platform
    pub fn closure_unit(&self, name: &str, platform: &Platform) -> Option<&ResolvedUnit> {
        self.closure
            .iter()
            .find(|unit| unit.key.name == name && &unit.key.platform == platform)
    }

    /// Names in the closure, in build order
    pub fn closure_names(&self) -> Vec<&str> {
        self.closure
            .iter()
            .map(|unit| unit.key.name.as_str())
            .collect()
    }

    pub fn runs_clippy(&self) -> bool {
        self.target().tags.runs_clippy()
    }

    pub fn runs_rustfmt(&self) -> bool {
        self.target().tags.runs_rustfmt()
    }

    /// Split the closure and the target into groups that can build concurrently
    pub fn build_groups(&self) -> ResolveResult<Vec<Vec<String>>> {
        let mut graph = BuildGraph::new();
        for unit in self.closure.iter().chain(std::iter::once(&self.unit)) {
            graph.add_unit(
                UnitNode::new(unit.key.to_string())
                    .with_dependencies(unit.deps.iter().map(|dep| dep.to_string()).collect()),
            );
        }
        graph.validate()?;
        graph.parallel_build_groups()
    }

    /// SHA-256 over the resolution, stable across runs
    pub fn fingerprint(&self) -> ResolveResult<String> {
        let encoded = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Why a target is incompatible
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompatibleReason {
    pub target: String,
    pub platform: Platform,
    pub cause: IncompatibleCause,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum IncompatibleCause {
    /// The target's own constraint map selected the incompatible marker
    UnsatisfiedCondition { via_default: bool },
    /// A dependency is incompatible
    Dependency { reason: Box<IncompatibleReason> },
}

impl IncompatibleReason {
    /// The target whose own constraints caused the incompatibility
    pub fn root_cause(&self) -> &IncompatibleReason {
        match &self.cause {
            IncompatibleCause::UnsatisfiedCondition { .. } => self,
            IncompatibleCause::Dependency { reason } => reason.root_cause(),
        }
    }

    /// Whether the target itself, rather than a dependency, is incompatible
    pub fn is_direct(&self) -> bool {
        matches!(self.cause, IncompatibleCause::UnsatisfiedCondition { .. })
    }
}

impl fmt::Display for IncompatibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            IncompatibleCause::UnsatisfiedCondition { via_default } => {
                let condition = if *via_default {
                    DEFAULT_CONDITION
                } else {
                    self.platform.as_str()
                };
                write!(
                    f,
                    "{} is incompatible with {} (matched {})",
                    self.target, self.platform, condition
                )
            }
            IncompatibleCause::Dependency { reason } => write!(f, "{} -> {}", self.target, reason),
        }
    }
}

/// Outcome of resolving one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Compatible(Box<ResolvedTarget>),
    Incompatible(IncompatibleReason),
}

impl Resolution {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible(_))
    }

    pub fn resolved(&self) -> Option<&ResolvedTarget> {
        match self {
            Self::Compatible(resolved) => Some(resolved),
            Self::Incompatible(_) => None,
        }
    }

    pub fn into_resolved(self) -> Option<ResolvedTarget> {
        match self {
            Self::Compatible(resolved) => Some(*resolved),
            Self::Incompatible(_) => None,
        }
    }
}

/// Resolves targets of a table against platforms
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    table: &'a TargetTable,
    settings: &'a Settings,
    host: Option<Platform>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver
    ///
    /// An explicitly configured host platform must ship host tools.
    pub fn new(table: &'a TargetTable, settings: &'a Settings) -> ResolveResult<Self> {
        let host = settings
            .host_platform
            .as_deref()
            .map(Platform::new)
            .transpose()?;

        if let Some(host) = &host {
            if !host.has_host_tools() {
                return Err(ResolveError::NoHostTools(host.to_string()));
            }
        }

        Ok(Self {
            table,
            settings,
            host,
        })
    }

    pub fn table(&self) -> &'a TargetTable {
        self.table
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    /// Configured host platform, if any
    pub fn host_platform(&self) -> Option<&Platform> {
        self.host.as_ref()
    }

    /// Resolve a target of the table by name
    pub fn resolve(&self, name: &str, platform: &Platform) -> ResolveResult<Resolution> {
        let rule = self
            .table
            .get(name)
            .ok_or_else(|| ResolveError::target_not_found(name))?;
        self.resolve_rule(rule, platform)
    }

    /// Resolve a rule against the table
    ///
    /// The rule does not need to be in the table; its dependencies do.
    /// The closure is walked again whenever a walk requests features the
    /// previous one did not enable, until the requests settle.
    pub fn resolve_rule(&self, rule: &Rule, platform: &Platform) -> ResolveResult<Resolution> {
        let host = self.host.clone().unwrap_or_else(|| platform.clone());
        let mut requested: BTreeMap<UnitKey, BTreeSet<String>> = BTreeMap::new();

        loop {
            let mut walk = Walk::new(self, host.clone(), &requested);
            let outcome = walk.visit(rule, platform)?;
            let unified = walk.unified_requests();
            if unified == requested {
                return Ok(walk.finish(rule, platform, outcome));
            }
            trace!(target_name = rule.name(), %platform, "feature requests grew, walking again");
            requested = unified;
        }
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Compatible(ResolvedUnit),
    Incompatible(IncompatibleReason),
}

/// One dependency-closure traversal
struct Walk<'r, 'a> {
    resolver: &'r Resolver<'a>,
    host: Platform,
    /// Features dependents requested on each unit in earlier walks
    requested: &'r BTreeMap<UnitKey, BTreeSet<String>>,
    /// Features dependents requested on each unit in this walk
    demanded: BTreeMap<UnitKey, BTreeSet<String>>,
    /// Units on the current resolution path
    path: Vec<UnitKey>,
    /// Finished units
    done: BTreeMap<UnitKey, Outcome>,
    /// Compatible units in completion order
    order: Vec<UnitKey>,
}

impl<'r, 'a> Walk<'r, 'a> {
    fn new(
        resolver: &'r Resolver<'a>,
        host: Platform,
        requested: &'r BTreeMap<UnitKey, BTreeSet<String>>,
    ) -> Self {
        Self {
            resolver,
            host,
            requested,
            demanded: BTreeMap::new(),
            path: Vec::new(),
            done: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// Earlier requests merged with this walk's
    fn unified_requests(&self) -> BTreeMap<UnitKey, BTreeSet<String>> {
        let mut unified = self.requested.clone();
        for (key, features) in &self.demanded {
            unified
                .entry(key.clone())
                .or_default()
                .extend(features.iter().cloned());
        }
        unified
    }

    fn finish(self, rule: &Rule, platform: &Platform, outcome: Outcome) -> Resolution {
        match outcome {
            Outcome::Incompatible(reason) => {
                debug!(target_name = rule.name(), %platform, "incompatible: {}", reason);
                Resolution::Incompatible(reason)
            }
            Outcome::Compatible(unit) => {
                let closure = self
                    .order
                    .iter()
                    .filter(|k| **k != unit.key)
                    .filter_map(|k| match self.done.get(k) {
                        Some(Outcome::Compatible(unit)) => Some(unit.clone()),
                        _ => None,
                    })
                    .collect();

                Resolution::Compatible(Box::new(ResolvedTarget {
                    rule: rule.clone(),
                    unit,
                    closure,
                }))
            }
        }
    }

    fn visit(&mut self, rule: &Rule, platform: &Platform) -> ResolveResult<Outcome> {
        let key = UnitKey::new(rule.name(), platform.clone());

        if let Some(outcome) = self.done.get(&key) {
            return Ok(outcome.clone());
        }

        if let Some(start) = self.path.iter().position(|k| *k == key) {
            let mut path: Vec<String> = self.path[start..]
                .iter()
                .map(|k| k.name.clone())
                .collect();
            path.push(key.name.clone());
            return Err(ResolveError::CyclicDependency { path });
        }

        self.path.push(key.clone());
        let outcome = self.visit_uncached(rule, platform);
        self.path.pop();

        let outcome = outcome?;
        if matches!(outcome, Outcome::Compatible(_)) {
            self.order.push(key.clone());
        }
        self.done.insert(key, outcome.clone());
        Ok(outcome)
    }

    fn visit_uncached(&mut self, rule: &Rule, platform: &Platform) -> ResolveResult<Outcome> {
        let target = rule.target();

        let selected: Vec<String> = match &target.constraints {
            None => Vec::new(),
            Some(constraints) => match constraints.select(platform) {
                None => {
                    return Err(ResolveError::NoMatchingCondition {
                        target: target.name.clone(),
                        platform: platform.to_string(),
                    })
                }
                Some(Selection::Incompatible { via_default }) => {
                    trace!(target_name = %target.name, %platform, via_default, "constraint selected incompatible");
                    return Ok(Outcome::Incompatible(IncompatibleReason {
                        target: target.name.clone(),
                        platform: platform.clone(),
                        cause: IncompatibleCause::UnsatisfiedCondition { via_default },
                    }));
                }
                Some(Selection::Compatible(labels)) => {
                    labels.into_iter().map(str::to_string).collect()
                }
            },
        };

        let key = UnitKey::new(&target.name, platform.clone());
        let mut wanted = target.features.clone();
        if let Some(extra) = self.requested.get(&key) {
            wanted.extend(extra.iter().cloned());
        }
        let features = flatten_features(&wanted, &target.feature_map);

        // Build scripts run on the host, and so does everything they depend on
        let dep_platform = if rule.is_build_script() {
            self.host.clone()
        } else {
            platform.clone()
        };

        let mut edges: Vec<(&str, Platform)> = Vec::new();
        for dep in target.deps.iter().chain(&selected) {
            edges.push((dep.as_str(), dep_platform.clone()));
        }
        for dep in &target.optional_deps {
            self.lookup(target, dep)?;
            if features.activated_deps.contains(target.local_name(dep)) {
                edges.push((dep.as_str(), dep_platform.clone()));
            }
        }
        for dep in &target.proc_macro_deps {
            edges.push((dep.as_str(), self.host.clone()));
        }

        let mut deps: Vec<UnitKey> = Vec::new();
        let mut aliases = BTreeMap::new();
        let mut build_script_env = BTreeMap::new();
        // Every edge is walked even after one turns out incompatible, so
        // cycles and dangling names further down are still reported.
        let mut blocked: Option<IncompatibleReason> = None;

        for (dep, dep_platform) in edges {
            let dep_rule = self.lookup(target, dep)?;
            let dep_platform = if dep_rule.target().kind.runs_on_host() {
                self.host.clone()
            } else {
                dep_platform
            };
            debug!(target_name = %target.name, dependency = dep, platform = %dep_platform, "resolving dependency");

            let dep_key = UnitKey::new(dep, dep_platform.clone());
            let dep_features: Vec<String> = features
                .requested_for(target.local_name(dep))
                .cloned()
                .collect();
            if !dep_features.is_empty() {
                self.demanded
                    .entry(dep_key)
                    .or_default()
                    .extend(dep_features);
            }

            match self.visit(dep_rule, &dep_platform)? {
                Outcome::Incompatible(reason) => {
                    if blocked.is_none() {
                        blocked = Some(reason);
                    }
                }
                Outcome::Compatible(dep_unit) => {
                    if let Some(script) = dep_rule.as_build_script() {
                        let ctx = ScriptContext {
                            script,
                            package_name: &target.name,
                            package_version: target.version.as_deref(),
                            target_platform: platform,
                            host_platform: &self.host,
                            features: &features.enabled,
                        };
                        build_script_env.extend(ctx.environment());
                    }
                    if let Some(alias) = target.aliases.get(dep) {
                        aliases.insert(dep.to_string(), alias.clone());
                    }
                    if !deps.contains(&dep_unit.key) {
                        deps.push(dep_unit.key);
                    }
                }
            }
        }

        if let Some(reason) = blocked {
            return Ok(Outcome::Incompatible(IncompatibleReason {
                target: target.name.clone(),
                platform: platform.clone(),
                cause: IncompatibleCause::Dependency {
                    reason: Box::new(reason),
                },
            }));
        }

        let mut rustc_flags = target.rustc_flags.clone();
        rustc_flags.extend(self.resolver.settings.extra_rustc_flags.iter().cloned());

        Ok(Outcome::Compatible(ResolvedUnit {
            key,
            kind: target.kind,
            features: features.enabled,
            rustc_flags,
            deps,
            build_script_env,
            aliases,
        }))
    }

    fn lookup(&self, target: &Target, dep: &str) -> ResolveResult<&'a Rule> {
        self.resolver
            .table
            .get(dep)
            .ok_or_else(|| ResolveError::unresolved(&target.name, dep))
    }
}
