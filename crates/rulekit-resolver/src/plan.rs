//! Whole-table resolution
//!
//! [`Resolver::resolve_all`] resolves every non-manual rule of a table for
//! one platform. Rules are independent, so they resolve in parallel; the
//! plan keeps a verdict per rule in name order.

use crate::error::{ResolveError, ResolveResult};
use crate::platform::Platform;
use crate::resolver::{IncompatibleReason, Resolution, ResolvedTarget, Resolver};
use crate::table::Rule;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Outcome for one rule of a plan
#[derive(Debug)]
pub enum Verdict {
    Resolved(Box<ResolvedTarget>),
    Incompatible(IncompatibleReason),
    Failed(ResolveError),
}

impl Verdict {
    /// Short status word
    pub fn status(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "resolved",
            Self::Incompatible(_) => "incompatible",
            Self::Failed(_) => "failed",
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedTarget> {
        match self {
            Self::Resolved(resolved) => Some(resolved),
            _ => None,
        }
    }
}

impl From<ResolveResult<Resolution>> for Verdict {
    fn from(result: ResolveResult<Resolution>) -> Self {
        match result {
            Ok(Resolution::Compatible(resolved)) => Self::Resolved(resolved),
            Ok(Resolution::Incompatible(reason)) => Self::Incompatible(reason),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Resolution of every wildcard-buildable rule for a platform
#[derive(Debug)]
pub struct BuildPlan {
    pub platform: Platform,
    /// Verdict per rule name
    pub verdicts: BTreeMap<String, Verdict>,
    /// Rules tagged `manual`
    pub skipped: Vec<String>,
}

impl BuildPlan {
    pub fn get(&self, name: &str) -> Option<&Verdict> {
        self.verdicts.get(name)
    }

    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedTarget> {
        self.verdicts.values().filter_map(Verdict::resolved)
    }

    pub fn incompatible(&self) -> impl Iterator<Item = &IncompatibleReason> {
        self.verdicts.values().filter_map(|verdict| match verdict {
            Verdict::Incompatible(reason) => Some(reason),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ResolveError)> {
        self.verdicts
            .iter()
            .filter_map(|(name, verdict)| match verdict {
                Verdict::Failed(err) => Some((name.as_str(), err)),
                _ => None,
            })
    }

    /// No rule failed to resolve
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Names of resolved rules
    pub fn resolved_names(&self) -> Vec<&str> {
        self.resolved().map(|resolved| resolved.name()).collect()
    }

    /// Summary line for the rules left out of the build
    pub fn skipping_message(&self) -> Option<String> {
        let incompatible: Vec<&str> = self
            .incompatible()
            .map(|reason| reason.target.as_str())
            .collect();
        if incompatible.is_empty() {
            return None;
        }
        Some(format!(
            "Skipping {} target(s) incompatible with {}: {}",
            incompatible.len(),
            self.platform,
            incompatible.join(", ")
        ))
    }
}

impl fmt::Display for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} resolved, {} incompatible, {} failed, {} skipped",
            self.platform,
            self.resolved().count(),
            self.incompatible().count(),
            self.failures().count(),
            self.skipped.len()
        )
    }
}

impl<'a> Resolver<'a> {
    /// Resolve every non-manual rule of the table for a platform
    ///
    /// Per-rule failures are recorded in the plan; only a worker pool that
    /// cannot be created fails the call. `settings.jobs` bounds parallelism.
    pub fn resolve_all(&self, platform: &Platform) -> ResolveResult<BuildPlan> {
        let (skipped, rules): (Vec<&Rule>, Vec<&Rule>) = self
            .table()
            .rules()
            .partition(|rule| rule.target().tags.is_manual());

        let resolve = || -> Vec<(String, Verdict)> {
            rules
                .par_iter()
                .map(|rule| {
                    let verdict = Verdict::from(self.resolve_rule(rule, platform));
                    debug!(target_name = rule.name(), %platform, status = verdict.status());
                    (rule.name().to_string(), verdict)
                })
                .collect()
        };

        let verdicts = match self.settings().jobs {
            Some(jobs) => rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| ResolveError::WorkerPool(e.to_string()))?
                .install(resolve),
            None => resolve(),
        };

        let plan = BuildPlan {
            platform: platform.clone(),
            verdicts: verdicts.into_iter().collect(),
            skipped: skipped.iter().map(|rule| rule.name().to_string()).collect(),
        };

        info!("{}", plan);
        Ok(plan)
    }
}
