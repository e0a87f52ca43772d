//! Rulekit target compatibility resolver
//!
//! Decides, for a table of generated build targets and an active platform,
//! which targets participate in the build and what each one links against:
//! - Platform identifiers and `select()`-style constraint maps
//! - Library, proc-macro, binary and build-script targets
//! - Dependency closure resolution with cycle detection
//! - Host-platform resolution for build scripts and proc-macros
//! - Feature flattening and optional dependency activation
//! - Parallel resolution of a whole table into a build plan

pub mod build_order;
pub mod constraint;
pub mod error;
pub mod features;
pub mod plan;
pub mod platform;
pub mod resolver;
pub mod script;
pub mod table;
pub mod targets;

// Re-export main types
pub use build_order::{BuildGraph, UnitNode};
pub use constraint::{ConstraintMap, Selection};
pub use error::{ResolveError, ResolveResult};
pub use features::{flatten_features, FeatureResolution};
pub use plan::{BuildPlan, Verdict};
pub use platform::{Platform, DEFAULT_CONDITION, INCOMPATIBLE};
pub use resolver::{
    IncompatibleCause, IncompatibleReason, Resolution, ResolvedTarget, ResolvedUnit, Resolver,
    UnitKey,
};
pub use script::{BuildScriptTarget, ScriptContext};
pub use table::{Rule, TargetTable};
pub use targets::{Tags, Target, TargetKind};

// Re-export config types for convenience
pub use rulekit_config::{RulesManifest, Settings};
