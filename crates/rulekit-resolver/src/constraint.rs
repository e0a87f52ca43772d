//! Platform constraint maps
//!
//! A [`ConstraintMap`] is the explicit form of a `select()` over platforms:
//! an exact-match table plus an optional `//conditions:default` fallback.
//! The selected list is either empty (compatible), contains the
//! [`INCOMPATIBLE`] sentinel, or names extra dependencies.

use crate::error::{ResolveError, ResolveResult};
use crate::platform::{Platform, DEFAULT_CONDITION, INCOMPATIBLE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platform -> labels, with a default entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstraintMap {
    entries: BTreeMap<Platform, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Vec<String>>,
}

/// Outcome of selecting a constraint map entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    /// The platform is compatible; the labels are extra dependencies
    Compatible(Vec<&'a str>),
    /// The selected entry carries the incompatible sentinel
    Incompatible { via_default: bool },
}

impl ConstraintMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Map where the listed platforms are compatible and everything else is not
    ///
    /// This is the shape generated manifests use for third-party crates.
    pub fn compatible_with<I>(platforms: I) -> Self
    where
        I: IntoIterator<Item = Platform>,
    {
        Self {
            entries: platforms
                .into_iter()
                .map(|platform| (platform, Vec::new()))
                .collect(),
            default: Some(vec![INCOMPATIBLE.to_string()]),
        }
    }

    /// Build a map from raw condition keys
    ///
    /// Keys are bare platform identifiers, platform labels, or
    /// `//conditions:default`. Two keys naming the same platform are an
    /// error.
    pub fn from_conditions(conditions: &BTreeMap<String, Vec<String>>) -> ResolveResult<Self> {
        let mut map = Self::new();
        for (key, labels) in conditions {
            if key == DEFAULT_CONDITION {
                map.default = Some(labels.clone());
            } else {
                let platform = Platform::from_label(key)?;
                if map.entries.contains_key(&platform) {
                    return Err(ResolveError::DuplicateCondition {
                        platform: platform.to_string(),
                    });
                }
                map.entries.insert(platform, labels.clone());
            }
        }
        Ok(map)
    }

    /// Add an entry for a platform
    pub fn with_platform(mut self, platform: Platform, labels: Vec<String>) -> Self {
        self.entries.insert(platform, labels);
        self
    }

    /// Set the default entry
    pub fn with_default(mut self, labels: Vec<String>) -> Self {
        self.default = Some(labels);
        self
    }

    /// Platforms with an explicit entry
    pub fn platforms(&self) -> impl Iterator<Item = &Platform> {
        self.entries.keys()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Labels for a platform: exact entry first, then the default
    pub fn lookup(&self, platform: &Platform) -> Option<(&[String], bool)> {
        match self.entries.get(platform) {
            Some(labels) => Some((labels.as_slice(), false)),
            None => self.default.as_deref().map(|labels| (labels, true)),
        }
    }

    /// Select the entry for a platform
    ///
    /// Returns `None` when there is neither an exact entry nor a default.
    pub fn select(&self, platform: &Platform) -> Option<Selection<'_>> {
        let (labels, via_default) = self.lookup(platform)?;
        if labels.iter().any(|label| label == INCOMPATIBLE) {
            return Some(Selection::Incompatible { via_default });
        }
        Some(Selection::Compatible(
            labels.iter().map(|label| label.as_str()).collect(),
        ))
    }

    /// Whether the map resolves to compatible for a platform
    pub fn is_compatible_with(&self, platform: &Platform) -> bool {
        matches!(self.select(platform), Some(Selection::Compatible(_)))
    }

    /// Every label the map can select, across all entries
    pub fn all_labels(&self) -> impl Iterator<Item = &str> {
        self.entries
            .values()
            .chain(self.default.iter())
            .flatten()
            .map(|label| label.as_str())
            .filter(|label| *label != INCOMPATIBLE)
    }
}
