//! Feature flattening
//!
//! Expands a target's enabled features through its feature map, following the
//! Cargo conventions: `dep:<name>` activates an optional dependency,
//! `<dep>/<feature>` activates `<dep>` and turns `<feature>` on in it, and
//! `<dep>?/<feature>` is weak: it turns `<feature>` on only if `<dep>` is
//! activated some other way.

use std::collections::{BTreeMap, BTreeSet};

/// Flattened feature set and the optional dependencies it activates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureResolution {
    pub enabled: BTreeSet<String>,
    pub activated_deps: BTreeSet<String>,
    /// Dependency name -> features requested on it, weak requests included
    pub dep_features: BTreeMap<String, BTreeSet<String>>,
}

impl FeatureResolution {
    /// Features this target requests on `dep`
    pub fn requested_for(&self, dep: &str) -> impl Iterator<Item = &String> {
        self.dep_features.get(dep).into_iter().flatten()
    }
}

/// Flatten `requested` through `feature_map`
pub fn flatten_features(
    requested: &BTreeSet<String>,
    feature_map: &BTreeMap<String, Vec<String>>,
) -> FeatureResolution {
    let mut resolution = FeatureResolution::default();
    let mut stack: Vec<&str> = requested.iter().map(|f| f.as_str()).collect();

    while let Some(entry) = stack.pop() {
        if let Some(dep) = entry.strip_prefix("dep:") {
            resolution.activated_deps.insert(dep.to_string());
            continue;
        }

        if let Some((dep, feature)) = entry.split_once('/') {
            let dep = match dep.strip_suffix('?') {
                Some(weak) => weak,
                None => {
                    resolution.activated_deps.insert(dep.to_string());
                    dep
                }
            };
            resolution
                .dep_features
                .entry(dep.to_string())
                .or_default()
                .insert(feature.to_string());
            continue;
        }

        if resolution.enabled.insert(entry.to_string()) {
            if let Some(implied) = feature_map.get(entry) {
                stack.extend(implied.iter().map(|f| f.as_str()));
            }
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn map(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_transitive_features() {
        let features = map(&[
            ("default", &["std"]),
            ("std", &["alloc"]),
            ("alloc", &[]),
        ]);
        let resolution = flatten_features(&set(&["default"]), &features);
        assert_eq!(resolution.enabled, set(&["alloc", "default", "std"]));
        assert!(resolution.activated_deps.is_empty());
    }

    #[test]
    fn test_unknown_feature_still_enabled() {
        let resolution = flatten_features(&set(&["extra_traits"]), &BTreeMap::new());
        assert_eq!(resolution.enabled, set(&["extra_traits"]));
    }

    #[test]
    fn test_dep_activation() {
        let features = map(&[
            ("serde", &["dep:serde", "serde_derive/std"]),
            ("rc", &["serde?/rc"]),
        ]);
        let resolution = flatten_features(&set(&["serde", "rc"]), &features);
        assert_eq!(resolution.enabled, set(&["rc", "serde"]));
        assert_eq!(resolution.activated_deps, set(&["serde", "serde_derive"]));
    }

    #[test]
    fn test_dep_features_recorded() {
        let features = map(&[
            ("derive", &["serde/derive"]),
            ("rc", &["serde?/rc"]),
            ("std", &["serde/std", "memchr?/std"]),
        ]);
        let resolution = flatten_features(&set(&["derive", "rc", "std"]), &features);

        assert_eq!(resolution.activated_deps, set(&["serde"]));
        assert_eq!(
            resolution.requested_for("serde").cloned().collect::<BTreeSet<_>>(),
            set(&["derive", "rc", "std"])
        );
        assert_eq!(
            resolution.requested_for("memchr").cloned().collect::<BTreeSet<_>>(),
            set(&["std"])
        );
        assert_eq!(resolution.requested_for("libc").count(), 0);
    }

    #[test]
    fn test_feature_cycle_terminates() {
        let features = map(&[("a", &["b"]), ("b", &["a"])]);
        let resolution = flatten_features(&set(&["a"]), &features);
        assert_eq!(resolution.enabled, set(&["a", "b"]));
    }
}
