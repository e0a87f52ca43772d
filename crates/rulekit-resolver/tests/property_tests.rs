//! Property-based tests for resolution invariants

use proptest::prelude::*;
use rulekit_resolver::{
    ConstraintMap, Platform, Resolution, ResolveError, Resolver, Settings, Target, TargetTable,
    INCOMPATIBLE,
};

const PLATFORMS: &[&str] = &[
    "x86_64-unknown-linux-gnu",
    "aarch64-apple-darwin",
    "x86_64-pc-windows-msvc",
    "wasm32-unknown-unknown",
    "riscv32imc-unknown-none-elf",
];

/// Per target: dependency picks (only lower indices, so the graph is acyclic)
/// and which platforms are listed as compatible
fn arb_dag() -> impl Strategy<Value = Vec<(Vec<usize>, Vec<bool>)>> {
    prop::collection::vec(
        (
            prop::collection::vec(0..32usize, 0..4),
            prop::collection::vec(any::<bool>(), PLATFORMS.len()),
        ),
        1..12,
    )
}

fn build_table(spec: &[(Vec<usize>, Vec<bool>)]) -> TargetTable {
    let mut table = TargetTable::new();
    for (index, (picks, listed)) in spec.iter().enumerate() {
        let mut deps: Vec<String> = Vec::new();
        if index > 0 {
            for pick in picks {
                let dep = format!("crate_{}", pick % index);
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
        }

        let constraints = ConstraintMap::compatible_with(
            PLATFORMS
                .iter()
                .zip(listed)
                .filter(|(_, listed)| **listed)
                .map(|(id, _)| Platform::new(*id).unwrap()),
        );

        table
            .insert(
                Target::library(format!("crate_{}", index))
                    .with_deps(deps)
                    .with_constraints(constraints),
            )
            .unwrap();
    }
    table
}

proptest! {
    #[test]
    fn resolution_is_deterministic(spec in arb_dag(), platform_index in 0..PLATFORMS.len()) {
        let table = build_table(&spec);
        let settings = Settings::default();
        let resolver = Resolver::new(&table, &settings).unwrap();
        let platform = Platform::new(PLATFORMS[platform_index]).unwrap();

        for name in table.names() {
            let first = resolver.resolve(name, &platform).unwrap();
            let second = resolver.resolve(name, &platform).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn compatible_closure_is_compatible(spec in arb_dag(), platform_index in 0..PLATFORMS.len()) {
        let table = build_table(&spec);
        let settings = Settings::default();
        let resolver = Resolver::new(&table, &settings).unwrap();
        let platform = Platform::new(PLATFORMS[platform_index]).unwrap();

        for name in table.names() {
            if let Resolution::Compatible(resolved) = resolver.resolve(name, &platform).unwrap() {
                for unit in &resolved.closure {
                    let dep = resolver.resolve(&unit.key.name, &platform).unwrap();
                    prop_assert!(dep.is_compatible());
                }
            }
        }
    }

    #[test]
    fn incompatible_dependency_makes_dependent_incompatible(
        spec in arb_dag(),
        platform_index in 0..PLATFORMS.len(),
    ) {
        let table = build_table(&spec);
        let settings = Settings::default();
        let resolver = Resolver::new(&table, &settings).unwrap();
        let platform = Platform::new(PLATFORMS[platform_index]).unwrap();

        for rule in table.rules() {
            let resolution = resolver.resolve(rule.name(), &platform).unwrap();
            let any_dep_incompatible = rule.target().deps.iter().any(|dep| {
                !resolver.resolve(dep, &platform).unwrap().is_compatible()
            });
            if any_dep_incompatible {
                prop_assert!(!resolution.is_compatible());
            }
        }
    }

    #[test]
    fn ring_is_reported_as_cycle(len in 2..8usize) {
        let mut table = TargetTable::new();
        for i in 0..len {
            table
                .insert(Target::library(format!("n{}", i)).with_deps(vec![format!("n{}", (i + 1) % len)]))
                .unwrap();
        }
        let settings = Settings::default();
        let resolver = Resolver::new(&table, &settings).unwrap();
        let platform = Platform::new("x86_64-unknown-linux-gnu").unwrap();

        match resolver.resolve("n0", &platform) {
            Err(ResolveError::CyclicDependency { path }) => {
                prop_assert_eq!(path.len(), len + 1);
                prop_assert_eq!(path.first(), path.last());
            }
            other => prop_assert!(false, "expected CyclicDependency, got {:?}", other),
        }
    }

    #[test]
    fn unlisted_platform_falls_to_default(id in "[a-z0-9_]{3,12}-unknown-[a-z]{3,8}") {
        prop_assume!(!PLATFORMS.contains(&id.as_str()));
        let map = ConstraintMap::compatible_with(PLATFORMS.iter().map(|p| Platform::new(*p).unwrap()));
        let platform = Platform::new(id).unwrap();
        prop_assert!(!map.is_compatible_with(&platform));

        let open = ConstraintMap::new().with_default(Vec::new());
        prop_assert!(open.is_compatible_with(&platform));

        let closed = ConstraintMap::new().with_default(vec![INCOMPATIBLE.to_string()]);
        prop_assert!(!closed.is_compatible_with(&platform));
    }
}
