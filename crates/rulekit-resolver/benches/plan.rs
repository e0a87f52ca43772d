//! Resolution benchmarks
//!
//! A layered synthetic table where every crate depends on a few crates of
//! the layer below and carries a generated constraint map.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rulekit_resolver::{ConstraintMap, Platform, Resolver, Settings, Target, TargetTable};

const LAYER_WIDTH: usize = 40;

fn platforms() -> Vec<Platform> {
    Platform::host_tool_platforms().collect()
}

fn layered_table(layers: usize) -> TargetTable {
    let constraints = ConstraintMap::compatible_with(platforms());
    let mut table = TargetTable::new();

    for layer in 0..layers {
        for i in 0..LAYER_WIDTH {
            let deps = if layer == 0 {
                Vec::new()
            } else {
                (0..3)
                    .map(|k| format!("l{}_c{}", layer - 1, (i + k * 7) % LAYER_WIDTH))
                    .collect()
            };
            table
                .insert(
                    Target::library(format!("l{}_c{}", layer, i))
                        .with_deps(deps)
                        .with_constraints(constraints.clone()),
                )
                .unwrap();
        }
    }
    table
}

fn bench_resolve_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_single");
    let platform = Platform::new("x86_64-unknown-linux-gnu").unwrap();
    let settings = Settings::default();

    for layers in [2, 8, 16] {
        let table = layered_table(layers);
        let resolver = Resolver::new(&table, &settings).unwrap();
        let top = format!("l{}_c0", layers - 1);

        group.bench_with_input(BenchmarkId::from_parameter(layers), &top, |b, top| {
            b.iter(|| resolver.resolve(black_box(top), &platform).unwrap())
        });
    }
    group.finish();
}

fn bench_resolve_all(c: &mut Criterion) {
    let table = layered_table(8);
    let settings = Settings::default();
    let resolver = Resolver::new(&table, &settings).unwrap();
    let platform = Platform::new("aarch64-apple-darwin").unwrap();

    c.bench_function("resolve_all_320", |b| {
        b.iter(|| resolver.resolve_all(black_box(&platform)).unwrap())
    });
}

criterion_group!(benches, bench_resolve_single, bench_resolve_all);
criterion_main!(benches);
