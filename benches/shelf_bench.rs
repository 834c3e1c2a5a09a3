//! Criterion benchmarks for u-shelf.
//!
//! Uses synthetic layouts (random widths, movement and block tags on a
//! fixed seed) to measure the allocation loop and partitioner.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_shelf::allocation::AllocationRunner;
use u_shelf::constraints::Pass;
use u_shelf::layout::{Classification, Fixture, FixtureId, Layout, Placement, PlacementId, Product};
use u_shelf::partition::Partitioner;
use u_shelf::{Planner, ShelfConfig};

// ===========================================================================
// Synthetic layouts
// ===========================================================================

fn synthetic(runs: usize, per_run: usize, seed: u64) -> Layout {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut layout = Layout::new(format!("synthetic-{runs}x{per_run}"));
    for r in 0..runs {
        layout.add_fixture(Fixture::shelf(FixtureId(r as u32), 0.0, 12.0).with_y(r as f64));
    }
    let larger = ["beverage", "snack", "dairy"];
    let divider = ["a", "b", "c", "d"];
    let mut next = 0u32;
    for r in 0..runs {
        let mut x = 0.0;
        for _ in 0..per_run {
            let id = format!("{}", 1000 + next);
            let width = rng.random_range(0.05..0.25);
            layout.add_product(
                Product::new(id.as_str(), width)
                    .with_movement(rng.random_range(0.0..30.0))
                    .with_classification(Classification::new(
                        larger[rng.random_range(0..larger.len())],
                        divider[rng.random_range(0..divider.len())],
                    )),
            );
            layout.add_placement(
                Placement::new(PlacementId(next), FixtureId(r as u32), id).at(x),
            );
            x += width;
            next += 1;
        }
    }
    layout
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_first_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_pass");
    group.sample_size(10);

    for (runs, per_run) in [(2usize, 8usize), (4, 16), (6, 24)] {
        let layout = synthetic(runs, per_run, 42);
        let config = ShelfConfig::default();
        group.bench_with_input(
            BenchmarkId::new(format!("r{}_p{}", runs, per_run), runs * per_run),
            &(layout, config),
            |b, (l, c)| {
                b.iter(|| {
                    let mut l = l.clone();
                    let result = AllocationRunner::run(&mut l, Pass::First, black_box(c), None);
                    black_box(result)
                })
            },
        );
    }
    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    group.sample_size(10);

    for &runs in &[2usize, 6] {
        let mut layout = synthetic(runs, 20, 7);
        let config = ShelfConfig::default();
        AllocationRunner::run(&mut layout, Pass::First, &config, None);
        group.bench_with_input(BenchmarkId::from_parameter(runs), &layout, |b, l| {
            b.iter(|| {
                let mut l = l.clone();
                black_box(Partitioner::apply(&mut l, &config.partition))
            })
        });
    }
    group.finish();
}

fn bench_full_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_plan");
    group.sample_size(10);

    let layout = synthetic(4, 12, 3);
    let template = Layout::new("template");
    let config = ShelfConfig::default();
    group.bench_function("r4_p12", |b| {
        b.iter(|| {
            let mut l = layout.clone();
            black_box(Planner::run(&mut l, Some(&template), &config, None))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_first_pass, bench_partition, bench_full_plan);
criterion_main!(benches);
