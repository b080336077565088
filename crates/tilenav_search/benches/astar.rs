use tilenav_core::prelude::*;
use tilenav_search::prelude::*;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use utilities::data_sets::{open_field, open_store};

fn astar_open_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("astar_open_field");
    for side in [16, 32, 64].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(side), side, |b, &side| {
            let backend = open_field(side);
            let mut map = open_store(&backend, 64);
            let start = Pose2::at(0.5, 0.5);
            let goal = Pose2::at(side as f64 - 0.5, side as f64 / 2.0);

            b.iter(|| astar_search(&mut map, &start, &goal, true, 0.0));
        });
    }
    group.finish();
}

fn route_four_interior(c: &mut Criterion) {
    let backend = open_field(32);
    let mut map = open_store(&backend, 64);
    let waypoints: Vec<Pose2> = [(0, 0), (20, 3), (5, 25), (12, 12), (28, 8), (31, 31)]
        .iter()
        .map(|&(x, y)| Pose2::at(x as f64 + 0.5, y as f64 + 0.5))
        .collect();

    c.bench_function("route_four_interior", |b| {
        let mut optimizer = RouteOptimizer::new();
        b.iter(|| optimizer.optimize(&mut map, &waypoints, 0.0))
    });
}

criterion_group!(benches, astar_open_field, route_four_interior);
criterion_main!(benches);
