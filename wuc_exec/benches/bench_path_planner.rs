//! # Path Planner Benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use comms_if::{
    geom::{Location, Pose},
    tick::{CellOffset, CostVector, LocalCell},
};
use wuc_lib::{
    map::{MapParams, WorldMap},
    nav::{EdgeCostMode, PathPlanner, PathPlannerParams},
};

fn path_planner_benchmark(c: &mut Criterion) {
    // ---- Build a random map ----

    // 6 m by 40 m lane at 250 mm resolution
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let local_grid: Vec<LocalCell> = (0..160)
        .flat_map(|row| (0..24).map(move |col| CellOffset::new(row, col)))
        .map(|offset| LocalCell {
            offset,
            costs: CostVector::new(
                rng.gen_range(0.5..5.0),
                rng.gen_range(0.5..5.0),
                rng.gen_range(0.5..5.0),
                rng.gen_range(0.5..5.0),
            ),
        })
        .collect();

    let mut map = WorldMap::new(MapParams {
        grid_resolution_mm: 250,
        ..Default::default()
    });
    map.expand(&Pose::new(0, 0, 90.0), &local_grid);

    let params = PathPlannerParams {
        lane_spans: vec![(0, 6000)],
        edge_cost_mode: EdgeCostMode::Magnitude,
        ..Default::default()
    };
    let planner = PathPlanner::new(params.clone());

    let start = Pose::new(3000, 100, 90.0);
    let goal = Location::new(1000, 39_000);

    c.bench_function("PathPlanner::plan::magnitude", |b| {
        b.iter(|| planner.plan(&map, &start, &goal).unwrap())
    });

    // Signed costs may hit the search limit, which is part of what's being measured
    let signed = PathPlanner::new(PathPlannerParams {
        edge_cost_mode: EdgeCostMode::Signed,
        max_expansions: 20_000,
        ..params
    });

    c.bench_function("PathPlanner::plan::signed", |b| {
        b.iter(|| signed.plan(&map, &start, &goal).ok())
    });

    c.bench_function("PathPlanner::distance", |b| {
        b.iter(|| planner.distance(&start.location(), &goal))
    });
}

criterion_group!(benches, path_planner_benchmark);
criterion_main!(benches);
