//! # Graph Benchmarks
//!
//! Performance benchmarks for lanegraph-core editing, routing and smoothing.
//!
//! Run with: `cargo bench -p lanegraph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lanegraph_core::{
    LaneGraph, LaneId, NodeId, PathMode, Point, SmoothingParams, find_path, smooth_segment,
};
use std::collections::BTreeSet;
use std::hint::black_box;

/// A single lane of `size` waypoints along a gentle wave.
fn wave(size: usize) -> Vec<Point> {
    (0..size)
        .map(|i| {
            let x = i as f64 * 2.0;
            Point::new(x, (x * 0.1).sin() * 3.0)
        })
        .collect()
}

fn create_lane(size: usize) -> (LaneGraph, Vec<NodeId>) {
    let mut graph = LaneGraph::new_empty();
    let ids = graph
        .add_polyline(&wave(size), LaneId(0), None)
        .expect("polyline");
    (graph, ids)
}

/// A ladder of two parallel lanes joined by a rung every tenth node,
/// running against each other so only relaxed routes cross rungs freely.
fn create_ladder(size: usize) -> (LaneGraph, Vec<NodeId>, Vec<NodeId>) {
    let mut graph = LaneGraph::new_empty();
    let upper = graph
        .add_polyline(&wave(size), LaneId(0), None)
        .expect("polyline");
    let lower_points: Vec<Point> = wave(size)
        .into_iter()
        .rev()
        .map(|p| Point::new(p.x, p.y - 4.0))
        .collect();
    let lower = graph
        .add_polyline(&lower_points, LaneId(1), None)
        .expect("polyline");
    for i in (0..size).step_by(10) {
        graph
            .add_edge(upper[i], lower[size - 1 - i])
            .expect("rung");
    }
    (graph, upper, lower)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_polyline_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("polyline_insertion");

    for size in [100, 1000, 5000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_lane(size)));
        });
    }

    group.finish();
}

fn bench_delete_with_undo(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_with_undo");

    for size in [100, 1000].iter() {
        let (graph, ids) = create_lane(*size);
        let doomed: BTreeSet<NodeId> = ids.iter().step_by(3).copied().collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut graph = graph.clone();
                graph.delete_points(&doomed).expect("delete");
                black_box(graph.undo())
            });
        });
    }

    group.finish();
}

fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");

    for size in [100, 1000, 5000].iter() {
        let (graph, upper, lower) = create_ladder(*size);
        let start = upper[0];
        let end = lower[0];

        group.bench_with_input(BenchmarkId::new("directed", size), size, |b, _| {
            b.iter(|| {
                black_box(find_path(
                    graph.edges(),
                    black_box(start),
                    black_box(end),
                    PathMode::Directed,
                ))
            });
        });
        group.bench_with_input(BenchmarkId::new("relaxed", size), size, |b, _| {
            b.iter(|| {
                black_box(find_path(
                    graph.edges(),
                    black_box(start),
                    black_box(end),
                    PathMode::Relaxed,
                ))
            });
        });
    }

    group.finish();
}

fn bench_smooth_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("smooth_segment");

    for size in [10, 50, 200, 1000].iter() {
        let (graph, ids) = create_lane(*size + 2);
        let path = &ids[1..ids.len() - 1];
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(smooth_segment(
                    graph.nodes(),
                    graph.edges(),
                    path,
                    SmoothingParams::default(),
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_polyline_insertion,
    bench_delete_with_undo,
    bench_find_path,
    bench_smooth_segment,
);
criterion_main!(benches);
