//! # Property-Based Tests
//!
//! Invariants of the graph store, path search and smoother under random
//! editing sequences.

use lanegraph_core::{
    Edge, Indicator, LaneGraph, LaneId, NodeId, PathMode, Point, PropertyUpdate, SmoothingParams,
    find_path, smooth_segment, validate_state,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// HELPERS
// =============================================================================

/// A graph of `count` nodes on a jittered grid plus the requested edges.
fn build_graph(count: usize, links: &[(usize, usize)]) -> LaneGraph {
    let mut graph = LaneGraph::new_empty();
    let ids: Vec<NodeId> = (0..count)
        .map(|i| {
            let x = (i % 7) as f64 * 2.0 + (i as f64 * 0.37).sin();
            let y = (i / 7) as f64 * 2.0;
            graph.add_node(x, y, LaneId((i % 3) as i64)).expect("add")
        })
        .collect();
    for &(a, b) in links {
        if a < count && b < count && a != b {
            // Duplicates are rejected and leave the graph as it was.
            let _ = graph.add_edge(ids[a], ids[b]);
        }
    }
    graph
}

fn pick(graph: &LaneGraph, indices: &[usize]) -> BTreeSet<NodeId> {
    let nodes = graph.nodes();
    if nodes.is_empty() {
        return BTreeSet::new();
    }
    indices.iter().map(|i| nodes[i % nodes.len()].id).collect()
}

#[derive(Debug, Clone)]
enum Edit {
    Add(f64, f64),
    Delete(Vec<usize>),
    Connect(usize, usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (-100.0..100.0f64, -100.0..100.0f64).prop_map(|(x, y)| Edit::Add(x, y)),
        vec(0usize..64, 1..4).prop_map(Edit::Delete),
        (0usize..64, 0usize..64).prop_map(|(a, b)| Edit::Connect(a, b)),
    ]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Surviving node ids are pairwise distinct after any add/delete sequence,
    /// and ids are never handed out twice.
    #[test]
    fn ids_stay_unique(edits in vec(edit_strategy(), 1..60)) {
        let mut graph = LaneGraph::new_empty();
        let mut issued = BTreeSet::new();

        for edit in edits {
            match edit {
                Edit::Add(x, y) => {
                    let id = graph.add_node(x, y, LaneId(0)).expect("add");
                    prop_assert!(issued.insert(id), "id {} issued twice", id);
                }
                Edit::Delete(indices) => {
                    let targets = pick(&graph, &indices);
                    if !targets.is_empty() {
                        graph.delete_points(&targets).expect("delete");
                    }
                }
                Edit::Connect(a, b) => {
                    let ends: Vec<NodeId> = pick(&graph, &[a, b]).into_iter().collect();
                    if let [from, to] = ends[..] {
                        let _ = graph.add_edge(from, to);
                    }
                }
            }
            prop_assert!(validate_state(graph.nodes(), graph.edges()).is_ok());
        }
    }

    /// No surviving edge references a deleted id.
    #[test]
    fn delete_keeps_referential_integrity(
        count in 2usize..30,
        links in vec((0usize..30, 0usize..30), 0..60),
        doomed in vec(0usize..30, 1..10),
    ) {
        let mut graph = build_graph(count, &links);
        let targets = pick(&graph, &doomed);
        graph.delete_points(&targets).expect("delete");

        for edge in graph.edges() {
            prop_assert!(!targets.contains(&edge.from));
            prop_assert!(!targets.contains(&edge.to));
            prop_assert!(graph.contains_node(edge.from));
            prop_assert!(graph.contains_node(edge.to));
        }
        for id in &targets {
            prop_assert!(!graph.contains_node(*id));
        }
    }

    /// Undo restores the exact pre-operation state and redo the post-operation one.
    #[test]
    fn undo_redo_symmetry(
        count in 3usize..20,
        links in vec((0usize..20, 0usize..20), 0..30),
        op in 0usize..5,
        targets in vec(0usize..20, 1..5),
    ) {
        let mut graph = build_graph(count, &links);
        let before = graph.snapshot();
        let selection = pick(&graph, &targets);

        let applied = match op {
            0 => graph.add_node(1.5, -2.5, LaneId(4)).is_ok(),
            1 => graph.delete_points(&selection).map(|n| n > 0).unwrap_or(false),
            2 => graph.change_lane_id(&selection, LaneId(9)).map(|n| n > 0).unwrap_or(false),
            3 => graph.reverse_indicators(&selection).map(|n| n > 0).unwrap_or(false),
            _ => {
                let path: Vec<NodeId> = graph.nodes().iter().take(3).map(|n| n.id).collect();
                graph.reverse_path(&path).is_ok()
            }
        };
        prop_assume!(applied);
        let after = graph.snapshot();

        let undone = graph.undo();
        prop_assert!(undone.success);
        prop_assert_eq!(&graph.snapshot(), &before);

        let redone = graph.redo();
        prop_assert!(redone.success);
        prop_assert_eq!(&graph.snapshot(), &after);
    }

    /// Reversing indicators twice restores them and never touches yaw.
    #[test]
    fn indicator_reversal_is_an_involution(
        codes in vec(0u8..4, 3..20),
        links in vec((0usize..20, 0usize..20), 0..30),
    ) {
        let mut graph = build_graph(codes.len(), &links);
        let ids: Vec<NodeId> = graph.nodes().iter().map(|n| n.id).collect();
        for (id, code) in ids.iter().zip(&codes) {
            let update = PropertyUpdate {
                zone: None,
                indicator: Some(Indicator::try_from(*code).expect("code")),
            };
            graph
                .update_node_properties(&[*id].into_iter().collect(), update)
                .expect("update");
        }
        let before = graph.nodes().to_vec();
        let all: BTreeSet<NodeId> = ids.iter().copied().collect();

        graph.reverse_indicators(&all).expect("reverse");
        graph.reverse_indicators(&all).expect("reverse");

        for (old, new) in before.iter().zip(graph.nodes()) {
            prop_assert_eq!(old.indicator, new.indicator);
            prop_assert_eq!(old.yaw.to_bits(), new.yaw.to_bits());
        }
    }

    /// Directed routes only use forward edges, possibly from end to start.
    #[test]
    fn directed_routes_follow_edges(
        count in 2usize..25,
        links in vec((0usize..25, 0usize..25), 1..50),
        start in 0usize..25,
        end in 0usize..25,
    ) {
        let graph = build_graph(count, &links);
        let start = graph.nodes()[start % count].id;
        let end = graph.nodes()[end % count].id;

        if let Some(path) = find_path(graph.edges(), start, end, PathMode::Directed) {
            let first = path.first().copied();
            let last = path.last().copied();
            prop_assert!(
                (first == Some(start) && last == Some(end))
                    || (first == Some(end) && last == Some(start))
            );
            for pair in path.windows(2) {
                prop_assert!(graph.edges().contains(&Edge::new(pair[0], pair[1])));
            }
            let unique: BTreeSet<_> = path.iter().collect();
            prop_assert_eq!(unique.len(), path.len());
        }
    }

    /// Relaxed search finds a route whenever directed search does.
    #[test]
    fn relaxed_is_never_weaker(
        count in 2usize..25,
        links in vec((0usize..25, 0usize..25), 1..50),
        start in 0usize..25,
        end in 0usize..25,
    ) {
        let graph = build_graph(count, &links);
        let start = graph.nodes()[start % count].id;
        let end = graph.nodes()[end % count].id;

        if let Some(directed) = find_path(graph.edges(), start, end, PathMode::Directed) {
            let relaxed = find_path(graph.edges(), start, end, PathMode::Relaxed);
            prop_assert!(relaxed.is_some_and(|r| r.len() <= directed.len()));
        }
    }

    /// Smoothing a well-spaced anchored path succeeds and keeps both endpoints bit for bit.
    #[test]
    fn smoother_keeps_endpoints(
        offsets in vec(-1.0..1.0f64, 5..16),
        smoothness in 0.0..5.0f64,
        weight in 0.1..10.0f64,
    ) {
        let points: Vec<Point> = offsets
            .iter()
            .enumerate()
            .map(|(i, dy)| Point::new(i as f64 * 1.5, *dy))
            .collect();
        let mut graph = LaneGraph::new_empty();
        let ids = graph.add_polyline(&points, LaneId(0), None).expect("polyline");
        let path = &ids[1..ids.len() - 1];

        let result = smooth_segment(
            graph.nodes(),
            graph.edges(),
            path,
            SmoothingParams::new(smoothness, weight),
        );
        prop_assert!(result.is_ok(), "smoothing failed: {:?}", result);
        let coords = result.expect("checked above");
        prop_assert_eq!(coords.len(), path.len());
        prop_assert_eq!(coords[0], points[1]);
        prop_assert_eq!(coords[coords.len() - 1], points[points.len() - 2]);
    }

    /// Paths of two nodes are always rejected.
    #[test]
    fn smoother_rejects_two_node_paths(x in -10.0..10.0f64, y in -10.0..10.0f64) {
        let mut graph = LaneGraph::new_empty();
        let ids = graph
            .add_polyline(&[Point::new(0.0, 0.0), Point::new(x, y)], LaneId(0), None)
            .expect("polyline");
        let result = smooth_segment(graph.nodes(), graph.edges(), &ids, SmoothingParams::default());
        prop_assert!(result.is_err());
    }

    /// After add_edge the source faces its target.
    #[test]
    fn edge_sets_source_yaw(
        ax in -50.0..50.0f64, ay in -50.0..50.0f64,
        bx in -50.0..50.0f64, by in -50.0..50.0f64,
    ) {
        let mut graph = LaneGraph::new_empty();
        let a = graph.add_node(ax, ay, LaneId(0)).expect("add");
        let b = graph.add_node(bx, by, LaneId(0)).expect("add");
        graph.add_edge(a, b).expect("edge");

        let yaw = graph.node(a).expect("node").yaw;
        prop_assert!((yaw - (by - ay).atan2(bx - ax)).abs() < 1e-12);
    }
}
