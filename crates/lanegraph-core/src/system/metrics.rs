//! # Graph Metrics
//!
//! Summary counts of a lane graph for status reporting.

use crate::graph::LaneGraph;
use crate::system::verify_yaw;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Summary metrics of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    /// Distinct lane ids carried by nodes.
    pub lane_count: usize,
    /// Nodes touched by no edge.
    pub isolated_nodes: usize,
    /// Sum of Euclidean edge lengths.
    pub total_edge_length: f64,
    /// Edges whose source yaw is off by more than the threshold.
    pub misaligned_edges: usize,
}

impl GraphMetrics {
    /// Compute metrics from a graph, using `yaw_threshold` for alignment.
    #[must_use]
    pub fn from_graph(graph: &LaneGraph, yaw_threshold: f64) -> Self {
        let nodes = graph.nodes();
        let edges = graph.edges();

        let lanes: BTreeSet<_> = nodes.iter().map(|node| node.lane_id).collect();
        let connected: BTreeSet<_> = edges.iter().flat_map(|e| [e.from, e.to]).collect();
        let isolated_nodes = nodes
            .iter()
            .filter(|node| !connected.contains(&node.id))
            .count();

        let total_edge_length = edges
            .iter()
            .filter_map(|edge| {
                let from = graph.node(edge.from)?;
                let to = graph.node(edge.to)?;
                Some(from.position().distance_to(to.position()))
            })
            .sum();

        let misaligned_edges = verify_yaw(nodes, edges, yaw_threshold)
            .iter()
            .filter(|check| !check.aligned)
            .count();

        Self {
            node_count: nodes.len(),
            edge_count: edges.len(),
            lane_count: lanes.len(),
            isolated_nodes,
            total_edge_length,
            misaligned_edges,
        }
    }
}
