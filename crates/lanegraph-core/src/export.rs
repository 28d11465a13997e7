//! # Canonical Export
//!
//! The directed-graph shape downstream consumers read: every node keyed by id
//! with its attributes, and every edge with a `weight` equal to the Euclidean
//! distance between its endpoints.
//!
//! The export is independent of internal storage order. Nodes are sorted by
//! id and edges by `(from, to)`, so two graphs with the same content export
//! identically.

use crate::graph::LaneGraph;
use crate::{Edge, Indicator, LaneGraphError, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub zone: i64,
    pub width: f64,
    pub indicator: Indicator,
}

impl From<&Node> for ExportNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            x: node.x,
            y: node.y,
            yaw: node.yaw,
            zone: node.zone,
            width: node.width,
            indicator: node.indicator,
        }
    }
}

/// A directed edge with its length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

/// The canonical directed export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportGraph {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl ExportGraph {
    /// Build the export of a node/edge pair.
    ///
    /// Every edge must reference known nodes.
    pub fn from_parts(nodes: &[Node], edges: &[Edge]) -> Result<Self, LaneGraphError> {
        let by_id: BTreeMap<NodeId, &Node> = nodes.iter().map(|node| (node.id, node)).collect();

        let mut sorted_edges = edges.to_vec();
        sorted_edges.sort_unstable();

        let edges = sorted_edges
            .iter()
            .map(|edge| {
                let from = by_id
                    .get(&edge.from)
                    .ok_or(LaneGraphError::NodeNotFound(edge.from))?;
                let to = by_id
                    .get(&edge.to)
                    .ok_or(LaneGraphError::NodeNotFound(edge.to))?;
                Ok(ExportEdge {
                    from: edge.from,
                    to: edge.to,
                    weight: from.position().distance_to(to.position()),
                })
            })
            .collect::<Result<Vec<_>, LaneGraphError>>()?;

        Ok(Self {
            nodes: by_id.values().map(|node| ExportNode::from(*node)).collect(),
            edges,
        })
    }

    /// Export the live state of `graph`.
    pub fn from_graph(graph: &LaneGraph) -> Result<Self, LaneGraphError> {
        Self::from_parts(graph.nodes(), graph.edges())
    }

    /// Sum of all edge weights.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.edges.iter().map(|edge| edge.weight).sum()
    }
}

// =============================================================================
// TESTS
// =============================================================================
