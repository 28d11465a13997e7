//! # Yaw Alignment
//!
//! Compares each node's stored heading with the bearing of its outgoing edges.
//!
//! Yaw is rewritten whenever an edge is created, so a misaligned edge points
//! at a node that was moved afterwards, or at data imported from elsewhere.

use crate::{Edge, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};

/// Heading check of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YawCheck {
    pub from: NodeId,
    pub to: NodeId,
    /// Absolute wrapped difference between stored yaw and edge bearing, in `[0, PI]`.
    pub diff: f64,
    pub aligned: bool,
}

/// Wrap an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Check every edge's source yaw against the edge bearing.
///
/// Edges with an unknown endpoint are skipped.
#[must_use]
pub fn verify_yaw(nodes: &[Node], edges: &[Edge], threshold: f64) -> Vec<YawCheck> {
    let by_id: BTreeMap<NodeId, &Node> = nodes.iter().map(|node| (node.id, node)).collect();
    edges
        .iter()
        .filter_map(|edge| {
            let (Some(from), Some(to)) = (by_id.get(&edge.from), by_id.get(&edge.to)) else {
                tracing::warn!(
                    from = %edge.from,
                    to = %edge.to,
                    "edge with unknown endpoint skipped"
                );
                return None;
            };
            let bearing = from.position().bearing_to(to.position());
            let diff = wrap_angle(from.yaw - bearing).abs();
            Some(YawCheck {
                from: edge.from,
                to: edge.to,
                diff,
                aligned: diff <= threshold,
            })
        })
        .collect()
}
