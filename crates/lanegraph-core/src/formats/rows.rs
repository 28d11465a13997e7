//! # Row Shapes
//!
//! The positional array shapes waypoints travel in between tools.
//!
//! - node row: `(id, x, y, yaw, zone, width, indicator)`
//! - legacy node row: `(id, x, y, yaw, lane_id)`
//! - edge row: `(from_id, to_id)`
//!
//! A 7-field row carries no lane; the loader supplies it. Legacy rows are
//! migrated with `zone`, `width` and `indicator` set to zero and every other
//! value kept exactly.

use crate::primitives::{LEGACY_NODE_ROW_FIELDS, NODE_ROW_FIELDS};
use crate::{Edge, Indicator, LaneGraphError, LaneId, Node, NodeId};
use serde::{Deserialize, Serialize};

/// Largest integer every `f64` below it represents exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A 7-field node row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub zone: i64,
    pub width: f64,
    pub indicator: u8,
}

impl NodeRow {
    /// Attach a lane and validate the indicator code.
    pub fn into_node(self, lane: LaneId) -> Result<Node, LaneGraphError> {
        Ok(Node {
            id: NodeId(self.id),
            x: self.x,
            y: self.y,
            yaw: self.yaw,
            lane_id: lane,
            zone: self.zone,
            width: self.width,
            indicator: Indicator::try_from(self.indicator)?,
        })
    }
}

impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.0,
            x: node.x,
            y: node.y,
            yaw: node.yaw,
            zone: node.zone,
            width: node.width,
            indicator: node.indicator.code(),
        }
    }
}

/// A legacy 5-field node row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyNodeRow {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub lane_id: i64,
}

impl From<LegacyNodeRow> for Node {
    fn from(row: LegacyNodeRow) -> Self {
        Self {
            id: NodeId(row.id),
            x: row.x,
            y: row.y,
            yaw: row.yaw,
            lane_id: LaneId(row.lane_id),
            zone: 0,
            width: 0.0,
            indicator: Indicator::Unset,
        }
    }
}

/// An edge row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRow {
    pub from: u64,
    pub to: u64,
}

impl From<&Edge> for EdgeRow {
    fn from(edge: &Edge) -> Self {
        Self {
            from: edge.from.0,
            to: edge.to.0,
        }
    }
}

impl From<EdgeRow> for Edge {
    fn from(row: EdgeRow) -> Self {
        Edge::new(NodeId(row.from), NodeId(row.to))
    }
}

fn integral(field: &str, value: f64) -> Result<f64, LaneGraphError> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        Ok(value)
    } else {
        Err(LaneGraphError::InvalidRow(format!(
            "{} must be an integer, got {}",
            field, value
        )))
    }
}

fn node_id(value: f64) -> Result<NodeId, LaneGraphError> {
    let value = integral("id", value)?;
    if value < 0.0 {
        return Err(LaneGraphError::InvalidRow(format!(
            "id must not be negative, got {}",
            value
        )));
    }
    Ok(NodeId(value as u64))
}

fn finite(field: &str, value: f64) -> Result<f64, LaneGraphError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LaneGraphError::InvalidRow(format!(
            "{} must be finite, got {}",
            field, value
        )))
    }
}

/// Build a node from a purely numeric row of either shape.
///
/// `default_lane` is used for 7-field rows; legacy rows bring their own.
pub fn node_from_fields(fields: &[f64], default_lane: LaneId) -> Result<Node, LaneGraphError> {
    match *fields {
        [id, x, y, yaw, zone, width, indicator] => {
            let indicator = Indicator::try_from(indicator)
                .map_err(|_| LaneGraphError::InvalidRow(format!("indicator {}", indicator)))?;
            Ok(Node {
                id: node_id(id)?,
                x: finite("x", x)?,
                y: finite("y", y)?,
                yaw: finite("yaw", yaw)?,
                lane_id: default_lane,
                zone: integral("zone", zone)? as i64,
                width: finite("width", width)?,
                indicator,
            })
        }
        [id, x, y, yaw, lane] => Ok(Node::from(LegacyNodeRow {
            id: node_id(id)?.0,
            x: finite("x", x)?,
            y: finite("y", y)?,
            yaw: finite("yaw", yaw)?,
            lane_id: integral("lane_id", lane)? as i64,
        })),
        _ => Err(LaneGraphError::InvalidRow(format!(
            "expected {} or {} fields, got {}",
            NODE_ROW_FIELDS,
            LEGACY_NODE_ROW_FIELDS,
            fields.len()
        ))),
    }
}

/// Build an edge from a 2-field numeric row.
pub fn edge_from_fields(fields: &[f64]) -> Result<Edge, LaneGraphError> {
    match *fields {
        [from, to] => Ok(Edge::new(node_id(from)?, node_id(to)?)),
        _ => Err(LaneGraphError::InvalidRow(format!(
            "expected 2 edge fields, got {}",
            fields.len()
        ))),
    }
}

/// The 7-field numeric row of `node`.
#[must_use]
pub fn node_to_fields(node: &Node) -> [f64; NODE_ROW_FIELDS] {
    [
        node.id.0 as f64,
        node.x,
        node.y,
        node.yaw,
        node.zone as f64,
        node.width,
        f64::from(node.indicator.code()),
    ]
}

// =============================================================================
// TESTS
// =============================================================================
