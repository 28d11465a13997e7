//! # Edit Scripts
//!
//! A JSON list of editing operations applied to a session in order:
//!
//! ```json
//! [
//!   {"op": "add_polyline", "points": [[0, 0], [5, 0], [10, 1]], "lane": 3},
//!   {"op": "add_edge", "from": 2, "to": 7},
//!   {"op": "set_properties", "ids": [4, 5], "indicator": "left"},
//!   {"op": "smooth", "start": 0, "end": 2},
//!   {"op": "undo"}
//! ]
//! ```
//!
//! A rejected operation leaves the session as it was and the script carries
//! on. An invariant violation stops the script.

use lanegraph_core::{
    LaneGraphError, LaneId, NodeId, PathMode, Point, PropertyUpdate, Session, SmoothingParams,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One editing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum EditOp {
    AddNode {
        x: f64,
        y: f64,
        #[serde(default)]
        lane: i64,
        /// Connect from this node to the new one.
        #[serde(default)]
        connect_from: Option<u64>,
    },
    AddPolyline {
        points: Vec<[f64; 2]>,
        #[serde(default)]
        lane: i64,
        #[serde(default)]
        connect_from: Option<u64>,
    },
    AddEdge {
        from: u64,
        to: u64,
    },
    Delete {
        ids: Vec<u64>,
    },
    BreakLinks {
        node: u64,
    },
    ChangeLane {
        ids: Vec<u64>,
        lane: i64,
    },
    SetProperties {
        ids: Vec<u64>,
        #[serde(default)]
        zone: Option<Value>,
        #[serde(default)]
        indicator: Option<Value>,
    },
    ReverseIndicators {
        ids: Vec<u64>,
    },
    ReversePath {
        start: u64,
        end: u64,
        #[serde(default)]
        force: bool,
    },
    RemoveBetween {
        start: u64,
        end: u64,
        #[serde(default)]
        force: bool,
    },
    Smooth {
        start: u64,
        end: u64,
        #[serde(default)]
        smoothness: Option<f64>,
        #[serde(default)]
        weight: Option<f64>,
        #[serde(default)]
        force: bool,
    },
    Undo,
    Redo,
}

/// What happened to one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpReport {
    pub index: usize,
    pub op: String,
    pub applied: bool,
    pub detail: String,
}

/// Parse a script from JSON text.
pub fn parse_script(text: &str) -> Result<Vec<EditOp>, LaneGraphError> {
    serde_json::from_str(text)
        .map_err(|e| LaneGraphError::SerializationError(format!("edit script: {}", e)))
}

fn id_set(ids: &[u64]) -> BTreeSet<NodeId> {
    ids.iter().copied().map(NodeId).collect()
}

/// Property values may be written as JSON strings or numbers; `null` means unset.
fn property_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn op_name(op: &EditOp) -> &'static str {
    match op {
        EditOp::AddNode { .. } => "add_node",
        EditOp::AddPolyline { .. } => "add_polyline",
        EditOp::AddEdge { .. } => "add_edge",
        EditOp::Delete { .. } => "delete",
        EditOp::BreakLinks { .. } => "break_links",
        EditOp::ChangeLane { .. } => "change_lane",
        EditOp::SetProperties { .. } => "set_properties",
        EditOp::ReverseIndicators { .. } => "reverse_indicators",
        EditOp::ReversePath { .. } => "reverse_path",
        EditOp::RemoveBetween { .. } => "remove_between",
        EditOp::Smooth { .. } => "smooth",
        EditOp::Undo => "undo",
        EditOp::Redo => "redo",
    }
}

/// Apply one operation. `Ok` says whether the session changed, with a short
/// description of the effect.
fn apply_op(
    session: &mut Session,
    op: &EditOp,
    defaults: SmoothingParams,
) -> Result<(bool, String), LaneGraphError> {
    match op {
        EditOp::AddNode {
            x,
            y,
            lane,
            connect_from,
        } => {
            let id =
                session.add_node_connected(*x, *y, LaneId(*lane), connect_from.map(NodeId))?;
            Ok((true, format!("node {}", id)))
        }
        EditOp::AddPolyline {
            points,
            lane,
            connect_from,
        } => {
            let points: Vec<Point> = points.iter().map(|[x, y]| Point::new(*x, *y)).collect();
            let ids = session.add_polyline(&points, LaneId(*lane), connect_from.map(NodeId))?;
            Ok((true, format!("{} nodes", ids.len())))
        }
        EditOp::AddEdge { from, to } => {
            session.add_edge(NodeId(*from), NodeId(*to))?;
            Ok((true, format!("edge {} -> {}", from, to)))
        }
        EditOp::Delete { ids } => {
            let removed = session.delete_points(&id_set(ids))?;
            Ok((true, format!("{} nodes removed", removed)))
        }
        EditOp::BreakLinks { node } => {
            let removed = session.break_links(NodeId(*node))?;
            Ok((true, format!("{} links removed", removed)))
        }
        EditOp::ChangeLane { ids, lane } => {
            let changed = session.change_lane_id(&id_set(ids), LaneId(*lane))?;
            Ok((true, format!("{} nodes moved to lane {}", changed, lane)))
        }
        EditOp::SetProperties {
            ids,
            zone,
            indicator,
        } => {
            let zone = property_text(zone.as_ref());
            let indicator = property_text(indicator.as_ref());
            let update = PropertyUpdate::parse(zone.as_deref(), indicator.as_deref())?;
            let updated = session.update_node_properties(&id_set(ids), update)?;
            Ok((true, format!("{} nodes updated", updated)))
        }
        EditOp::ReverseIndicators { ids } => {
            let flipped = session.reverse_indicators(&id_set(ids))?;
            Ok((true, format!("{} indicators reversed", flipped)))
        }
        EditOp::ReversePath { start, end, force } => {
            let mode = PathMode::from_force(*force);
            let reversed = session.reverse_between(NodeId(*start), NodeId(*end), mode)?;
            Ok((true, format!("{} edges reversed", reversed)))
        }
        EditOp::RemoveBetween { start, end, force } => {
            let mode = PathMode::from_force(*force);
            let removed = session.remove_between(NodeId(*start), NodeId(*end), mode)?;
            Ok((true, format!("{} nodes removed", removed)))
        }
        EditOp::Smooth {
            start,
            end,
            smoothness,
            weight,
            force,
        } => {
            let params = SmoothingParams::new(
                smoothness.unwrap_or(defaults.smoothness),
                weight.unwrap_or(defaults.weight),
            );
            session.preview_smooth(
                NodeId(*start),
                NodeId(*end),
                params,
                PathMode::from_force(*force),
            )?;
            let path = session.apply_smooth()?;
            Ok((true, format!("{} nodes smoothed", path.len())))
        }
        EditOp::Undo => {
            let success = session.undo().success;
            let detail = if success { "undone" } else { "nothing to undo" };
            Ok((success, detail.to_string()))
        }
        EditOp::Redo => {
            let success = session.redo().success;
            let detail = if success { "redone" } else { "nothing to redo" };
            Ok((success, detail.to_string()))
        }
    }
}

/// Apply `ops` in order and report on each.
///
/// Stops early only on an unrecoverable error, which is returned.
pub fn apply_script(
    session: &mut Session,
    ops: &[EditOp],
    defaults: SmoothingParams,
) -> Result<Vec<OpReport>, LaneGraphError> {
    let mut reports = Vec::with_capacity(ops.len());
    for (index, op) in ops.iter().enumerate() {
        let name = op_name(op);
        let (applied, detail) = match apply_op(session, op, defaults) {
            Ok(effect) => effect,
            Err(err) if err.is_recoverable() => {
                tracing::warn!(index, op = name, error = %err, "edit skipped");
                (false, err.to_string())
            }
            Err(err) => {
                tracing::error!(index, op = name, error = %err, "edit script aborted");
                return Err(err);
            }
        };
        reports.push(OpReport {
            index,
            op: name.to_string(),
            applied,
            detail,
        });
    }
    Ok(reports)
}

// =============================================================================
// TESTS
// =============================================================================
