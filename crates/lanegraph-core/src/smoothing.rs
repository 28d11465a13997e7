//! # Segment Smoother
//!
//! Replaces the waypoints of a path with samples of a smooth curve while
//! keeping its endpoints and its tangent continuity with the rest of the lane.
//!
//! Fitting points are the path itself plus one tangent anchor at each end:
//! the first neighbour of the endpoint (in either direction) that is not the
//! path's own second or second-to-last node. Anchors get a small weight, the
//! two true endpoints a very large one, and interior points the user weight.
//! The curve is parameterized by normalised chord length and fitted with a
//! cubic smoothing spline (see [`crate::spline`]). The output has exactly one
//! point per path node, evenly spaced in parameter between the two endpoint
//! parameters, and its first and last points are the original coordinates.

use crate::path::undirected_neighbors;
use crate::primitives::{
    ANCHOR_WEIGHT, DEFAULT_POINT_WEIGHT, DEFAULT_SMOOTHNESS, ENDPOINT_WEIGHT, MIN_SMOOTHNESS,
};
use crate::spline::fit_smoothing_spline;
use crate::{Edge, Node, NodeId, Point};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Tuning knobs for [`smooth_segment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Per-point smoothing budget. Scaled by the path length; floored at 0.1.
    pub smoothness: f64,
    /// Weight of interior path points. Lower values let the curve stray further.
    pub weight: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            smoothness: DEFAULT_SMOOTHNESS,
            weight: DEFAULT_POINT_WEIGHT,
        }
    }
}

impl SmoothingParams {
    #[must_use]
    pub const fn new(smoothness: f64, weight: f64) -> Self {
        Self { smoothness, weight }
    }

    /// Residual budget for a path of `len` nodes.
    #[must_use]
    pub fn smoothing_factor(&self, len: usize) -> f64 {
        self.smoothness.max(MIN_SMOOTHNESS) * len as f64
    }

    fn validate(&self) -> Result<(), SmoothError> {
        if !self.smoothness.is_finite() {
            return Err(SmoothError::InvalidParameter(format!(
                "smoothness {}",
                self.smoothness
            )));
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(SmoothError::InvalidParameter(format!(
                "weight {}",
                self.weight
            )));
        }
        Ok(())
    }
}

/// Reasons a segment cannot be smoothed. None of them touch the graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SmoothError {
    #[error("path has {0} nodes, at least 3 are needed")]
    PathTooShort(usize),

    #[error("node {0} has no coordinates")]
    UnknownNode(NodeId),

    #[error("path has {0} distinct positions, at least 3 are needed")]
    TooFewUniquePoints(usize),

    #[error("consecutive fitting points coincide")]
    DegenerateParameterization,

    #[error("{0} fitting points, a cubic fit needs at least 4")]
    TooFewFittingPoints(usize),

    #[error("invalid smoothing parameter: {0}")]
    InvalidParameter(String),

    #[error("spline system is singular")]
    SingularFit,
}

/// Compute smoothed coordinates for `path`, one per path node.
///
/// The graph is only read. `nodes` supplies coordinates and `edges` the
/// tangent anchors.
pub fn smooth_segment(
    nodes: &[Node],
    edges: &[Edge],
    path: &[NodeId],
    params: SmoothingParams,
) -> Result<Vec<Point>, SmoothError> {
    if path.len() < 3 {
        return Err(SmoothError::PathTooShort(path.len()));
    }
    params.validate()?;

    let positions: BTreeMap<NodeId, Point> =
        nodes.iter().map(|node| (node.id, node.position())).collect();
    let locate = |id: NodeId| positions.get(&id).copied().ok_or(SmoothError::UnknownNode(id));

    let coords = path
        .iter()
        .map(|&id| locate(id))
        .collect::<Result<Vec<_>, _>>()?;

    let unique = distinct_positions(&coords);
    if unique < 3 {
        return Err(SmoothError::TooFewUniquePoints(unique));
    }

    let last = path.len() - 1;
    let lead = anchor(edges, path[0], path[1])
        .map(locate)
        .transpose()?;
    let trail = anchor(edges, path[last], path[last - 1])
        .map(locate)
        .transpose()?;

    let mut fitting = Vec::with_capacity(coords.len() + 2);
    let mut weights = Vec::with_capacity(coords.len() + 2);
    if let Some(point) = lead {
        fitting.push(point);
        weights.push(ANCHOR_WEIGHT);
    }
    let start_idx = fitting.len();
    for (i, &point) in coords.iter().enumerate() {
        fitting.push(point);
        weights.push(if i == 0 || i == last {
            ENDPOINT_WEIGHT
        } else {
            params.weight
        });
    }
    let end_idx = fitting.len() - 1;
    if let Some(point) = trail {
        fitting.push(point);
        weights.push(ANCHOR_WEIGHT);
    }

    let u = chord_length_parameters(&fitting)?;
    let curve = fit_smoothing_spline(
        &fitting,
        &u,
        &weights,
        params.smoothing_factor(path.len()),
    )?;

    let (u_start, u_end) = (u[start_idx], u[end_idx]);
    let (lo, hi) = curve.domain();
    let step = (u_end - u_start) / last as f64;
    let mut smoothed: Vec<Point> = (0..path.len())
        .map(|i| curve.evaluate((u_start + step * i as f64).clamp(lo, hi)))
        .collect();
    smoothed[0] = coords[0];
    smoothed[last] = coords[last];

    if smoothed.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(SmoothError::SingularFit);
    }

    tracing::debug!(
        nodes = path.len(),
        fitting_points = fitting.len(),
        pieces = curve.piece_count(),
        "segment smoothed"
    );
    Ok(smoothed)
}

/// First neighbour of `endpoint`, in edge-list order, other than `inner`.
fn anchor(edges: &[Edge], endpoint: NodeId, inner: NodeId) -> Option<NodeId> {
    undirected_neighbors(edges, endpoint).find(|&id| id != inner)
}

fn distinct_positions(points: &[Point]) -> usize {
    // Adding 0.0 folds -0.0 into 0.0 before comparing bit patterns.
    points
        .iter()
        .map(|p| ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits()))
        .collect::<BTreeSet<_>>()
        .len()
}

/// Cumulative chord length normalised to `[0, 1]`.
fn chord_length_parameters(points: &[Point]) -> Result<Vec<f64>, SmoothError> {
    let mut params = Vec::with_capacity(points.len());
    let mut total = 0.0;
    params.push(0.0);
    for pair in points.windows(2) {
        let step = pair[0].distance_to(pair[1]);
        if step <= 0.0 || !step.is_finite() {
            return Err(SmoothError::DegenerateParameterization);
        }
        total += step;
        params.push(total);
    }
    for u in &mut params {
        *u /= total;
    }
    Ok(params)
}

// =============================================================================
// TESTS
// =============================================================================
