//! # Core Type Definitions
//!
//! This module contains all core types for the lane graph engine:
//! - Identifiers (`NodeId`, `LaneId`)
//! - Waypoint records (`Node`, `Edge`, `Point`)
//! - The turn-signal annotation (`Indicator`)
//! - Error types (`LaneGraphError`)
//!
//! Every record uses named fields. Node rows in the interchange format are
//! positional, but that mapping lives in `formats` and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::smoothing::SmoothError;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for a waypoint node.
///
/// Allocated monotonically by the graph store and never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grouping label of a node: the source lane file or user-drawn path it belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct LaneId(pub i64);

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// INDICATOR
// =============================================================================

/// Turn-signal annotation carried by a node.
///
/// The discriminants are the wire codes. Both `Unset` (0) and `None` (1) mean
/// "no signal"; they are kept apart so a row survives a load/save cycle unchanged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum Indicator {
    #[default]
    Unset = 0,
    None = 1,
    Right = 2,
    Left = 3,
}

impl Indicator {
    /// The indicator seen when driving the lane the other way: right and left swap.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Right => Self::Left,
            Self::Left => Self::Right,
            other => other,
        }
    }

    /// The wire code of this indicator.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Indicator {
    type Error = LaneGraphError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Unset),
            1 => Ok(Self::None),
            2 => Ok(Self::Right),
            3 => Ok(Self::Left),
            other => Err(LaneGraphError::InvalidIndicator(other.to_string())),
        }
    }
}

impl TryFrom<f64> for Indicator {
    type Error = LaneGraphError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&value) {
            return Err(LaneGraphError::InvalidIndicator(value.to_string()));
        }
        Self::try_from(value as u8)
    }
}

impl FromStr for Indicator {
    type Err = LaneGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "right" => return Ok(Self::Right),
            "left" => return Ok(Self::Left),
            _ => {}
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| LaneGraphError::InvalidIndicator(trimmed.to_string()))?;
        Self::try_from(value)
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// A planar coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Heading in radians from `self` towards `other`.
    #[must_use]
    pub fn bearing_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

// =============================================================================
// NODE & EDGE
// =============================================================================

/// A waypoint in the lane graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    /// Heading in radians. Rewritten whenever an outgoing edge is created.
    pub yaw: f64,
    /// Lane this waypoint belongs to.
    pub lane_id: LaneId,
    pub zone: i64,
    pub width: f64,
    pub indicator: Indicator,
}

impl Node {
    /// Create a node with zero heading and default annotations.
    #[must_use]
    pub fn new(id: NodeId, x: f64, y: f64, lane_id: LaneId) -> Self {
        Self {
            id,
            x,
            y,
            yaw: 0.0,
            lane_id,
            zone: 0,
            width: 0.0,
            indicator: Indicator::default(),
        }
    }

    /// Position of this node.
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A directed connection expressing travel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    #[must_use]
    pub const fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }

    /// The same connection travelled the other way.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }

    /// Whether this edge touches `id` at either end.
    #[must_use]
    pub fn touches(&self, id: NodeId) -> bool {
        self.from == id || self.to == id
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the lane graph engine.
///
/// Recoverable rejections leave the graph untouched; callers report
/// "nothing happened" and carry on. `InvariantViolation` signals a defect in
/// the store itself and aborts the operation.
#[derive(Debug, Error)]
pub enum LaneGraphError {
    /// The requested node was not found in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The exact ordered edge already exists.
    #[error("Edge already exists: {0} -> {1}")]
    DuplicateEdge(NodeId, NodeId),

    /// A node id appears more than once in supplied data.
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// The operation was given no ids to work on.
    #[error("Empty selection")]
    EmptySelection,

    /// No edge along the given path could be reversed.
    #[error("No edges found to reverse along the path")]
    NothingToReverse,

    /// No route connects the two requested nodes.
    #[error("No path found: {0} -> {1}")]
    NoPath(NodeId, NodeId),

    /// There is no pending smoothing preview to apply.
    #[error("No smoothing preview pending")]
    NoPendingPreview,

    /// An indicator code outside {0, 1, 2, 3}.
    #[error("Invalid indicator: {0}")]
    InvalidIndicator(String),

    /// A property value that could not be coerced to its field type.
    #[error("Invalid value for {field}: {value}")]
    InvalidProperty { field: &'static str, value: String },

    /// A numeric row with the wrong shape or non-representable values.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Segment smoothing could not produce a fit.
    #[error("Smoothing failed: {0}")]
    Smoothing(#[from] SmoothError),

    /// Coordinates and path ids disagree in length.
    #[error("Length mismatch: {expected} path ids, {actual} coordinates")]
    LengthMismatch { expected: usize, actual: usize },

    /// The store broke one of its own invariants. Never expected.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LaneGraphError {
    /// Whether the caller may simply retry with different input.
    ///
    /// Only invariant violations are fatal; everything else left the graph
    /// exactly as it was.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
