//! # Formats
//!
//! Interchange shapes and binary encodings, plus the seam through which a
//! collaborator persists graph state.

mod persistence;
mod rows;

pub use persistence::{
    LaneData, PersistenceHeader, SerializableGraph, graph_from_bytes, graph_to_bytes,
    lane_from_bytes, lane_to_bytes,
};
pub use rows::{
    EdgeRow, LegacyNodeRow, NodeRow, edge_from_fields, node_from_fields, node_to_fields,
};

use crate::LaneGraphError;

/// Writes graph state somewhere durable.
///
/// The engine never calls this on its own. Callers decide when to persist,
/// typically after a command completes. A failure leaves the in-memory graph
/// untouched.
pub trait PersistenceAdapter {
    /// Persist the full state of a session: nodes, edges, lane names and
    /// the id allocation point.
    fn persist(&mut self, state: &SerializableGraph) -> Result<(), LaneGraphError>;
}
