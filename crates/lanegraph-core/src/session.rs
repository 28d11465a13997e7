//! # Session Module
//!
//! An editing session: the graph store plus volatile editing state.
//!
//! The volatile part is the current selection and a pending smoothing
//! preview. It is never persisted and never recorded in history. Any
//! successful structural mutation discards a pending preview, because the
//! preview's path or coordinates may no longer match the graph, and drops
//! selected ids that no longer exist.

use crate::graph::{LaneGraph, PropertyUpdate, UndoOutcome};
use crate::path::{PathMode, find_path};
use crate::smoothing::{SmoothingParams, smooth_segment};
use crate::{Edge, LaneGraphError, LaneId, Node, NodeId, Point};
use std::collections::BTreeSet;

/// A computed but not yet applied smoothing result.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothPreview {
    pub path: Vec<NodeId>,
    pub coords: Vec<Point>,
    pub params: SmoothingParams,
}

/// A LaneGraph with selection and preview state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    graph: LaneGraph,
    selection: BTreeSet<NodeId>,
    preview: Option<SmoothPreview>,
}

impl Session {
    /// Create a new session over an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session over an existing graph.
    #[must_use]
    pub fn with_graph(graph: LaneGraph) -> Self {
        Self {
            graph,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn graph(&self) -> &LaneGraph {
        &self.graph
    }

    /// Give up the session and keep the graph.
    #[must_use]
    pub fn into_graph(self) -> LaneGraph {
        self.graph
    }

    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut LaneGraph) -> Result<T, LaneGraphError>,
    ) -> Result<T, LaneGraphError> {
        let value = op(&mut self.graph)?;
        self.after_mutation();
        Ok(value)
    }

    fn after_mutation(&mut self) {
        if self.preview.take().is_some() {
            tracing::debug!("pending smoothing preview discarded");
        }
        let graph = &self.graph;
        self.selection.retain(|id| graph.contains_node(*id));
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Add `id` to the selection. Unknown ids are rejected.
    pub fn select(&mut self, id: NodeId) -> Result<(), LaneGraphError> {
        if !self.graph.contains_node(id) {
            return Err(LaneGraphError::NodeNotFound(id));
        }
        self.selection.insert(id);
        Ok(())
    }

    /// Remove `id` from the selection. Returns whether it was selected.
    pub fn deselect(&mut self, id: NodeId) -> bool {
        self.selection.remove(&id)
    }

    #[must_use]
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    #[must_use]
    pub fn selection(&self) -> &BTreeSet<NodeId> {
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // -------------------------------------------------------------------------
    // Graph operations
    // -------------------------------------------------------------------------

    pub fn add_node(&mut self, x: f64, y: f64, lane: LaneId) -> Result<NodeId, LaneGraphError> {
        self.mutate(|graph| graph.add_node(x, y, lane))
    }

    pub fn add_node_connected(
        &mut self,
        x: f64,
        y: f64,
        lane: LaneId,
        connect_to: Option<NodeId>,
    ) -> Result<NodeId, LaneGraphError> {
        self.mutate(|graph| graph.add_node_connected(x, y, lane, connect_to))
    }

    pub fn add_polyline(
        &mut self,
        points: &[Point],
        lane: LaneId,
        connect_to_start: Option<NodeId>,
    ) -> Result<Vec<NodeId>, LaneGraphError> {
        self.mutate(|graph| graph.add_polyline(points, lane, connect_to_start))
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), LaneGraphError> {
        self.mutate(|graph| graph.add_edge(from, to))
    }

    pub fn delete_points(&mut self, ids: &BTreeSet<NodeId>) -> Result<usize, LaneGraphError> {
        self.mutate(|graph| graph.delete_points(ids))
    }

    /// Delete every selected node.
    pub fn delete_selected(&mut self) -> Result<usize, LaneGraphError> {
        let selection = std::mem::take(&mut self.selection);
        let result = self.delete_points(&selection);
        if result.is_err() {
            self.selection = selection;
        }
        result
    }

    pub fn break_links(&mut self, node: NodeId) -> Result<usize, LaneGraphError> {
        self.mutate(|graph| graph.break_links(node))
    }

    pub fn change_lane_id(
        &mut self,
        ids: &BTreeSet<NodeId>,
        lane: LaneId,
    ) -> Result<usize, LaneGraphError> {
        self.mutate(|graph| graph.change_lane_id(ids, lane))
    }

    pub fn update_node_properties(
        &mut self,
        ids: &BTreeSet<NodeId>,
        update: PropertyUpdate,
    ) -> Result<usize, LaneGraphError> {
        self.mutate(|graph| graph.update_node_properties(ids, update))
    }

    pub fn reverse_indicators(&mut self, ids: &BTreeSet<NodeId>) -> Result<usize, LaneGraphError> {
        self.mutate(|graph| graph.reverse_indicators(ids))
    }

    pub fn reverse_path(&mut self, path: &[NodeId]) -> Result<usize, LaneGraphError> {
        self.mutate(|graph| graph.reverse_path(path))
    }

    pub fn replace_state(
        &mut self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<(), LaneGraphError> {
        self.mutate(|graph| graph.replace_state(nodes, edges))
    }

    /// Empty the graph and all volatile state.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.selection.clear();
        self.preview = None;
    }

    pub fn undo(&mut self) -> UndoOutcome {
        let outcome = self.graph.undo();
        if outcome.success {
            self.after_mutation();
        }
        outcome
    }

    pub fn redo(&mut self) -> UndoOutcome {
        let outcome = self.graph.redo();
        if outcome.success {
            self.after_mutation();
        }
        outcome
    }

    // -------------------------------------------------------------------------
    // Composite commands
    // -------------------------------------------------------------------------

    /// Route between two existing nodes.
    pub fn find_path(
        &self,
        start: NodeId,
        end: NodeId,
        mode: PathMode,
    ) -> Result<Vec<NodeId>, LaneGraphError> {
        for id in [start, end] {
            if !self.graph.contains_node(id) {
                return Err(LaneGraphError::NodeNotFound(id));
            }
        }
        find_path(self.graph.edges(), start, end, mode).ok_or_else(|| {
            tracing::warn!(%start, %end, ?mode, "no path found");
            LaneGraphError::NoPath(start, end)
        })
    }

    /// Compute smoothed coordinates for the route between `start` and `end`
    /// and keep them as the pending preview. The graph is not changed.
    pub fn preview_smooth(
        &mut self,
        start: NodeId,
        end: NodeId,
        params: SmoothingParams,
        mode: PathMode,
    ) -> Result<&SmoothPreview, LaneGraphError> {
        let path = self.find_path(start, end, mode)?;
        let coords = smooth_segment(self.graph.nodes(), self.graph.edges(), &path, params)
            .inspect_err(|err| tracing::warn!(error = %err, "smoothing rejected"))?;
        tracing::info!(nodes = path.len(), "smoothing preview ready");
        Ok(self.preview.insert(SmoothPreview {
            path,
            coords,
            params,
        }))
    }

    #[must_use]
    pub fn pending_preview(&self) -> Option<&SmoothPreview> {
        self.preview.as_ref()
    }

    /// Drop the pending preview. Returns whether there was one.
    pub fn discard_preview(&mut self) -> bool {
        self.preview.take().is_some()
    }

    /// Apply the pending preview as one history step.
    ///
    /// Returns the path that was rewritten.
    pub fn apply_smooth(&mut self) -> Result<Vec<NodeId>, LaneGraphError> {
        let preview = self.preview.take().ok_or(LaneGraphError::NoPendingPreview)?;
        if let Err(err) = self.graph.apply_smoothing(&preview.path, &preview.coords) {
            self.preview = Some(preview);
            return Err(err);
        }
        self.after_mutation();
        Ok(preview.path)
    }

    /// Reverse the edges along the route between `start` and `end`.
    pub fn reverse_between(
        &mut self,
        start: NodeId,
        end: NodeId,
        mode: PathMode,
    ) -> Result<usize, LaneGraphError> {
        let path = self.find_path(start, end, mode)?;
        self.reverse_path(&path)
    }

    /// Delete the nodes strictly between `start` and `end` on their route.
    ///
    /// Returns the number of removed nodes; adjacent endpoints remove nothing.
    pub fn remove_between(
        &mut self,
        start: NodeId,
        end: NodeId,
        mode: PathMode,
    ) -> Result<usize, LaneGraphError> {
        let path = self.find_path(start, end, mode)?;
        if path.len() <= 2 {
            tracing::debug!(%start, %end, "no interior nodes to remove");
            return Ok(0);
        }
        let interior: BTreeSet<NodeId> = path[1..path.len() - 1].iter().copied().collect();
        self.delete_points(&interior)
    }
}

// =============================================================================
// TESTS
// =============================================================================
