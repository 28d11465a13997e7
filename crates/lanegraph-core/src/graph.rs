//! # Graph Store
//!
//! The canonical node and edge collections of one editing session.
//!
//! `LaneGraph` owns id allocation and every structural mutation. Each public
//! mutation is atomic: it either validates, applies and records one history
//! entry, or leaves the graph exactly as it was. Nodes and edges are kept in
//! insertion order, which is also the order path search visits neighbours in.
//!
//! After every mutation the structural invariants are re-checked before the
//! new state is recorded:
//! - node ids are unique;
//! - every edge references two existing nodes;
//! - no ordered pair appears twice.
//!
//! A failed check means the store itself is broken. The live state is rolled
//! back to the last recorded entry and `InvariantViolation` is returned.

use crate::history::{History, Snapshot};
use crate::{Edge, Indicator, LaneGraphError, LaneId, Node, NodeId, Point};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SUPPORT TYPES
// =============================================================================

/// Result of an undo or redo request.
///
/// `nodes`/`edges` are the live state after the call; on failure they are the
/// unchanged current state.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoOutcome {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub success: bool,
}

/// A partial property update. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyUpdate {
    pub zone: Option<i64>,
    pub indicator: Option<Indicator>,
}

impl PropertyUpdate {
    /// Coerce loosely typed user input.
    ///
    /// Blank strings count as "not supplied". Integral floats such as `"7.0"`
    /// are accepted for `zone`.
    pub fn parse(zone: Option<&str>, indicator: Option<&str>) -> Result<Self, LaneGraphError> {
        let zone = zone
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_zone)
            .transpose()?;
        let indicator = indicator
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<Indicator>)
            .transpose()?;
        Ok(Self { zone, indicator })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zone.is_none() && self.indicator.is_none()
    }
}

fn parse_zone(raw: &str) -> Result<i64, LaneGraphError> {
    let invalid = || LaneGraphError::InvalidProperty {
        field: "zone",
        value: raw.to_string(),
    };
    if let Ok(zone) = raw.parse::<i64>() {
        return Ok(zone);
    }
    let value: f64 = raw.parse().map_err(|_| invalid())?;
    // i64::MAX is not representable; the open upper bound keeps the cast exact.
    if value.fract() != 0.0 || !(-(2f64.powi(63))..2f64.powi(63)).contains(&value) {
        return Err(invalid());
    }
    Ok(value as i64)
}

fn check_coordinate(field: &'static str, value: f64) -> Result<(), LaneGraphError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LaneGraphError::InvalidProperty {
            field,
            value: value.to_string(),
        })
    }
}

/// Check the structural invariants of a node/edge pair.
///
/// Returns the first offending id or edge.
pub fn validate_state(nodes: &[Node], edges: &[Edge]) -> Result<(), LaneGraphError> {
    let mut ids = BTreeSet::new();
    for node in nodes {
        if !ids.insert(node.id) {
            return Err(LaneGraphError::DuplicateNode(node.id));
        }
    }
    let mut seen = BTreeSet::new();
    for edge in edges {
        for end in [edge.from, edge.to] {
            if !ids.contains(&end) {
                return Err(LaneGraphError::NodeNotFound(end));
            }
        }
        if !seen.insert(*edge) {
            return Err(LaneGraphError::DuplicateEdge(edge.from, edge.to));
        }
    }
    Ok(())
}

fn next_free_id(nodes: &[Node]) -> u64 {
    nodes
        .iter()
        .map(|node| node.id.0)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

// =============================================================================
// LANE GRAPH
// =============================================================================

/// The graph store of one editing session.
#[derive(Debug, Clone)]
pub struct LaneGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    lane_names: BTreeMap<LaneId, String>,
    next_id: u64,
    history: History,
}

impl Default for LaneGraph {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            lane_names: BTreeMap::new(),
            next_id: 0,
            history: History::new(Snapshot::default()),
        }
    }
}

impl LaneGraph {
    /// An empty graph.
    #[must_use]
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Build a store from a loaded (nodes, edges, lane names) triple.
    ///
    /// The triple must already satisfy the structural invariants. Id
    /// allocation continues after the largest loaded id.
    pub fn new(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        lane_names: BTreeMap<LaneId, String>,
    ) -> Result<Self, LaneGraphError> {
        validate_state(&nodes, &edges)?;
        let next_id = next_free_id(&nodes);
        let history = History::new(Snapshot::new(nodes.clone(), edges.clone()));
        Ok(Self {
            nodes,
            edges,
            lane_names,
            next_id,
            history,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// All nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    #[must_use]
    pub fn contains_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&Edge::new(from, to))
    }

    #[must_use]
    pub fn lane_names(&self) -> &BTreeMap<LaneId, String> {
        &self.lane_names
    }

    /// Name a lane. Lane names are bookkeeping and not part of history.
    pub fn set_lane_name(&mut self, lane: LaneId, name: impl Into<String>) {
        self.lane_names.insert(lane, name.into());
    }

    /// The id the next added node will receive.
    #[must_use]
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.next_id)
    }

    /// Move allocation forward to at least `next`. Never moves it backwards.
    pub fn reserve_ids_until(&mut self, next: NodeId) {
        self.next_id = self.next_id.max(next.0);
    }

    /// Owned copy of the live state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.nodes.clone(), self.edges.clone())
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of recorded states, including the live one.
    #[must_use]
    pub fn history_depth(&self) -> usize {
        self.history.depth()
    }

    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    /// Run `op` against the live state and commit it, or roll back on error.
    fn apply<T>(
        &mut self,
        action: &'static str,
        op: impl FnOnce(&mut Self) -> Result<T, LaneGraphError>,
    ) -> Result<T, LaneGraphError> {
        match op(self) {
            Ok(value) => {
                self.commit(action)?;
                Ok(value)
            }
            Err(err) => {
                self.restore_recorded();
                tracing::warn!(action, error = %err, "operation rejected");
                Err(err)
            }
        }
    }

    fn commit(&mut self, action: &'static str) -> Result<(), LaneGraphError> {
        if let Err(violation) = validate_state(&self.nodes, &self.edges) {
            tracing::error!(action, %violation, "invariant violated, restoring last good state");
            self.restore_recorded();
            return Err(LaneGraphError::InvariantViolation(format!(
                "{}: {}",
                action, violation
            )));
        }
        self.history.record(self.snapshot());
        tracing::debug!(
            action,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            depth = self.history.depth(),
            "mutation committed"
        );
        Ok(())
    }

    fn restore_recorded(&mut self) {
        if let Some(recorded) = self.history.current() {
            self.nodes.clone_from(&recorded.nodes);
            self.edges.clone_from(&recorded.edges);
        }
    }

    /// Append a node without recording.
    fn push_node(&mut self, x: f64, y: f64, lane: LaneId) -> Result<NodeId, LaneGraphError> {
        check_coordinate("x", x)?;
        check_coordinate("y", y)?;
        let id = NodeId(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or_else(|| {
            LaneGraphError::InvariantViolation("node id space exhausted".to_string())
        })?;
        self.nodes.push(Node::new(id, x, y, lane));
        Ok(id)
    }

    /// Append an edge and point `from` at `to`, without recording.
    fn link(&mut self, from: NodeId, to: NodeId) -> Result<(), LaneGraphError> {
        let target = self
            .node(to)
            .map(Node::position)
            .ok_or(LaneGraphError::NodeNotFound(to))?;
        let source = self
            .index_of(from)
            .ok_or(LaneGraphError::NodeNotFound(from))?;
        let edge = Edge::new(from, to);
        if self.edges.contains(&edge) {
            return Err(LaneGraphError::DuplicateEdge(from, to));
        }
        self.edges.push(edge);
        let node = &mut self.nodes[source];
        node.yaw = node.position().bearing_to(target);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Add a waypoint with zero heading and default annotations.
    pub fn add_node(&mut self, x: f64, y: f64, lane: LaneId) -> Result<NodeId, LaneGraphError> {
        self.add_node_connected(x, y, lane, None)
    }

    /// Add a waypoint and, when `connect_to` is given, an edge from it to the
    /// new node. One history step.
    pub fn add_node_connected(
        &mut self,
        x: f64,
        y: f64,
        lane: LaneId,
        connect_to: Option<NodeId>,
    ) -> Result<NodeId, LaneGraphError> {
        let id = self.apply("add_node", |graph| {
            let id = graph.push_node(x, y, lane)?;
            if let Some(from) = connect_to {
                graph.link(from, id)?;
            }
            Ok(id)
        })?;
        tracing::info!(%id, %lane, connected = connect_to.is_some(), "node added");
        Ok(id)
    }

    /// Append a chain of nodes, each connected to the previous one. The first
    /// is connected from `connect_to_start` when given. One history step.
    pub fn add_polyline(
        &mut self,
        points: &[Point],
        lane: LaneId,
        connect_to_start: Option<NodeId>,
    ) -> Result<Vec<NodeId>, LaneGraphError> {
        if points.is_empty() {
            return Err(LaneGraphError::EmptySelection);
        }
        let ids = self.apply("add_polyline", |graph| {
            let mut previous = connect_to_start;
            let mut ids = Vec::with_capacity(points.len());
            for point in points {
                let id = graph.push_node(point.x, point.y, lane)?;
                if let Some(prev) = previous {
                    graph.link(prev, id)?;
                }
                previous = Some(id);
                ids.push(id);
            }
            Ok(ids)
        })?;
        tracing::info!(count = ids.len(), %lane, "polyline added");
        Ok(ids)
    }

    /// Connect `from` to `to` and set `from`'s yaw to the edge bearing.
    ///
    /// Unknown ids and already existing edges are rejected without change.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), LaneGraphError> {
        self.apply("add_edge", |graph| graph.link(from, to))?;
        tracing::info!(%from, %to, "edge added");
        Ok(())
    }

    /// Delete the nodes in `ids` and every edge touching them.
    ///
    /// Returns the number of nodes removed. Ids not in the graph are ignored;
    /// if none match, nothing is recorded.
    pub fn delete_points(&mut self, ids: &BTreeSet<NodeId>) -> Result<usize, LaneGraphError> {
        if ids.is_empty() {
            tracing::warn!("delete requested with empty selection");
            return Err(LaneGraphError::EmptySelection);
        }
        let matched = self.nodes.iter().filter(|n| ids.contains(&n.id)).count();
        if matched == 0 {
            tracing::debug!(requested = ids.len(), "delete matched no nodes");
            return Ok(0);
        }
        self.apply("delete_points", |graph| {
            graph.nodes.retain(|node| !ids.contains(&node.id));
            graph
                .edges
                .retain(|edge| !ids.contains(&edge.from) && !ids.contains(&edge.to));
            Ok(())
        })?;
        tracing::info!(removed = matched, "nodes deleted");
        Ok(matched)
    }

    /// Remove every edge ending at `node`. Returns the number removed.
    pub fn break_links(&mut self, node: NodeId) -> Result<usize, LaneGraphError> {
        if !self.contains_node(node) {
            tracing::warn!(%node, "break links on unknown node");
            return Err(LaneGraphError::NodeNotFound(node));
        }
        let incoming = self.edges.iter().filter(|edge| edge.to == node).count();
        if incoming == 0 {
            return Ok(0);
        }
        self.apply("break_links", |graph| {
            graph.edges.retain(|edge| edge.to != node);
            Ok(())
        })?;
        tracing::info!(%node, removed = incoming, "incoming links removed");
        Ok(incoming)
    }

    /// Move the nodes in `ids` to `lane`. Only `lane_id` changes.
    pub fn change_lane_id(
        &mut self,
        ids: &BTreeSet<NodeId>,
        lane: LaneId,
    ) -> Result<usize, LaneGraphError> {
        self.update_matching("change_lane_id", ids, |node| node.lane_id = lane)
    }

    /// Overwrite the supplied fields of the nodes in `ids`.
    pub fn update_node_properties(
        &mut self,
        ids: &BTreeSet<NodeId>,
        update: PropertyUpdate,
    ) -> Result<usize, LaneGraphError> {
        if update.is_empty() {
            if ids.is_empty() {
                return Err(LaneGraphError::EmptySelection);
            }
            return Ok(0);
        }
        self.update_matching("update_node_properties", ids, |node| {
            if let Some(zone) = update.zone {
                node.zone = zone;
            }
            if let Some(indicator) = update.indicator {
                node.indicator = indicator;
            }
        })
    }

    /// Swap right/left indicators of the nodes in `ids`. Yaw is not touched.
    pub fn reverse_indicators(&mut self, ids: &BTreeSet<NodeId>) -> Result<usize, LaneGraphError> {
        self.update_matching("reverse_indicators", ids, |node| {
            node.indicator = node.indicator.reversed();
        })
    }

    fn update_matching(
        &mut self,
        action: &'static str,
        ids: &BTreeSet<NodeId>,
        mut edit: impl FnMut(&mut Node),
    ) -> Result<usize, LaneGraphError> {
        if ids.is_empty() {
            tracing::warn!(action, "empty selection");
            return Err(LaneGraphError::EmptySelection);
        }
        let matched = self.nodes.iter().filter(|n| ids.contains(&n.id)).count();
        if matched == 0 {
            tracing::debug!(action, "selection matched no nodes");
            return Ok(0);
        }
        self.apply(action, |graph| {
            graph
                .nodes
                .iter_mut()
                .filter(|node| ids.contains(&node.id))
                .for_each(&mut edit);
            Ok(())
        })?;
        tracing::info!(action, updated = matched, "nodes updated");
        Ok(matched)
    }

    /// Flip the direction of every edge along `path`.
    ///
    /// Each consecutive pair is reversed in whichever direction it currently
    /// exists. Pairs connected both ways are left alone and unconnected pairs
    /// are skipped. Returns the number of reversed edges.
    pub fn reverse_path(&mut self, path: &[NodeId]) -> Result<usize, LaneGraphError> {
        let mut plan: Vec<Edge> = Vec::new();
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let edge = match (self.contains_edge(a, b), self.contains_edge(b, a)) {
                (true, false) => Edge::new(a, b),
                (false, true) => Edge::new(b, a),
                (true, true) => {
                    tracing::debug!(%a, %b, "pair already two-way, left unchanged");
                    continue;
                }
                (false, false) => {
                    tracing::warn!(%a, %b, "no edge between path nodes");
                    continue;
                }
            };
            if !plan.contains(&edge) {
                plan.push(edge);
            }
        }

        if plan.is_empty() {
            tracing::warn!(len = path.len(), "nothing to reverse along path");
            return Err(LaneGraphError::NothingToReverse);
        }

        let reversed = self.apply("reverse_path", |graph| {
            graph.edges.retain(|edge| !plan.contains(edge));
            for flipped in plan.iter().map(|edge| edge.reversed()) {
                graph.link(flipped.from, flipped.to)?;
            }
            Ok(plan.len())
        })?;
        tracing::info!(reversed, "path reversed");
        Ok(reversed)
    }

    /// Move the nodes of `path` to `coords` and recompute their yaw.
    ///
    /// Every node but the last faces the next point; the last keeps the
    /// bearing of the segment leading into it.
    pub fn apply_smoothing(
        &mut self,
        path: &[NodeId],
        coords: &[Point],
    ) -> Result<(), LaneGraphError> {
        if path.len() != coords.len() {
            return Err(LaneGraphError::LengthMismatch {
                expected: path.len(),
                actual: coords.len(),
            });
        }
        if path.len() < 3 {
            return Err(crate::SmoothError::PathTooShort(path.len()).into());
        }
        for point in coords {
            check_coordinate("x", point.x)?;
            check_coordinate("y", point.y)?;
        }
        let indices = path
            .iter()
            .map(|&id| self.index_of(id).ok_or(LaneGraphError::NodeNotFound(id)))
            .collect::<Result<Vec<_>, _>>()?;

        self.apply("apply_smoothing", |graph| {
            let mut bearing = 0.0;
            for (i, (&index, point)) in indices.iter().zip(coords).enumerate() {
                if let Some(next) = coords.get(i + 1) {
                    bearing = point.bearing_to(*next);
                }
                let node = &mut graph.nodes[index];
                node.x = point.x;
                node.y = point.y;
                node.yaw = bearing;
            }
            Ok(())
        })?;
        tracing::info!(nodes = path.len(), "smoothing applied");
        Ok(())
    }

    /// Replace the whole state, e.g. with edits computed elsewhere.
    ///
    /// The new state is validated like a freshly loaded one. Allocation moves
    /// past the largest new id but never backwards.
    pub fn replace_state(
        &mut self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<(), LaneGraphError> {
        validate_state(&nodes, &edges).inspect_err(|err| {
            tracing::warn!(error = %err, "replacement state rejected");
        })?;
        let next = next_free_id(&nodes);
        self.apply("replace_state", |graph| {
            graph.nodes = nodes;
            graph.edges = edges;
            graph.next_id = graph.next_id.max(next);
            Ok(())
        })?;
        tracing::info!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "state replaced"
        );
        Ok(())
    }

    /// Empty the graph and reset id allocation and history.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.lane_names.clear();
        self.next_id = 0;
        self.history.reset(Snapshot::default());
        tracing::info!("graph cleared");
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// Restore the previous recorded state.
    pub fn undo(&mut self) -> UndoOutcome {
        let restored = self.history.undo();
        self.restore(restored, "undo")
    }

    /// Re-apply the most recently undone state.
    pub fn redo(&mut self) -> UndoOutcome {
        let restored = self.history.redo();
        self.restore(restored, "redo")
    }

    fn restore(&mut self, snapshot: Option<Snapshot>, action: &'static str) -> UndoOutcome {
        let success = match snapshot {
            Some(snapshot) => {
                self.nodes = snapshot.nodes;
                self.edges = snapshot.edges;
                tracing::info!(
                    action,
                    depth = self.history.depth(),
                    redo_depth = self.history.redo_depth(),
                    "history restored"
                );
                true
            }
            None => {
                tracing::debug!(action, "nothing to restore");
                false
            }
        };
        UndoOutcome {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            success,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lane() -> LaneId {
        LaneId(0)
    }

    fn set(ids: &[NodeId]) -> BTreeSet<NodeId> {
        ids.iter().copied().collect()
    }

    /// 0 -> 1 -> 2 along the x axis.
    fn straight() -> (LaneGraph, [NodeId; 3]) {
        let mut graph = LaneGraph::new_empty();
        let ids = graph
            .add_polyline(
                &[Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)],
                lane(),
                None,
            )
            .expect("polyline");
        (graph, [ids[0], ids[1], ids[2]])
    }

    #[test]
    fn add_node_allocates_sequential_ids() {
        let mut graph = LaneGraph::new_empty();
        let a = graph.add_node(1.0, 2.0, lane()).expect("add");
        let b = graph.add_node(3.0, 4.0, lane()).expect("add");
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        assert_eq!(graph.next_node_id(), NodeId(2));

        let node = graph.node(a).expect("node");
        assert_eq!(node.yaw, 0.0);
        assert_eq!(node.indicator, Indicator::Unset);
        assert_eq!(graph.history_depth(), 3);
    }

    #[test]
    fn new_continues_after_largest_id() {
        let nodes = vec![
            Node::new(NodeId(4), 0.0, 0.0, lane()),
            Node::new(NodeId(9), 1.0, 0.0, lane()),
        ];
        let mut graph = LaneGraph::new(nodes, Vec::new(), BTreeMap::new()).expect("new");
        assert_eq!(graph.add_node(0.0, 1.0, lane()).expect("add"), NodeId(10));
    }

    #[test]
    fn new_rejects_dangling_edges() {
        let nodes = vec![Node::new(NodeId(1), 0.0, 0.0, lane())];
        let edges = vec![Edge::new(NodeId(1), NodeId(2))];
        assert!(matches!(
            LaneGraph::new(nodes, edges, BTreeMap::new()),
            Err(LaneGraphError::NodeNotFound(NodeId(2)))
        ));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let mut graph = LaneGraph::new_empty();
        assert!(matches!(
            graph.add_node(f64::NAN, 0.0, lane()),
            Err(LaneGraphError::InvalidProperty { field: "x", .. })
        ));
        assert!(graph.nodes().is_empty());
        assert!(!graph.can_undo());
    }

    #[test]
    fn add_edge_sets_source_yaw() {
        let mut graph = LaneGraph::new_empty();
        let a = graph.add_node(1.0, 1.0, lane()).expect("add");
        let b = graph.add_node(2.0, 2.0, lane()).expect("add");
        graph.add_edge(a, b).expect("edge");

        let yaw = graph.node(a).expect("node").yaw;
        assert!((yaw - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert_eq!(graph.node(b).expect("node").yaw, 0.0);
    }

    #[test]
    fn duplicate_edge_is_rejected_without_history() {
        let (mut graph, [a, b, _]) = straight();
        let depth = graph.history_depth();
        assert!(matches!(
            graph.add_edge(a, b),
            Err(LaneGraphError::DuplicateEdge(_, _))
        ));
        assert_eq!(graph.history_depth(), depth);
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn edge_to_unknown_node_is_rejected() {
        let (mut graph, [a, _, _]) = straight();
        let before = graph.snapshot();
        assert!(matches!(
            graph.add_edge(a, NodeId(99)),
            Err(LaneGraphError::NodeNotFound(NodeId(99)))
        ));
        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn delete_cascades_to_edges() {
        let (mut graph, [a, b, c]) = straight();
        assert_eq!(graph.delete_points(&set(&[b])).expect("delete"), 1);
        assert!(graph.edges().is_empty());
        assert!(graph.contains_node(a));
        assert!(graph.contains_node(c));
    }

    #[test]
    fn delete_empty_or_unmatched_is_noop() {
        let (mut graph, _) = straight();
        let depth = graph.history_depth();
        assert!(matches!(
            graph.delete_points(&BTreeSet::new()),
            Err(LaneGraphError::EmptySelection)
        ));
        assert_eq!(graph.delete_points(&set(&[NodeId(77)])).expect("delete"), 0);
        assert_eq!(graph.history_depth(), depth);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (mut graph, [_, _, c]) = straight();
        graph.delete_points(&set(&[c])).expect("delete");
        let d = graph.add_node(5.0, 5.0, lane()).expect("add");
        assert_eq!(d, NodeId(3));
    }

    #[test]
    fn change_lane_id_touches_only_lane() {
        let (mut graph, [a, b, _]) = straight();
        let before = graph.node(a).cloned().expect("node");
        assert_eq!(graph.change_lane_id(&set(&[a, b]), LaneId(7)).expect("relabel"), 2);
        let after = graph.node(a).expect("node");
        assert_eq!(after.lane_id, LaneId(7));
        assert_eq!(after.yaw.to_bits(), before.yaw.to_bits());
        assert_eq!((after.x, after.y), (before.x, before.y));
    }

    #[test]
    fn property_update_is_partial() {
        let (mut graph, [a, _, _]) = straight();
        let update = PropertyUpdate::parse(Some("4.0"), None).expect("parse");
        graph.update_node_properties(&set(&[a]), update).expect("update");
        let update = PropertyUpdate::parse(Some(""), Some("2")).expect("parse");
        graph.update_node_properties(&set(&[a]), update).expect("update");

        let node = graph.node(a).expect("node");
        assert_eq!(node.zone, 4);
        assert_eq!(node.indicator, Indicator::Right);
    }

    #[test]
    fn property_parse_rejects_garbage() {
        assert!(PropertyUpdate::parse(Some("4.5"), None).is_err());
        assert!(PropertyUpdate::parse(Some("north"), None).is_err());
        assert!(PropertyUpdate::parse(None, Some("9")).is_err());
        assert!(PropertyUpdate::parse(None, None).expect("parse").is_empty());
    }

    #[test]
    fn reverse_indicators_keeps_yaw_bits() {
        let (mut graph, [a, b, _]) = straight();
        graph
            .update_node_properties(&set(&[a]), PropertyUpdate {
                zone: None,
                indicator: Some(Indicator::Left),
            })
            .expect("update");
        let yaw_bits = graph.node(a).expect("node").yaw.to_bits();

        graph.reverse_indicators(&set(&[a, b])).expect("reverse");
        let node = graph.node(a).expect("node");
        assert_eq!(node.indicator, Indicator::Right);
        assert_eq!(node.yaw.to_bits(), yaw_bits);
        assert_eq!(graph.node(b).expect("node").indicator, Indicator::Unset);
    }

    #[test]
    fn reverse_path_flips_edges_and_yaw() {
        let (mut graph, [a, b, c]) = straight();
        assert_eq!(graph.reverse_path(&[a, b, c]).expect("reverse"), 2);
        assert!(graph.contains_edge(c, b));
        assert!(graph.contains_edge(b, a));
        assert!(!graph.contains_edge(a, b));

        let yaw = graph.node(c).expect("node").yaw;
        assert!((yaw - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn reverse_path_handles_either_direction() {
        let (mut graph, [a, b, c]) = straight();
        // Selecting the path backwards reverses the same edges.
        assert_eq!(graph.reverse_path(&[c, b, a]).expect("reverse"), 2);
        assert!(graph.contains_edge(c, b));
        assert!(graph.contains_edge(b, a));
    }

    #[test]
    fn reverse_path_without_edges_is_rejected() {
        let mut graph = LaneGraph::new_empty();
        let a = graph.add_node(0.0, 0.0, lane()).expect("add");
        let b = graph.add_node(1.0, 0.0, lane()).expect("add");
        assert!(matches!(
            graph.reverse_path(&[a, b]),
            Err(LaneGraphError::NothingToReverse)
        ));
    }

    #[test]
    fn reverse_path_leaves_two_way_pairs() {
        let (mut graph, [a, b, c]) = straight();
        graph.add_edge(b, a).expect("edge");
        assert_eq!(graph.reverse_path(&[a, b, c]).expect("reverse"), 1);
        assert!(graph.contains_edge(a, b));
        assert!(graph.contains_edge(b, a));
        assert!(graph.contains_edge(c, b));
    }

    #[test]
    fn add_node_connected_is_one_step() {
        let (mut graph, [_, _, c]) = straight();
        let depth = graph.history_depth();
        let d = graph
            .add_node_connected(3.0, 1.0, lane(), Some(c))
            .expect("add");
        assert!(graph.contains_edge(c, d));
        assert_eq!(graph.history_depth(), depth + 1);

        let outcome = graph.undo();
        assert!(outcome.success);
        assert!(!graph.contains_node(d));
    }

    #[test]
    fn failed_composite_rolls_back() {
        let (mut graph, _) = straight();
        let before = graph.snapshot();
        let result = graph.add_node_connected(3.0, 1.0, lane(), Some(NodeId(42)));
        assert!(matches!(result, Err(LaneGraphError::NodeNotFound(NodeId(42)))));
        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn break_links_removes_incoming_only() {
        let (mut graph, [a, b, c]) = straight();
        assert_eq!(graph.break_links(b).expect("break"), 1);
        assert!(!graph.contains_edge(a, b));
        assert!(graph.contains_edge(b, c));
    }

    #[test]
    fn apply_smoothing_rewrites_positions_and_yaw() {
        let (mut graph, [a, b, c]) = straight();
        let coords = [Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 1.0)];
        graph.apply_smoothing(&[a, b, c], &coords).expect("apply");

        let yaw_a = graph.node(a).expect("node").yaw;
        let yaw_b = graph.node(b).expect("node").yaw;
        let yaw_c = graph.node(c).expect("node").yaw;
        assert!((yaw_a - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert!(yaw_b.abs() < 1e-12);
        assert_eq!(yaw_c.to_bits(), yaw_b.to_bits());
        assert_eq!(graph.node(b).expect("node").y, 1.0);
    }

    #[test]
    fn apply_smoothing_checks_lengths() {
        let (mut graph, [a, b, c]) = straight();
        assert!(matches!(
            graph.apply_smoothing(&[a, b, c], &[Point::new(0.0, 0.0)]),
            Err(LaneGraphError::LengthMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn apply_smoothing_needs_three_nodes() {
        let (mut graph, [a, b, _]) = straight();
        let before = graph.snapshot();
        let depth = graph.history_depth();
        let coords = [Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert!(matches!(
            graph.apply_smoothing(&[a, b], &coords),
            Err(LaneGraphError::Smoothing(crate::SmoothError::PathTooShort(2)))
        ));
        assert_eq!(graph.snapshot(), before);
        assert_eq!(graph.history_depth(), depth);
    }

    #[test]
    fn undo_redo_round_trip() {
        let (mut graph, [a, _, c]) = straight();
        let before = graph.snapshot();
        graph.add_edge(c, a).expect("edge");
        let after = graph.snapshot();

        let undone = graph.undo();
        assert!(undone.success);
        assert_eq!(Snapshot::new(undone.nodes, undone.edges), before);

        let redone = graph.redo();
        assert!(redone.success);
        assert_eq!(graph.snapshot(), after);
    }

    #[test]
    fn undo_on_fresh_graph_fails() {
        let mut graph = LaneGraph::new_empty();
        let outcome = graph.undo();
        assert!(!outcome.success);
        assert!(!graph.redo().success);
    }

    #[test]
    fn new_mutation_clears_redo() {
        let (mut graph, _) = straight();
        graph.undo();
        assert!(graph.can_redo());
        graph.add_node(9.0, 9.0, lane()).expect("add");
        assert!(!graph.can_redo());
    }

    #[test]
    fn replace_state_never_moves_ids_backwards() {
        let (mut graph, _) = straight();
        let nodes = vec![Node::new(NodeId(0), 0.0, 0.0, lane())];
        graph.replace_state(nodes, Vec::new()).expect("replace");
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.next_node_id(), NodeId(3));
    }

    #[test]
    fn clear_resets_everything() {
        let (mut graph, _) = straight();
        graph.set_lane_name(LaneId(0), "lane_0.npy");
        graph.clear();
        assert!(graph.nodes().is_empty());
        assert!(graph.lane_names().is_empty());
        assert_eq!(graph.next_node_id(), NodeId(0));
        assert!(!graph.can_undo());
    }

    #[test]
    fn invariant_violation_restores_last_good_state() {
        let (mut graph, [a, _, _]) = straight();
        let good = graph.snapshot();
        let duplicate = graph.node(a).cloned().expect("node");
        graph.nodes.push(duplicate);

        let result = graph.commit("test");
        assert!(matches!(result, Err(LaneGraphError::InvariantViolation(_))));
        assert_eq!(graph.snapshot(), good);
    }
}
