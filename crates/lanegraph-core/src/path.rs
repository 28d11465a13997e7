//! # Path Finder
//!
//! Breadth-first route search over an edge list.
//!
//! Lanes are directional, so the default search follows edges forward only.
//! A user may pick the end of a stretch before its start; directed search
//! therefore retries from `end` to `start` before giving up. The relaxed mode
//! ignores direction altogether and is only used when explicitly requested,
//! e.g. to bridge two lanes that both point into a shared merge node.
//!
//! Paths are shortest by hop count. Among equally short paths the one found
//! first wins, and neighbours are visited in edge-list order.

use crate::{Edge, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// How edge direction is treated by [`find_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMode {
    /// Follow edges forward; fall back to a forward search from end to start.
    #[default]
    Directed,
    /// Treat every edge as two-way.
    Relaxed,
}

impl PathMode {
    /// `Relaxed` when `force` is set, `Directed` otherwise.
    #[must_use]
    pub const fn from_force(force: bool) -> Self {
        if force { Self::Relaxed } else { Self::Directed }
    }
}

/// Adjacency map keyed by every id that appears in an edge.
type Adjacency = BTreeMap<NodeId, Vec<NodeId>>;

fn build_adjacency(edges: &[Edge], mode: PathMode) -> Adjacency {
    let mut adjacency: Adjacency = BTreeMap::new();
    for edge in edges {
        adjacency.entry(edge.from).or_default().push(edge.to);
        let back = adjacency.entry(edge.to).or_default();
        if mode == PathMode::Relaxed {
            back.push(edge.from);
        }
    }
    adjacency
}

fn bfs(adjacency: &Adjacency, start: NodeId, end: NodeId) -> Option<Vec<NodeId>> {
    if !adjacency.contains_key(&start) {
        return None;
    }
    if start == end {
        return Some(vec![start]);
    }

    let mut visited = BTreeSet::new();
    let mut previous: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut queue = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for &neighbor in adjacency.get(&current).into_iter().flatten() {
            if !visited.insert(neighbor) {
                continue;
            }
            previous.insert(neighbor, current);
            if neighbor == end {
                return Some(reconstruct(&previous, start, end));
            }
            queue.push_back(neighbor);
        }
    }

    None
}

fn reconstruct(previous: &BTreeMap<NodeId, NodeId>, start: NodeId, end: NodeId) -> Vec<NodeId> {
    let mut path = vec![end];
    let mut current = end;
    while current != start {
        match previous.get(&current) {
            Some(&p) => {
                path.push(p);
                current = p;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Find a route between `start` and `end`.
///
/// Returns the node ids in travel order, endpoints included, or `None` when
/// no route exists. In `Directed` mode a route found by the end-to-start
/// fallback is returned in its own (forward) order, so it begins at `end`.
pub fn find_path(
    edges: &[Edge],
    start: NodeId,
    end: NodeId,
    mode: PathMode,
) -> Option<Vec<NodeId>> {
    if edges.is_empty() {
        return None;
    }

    let adjacency = build_adjacency(edges, mode);
    if let Some(path) = bfs(&adjacency, start, end) {
        return Some(path);
    }

    match mode {
        PathMode::Directed => bfs(&adjacency, end, start),
        PathMode::Relaxed => None,
    }
}

/// Neighbours of `id` in either direction, in edge-list order.
pub(crate) fn undirected_neighbors(
    edges: &[Edge],
    id: NodeId,
) -> impl Iterator<Item = NodeId> + '_ {
    edges
        .iter()
        .filter(move |edge| edge.touches(id))
        .map(move |edge| if edge.from == id { edge.to } else { edge.from })
}

// =============================================================================
// TESTS
// =============================================================================
