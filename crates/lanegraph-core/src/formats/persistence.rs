//! # Persistence Format
//!
//! Binary encodings for lane files and whole-session graph files.
//! File I/O lives in the app layer; everything here is bytes in, bytes out.
//!
//! Both formats are a 5-byte header followed by a `postcard` payload:
//! - 4 bytes: magic (`"LANE"` or `"LGRF"`)
//! - 1 byte: version
//!
//! Lane files come in two versions. Version 2 stores 7-field node rows and
//! leaves the lane to the loader; version 1 stores legacy 5-field rows, which
//! are migrated on read.
//!
//! Size and header are validated before any payload is deserialized.

use crate::formats::rows::{EdgeRow, LegacyNodeRow, NodeRow};
use crate::graph::LaneGraph;
use crate::primitives::{
    GRAPH_FORMAT_VERSION, GRAPH_MAGIC, HEADER_LEN, LANE_FORMAT_VERSION, LANE_MAGIC,
    LEGACY_LANE_FORMAT_VERSION, MAX_PAYLOAD_SIZE,
};
use crate::{Edge, LaneGraphError, LaneId, Node, NodeId};
use serde::{Deserialize, Serialize};

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    #[must_use]
    pub const fn new(magic: &[u8; 4], version: u8) -> Self {
        Self {
            magic: *magic,
            version,
        }
    }

    /// Write header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LaneGraphError> {
        if bytes.len() < HEADER_LEN {
            return Err(LaneGraphError::SerializationError(format!(
                "Data too short: minimum {} bytes required",
                HEADER_LEN
            )));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }

    fn expect_magic(&self, magic: &[u8; 4]) -> Result<(), LaneGraphError> {
        if &self.magic != magic {
            return Err(LaneGraphError::SerializationError(format!(
                "Invalid magic bytes: expected {:?}",
                String::from_utf8_lossy(magic)
            )));
        }
        Ok(())
    }
}

/// Check size limits and split off the header.
fn split_header(bytes: &[u8]) -> Result<(PersistenceHeader, &[u8]), LaneGraphError> {
    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(LaneGraphError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PAYLOAD_SIZE
        )));
    }
    let header = PersistenceHeader::from_bytes(bytes)?;
    Ok((header, &bytes[HEADER_LEN..]))
}

fn encode<T: Serialize>(header: PersistenceHeader, payload: &T) -> Result<Vec<u8>, LaneGraphError> {
    let payload = postcard::to_stdvec(payload)
        .map_err(|e| LaneGraphError::SerializationError(e.to_string()))?;
    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

fn decode<'a, T: Deserialize<'a>>(payload: &'a [u8], what: &str) -> Result<T, LaneGraphError> {
    postcard::from_bytes(payload).map_err(|e| {
        LaneGraphError::SerializationError(format!("Failed to deserialize {}: {}", what, e))
    })
}

// =============================================================================
// LANE FILES
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct LanePayload {
    nodes: Vec<NodeRow>,
    edges: Vec<EdgeRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyLanePayload {
    nodes: Vec<LegacyNodeRow>,
    edges: Vec<EdgeRow>,
}

/// The decoded content of one lane file.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Encode nodes and edges as a current-version lane file.
///
/// Lane ids are not stored; the reader supplies them.
pub fn lane_to_bytes(nodes: &[Node], edges: &[Edge]) -> Result<Vec<u8>, LaneGraphError> {
    let payload = LanePayload {
        nodes: nodes.iter().map(NodeRow::from).collect(),
        edges: edges.iter().map(EdgeRow::from).collect(),
    };
    encode(PersistenceHeader::new(LANE_MAGIC, LANE_FORMAT_VERSION), &payload)
}

/// Decode a lane file of either version.
///
/// Rows of a current-version file are assigned `lane`; legacy rows keep
/// their own lane id.
pub fn lane_from_bytes(bytes: &[u8], lane: LaneId) -> Result<LaneData, LaneGraphError> {
    let (header, payload) = split_header(bytes)?;
    header.expect_magic(LANE_MAGIC)?;

    let (nodes, edges) = match header.version {
        LANE_FORMAT_VERSION => {
            let decoded: LanePayload = decode(payload, "lane file")?;
            let nodes = decoded
                .nodes
                .into_iter()
                .map(|row| row.into_node(lane))
                .collect::<Result<Vec<_>, _>>()?;
            (nodes, decoded.edges)
        }
        LEGACY_LANE_FORMAT_VERSION => {
            let decoded: LegacyLanePayload = decode(payload, "legacy lane file")?;
            tracing::info!(rows = decoded.nodes.len(), "migrating legacy lane rows");
            (decoded.nodes.into_iter().map(Node::from).collect(), decoded.edges)
        }
        other => {
            return Err(LaneGraphError::SerializationError(format!(
                "Unsupported lane file version: {} (expected {} or {})",
                other, LANE_FORMAT_VERSION, LEGACY_LANE_FORMAT_VERSION
            )));
        }
    };

    Ok(LaneData {
        nodes,
        edges: edges.into_iter().map(Edge::from).collect(),
    })
}

// =============================================================================
// GRAPH FILES
// =============================================================================

/// Serializable form of a whole editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub lane_names: Vec<(LaneId, String)>,
    pub next_node_id: u64,
}

impl From<&LaneGraph> for SerializableGraph {
    fn from(graph: &LaneGraph) -> Self {
        Self {
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
            lane_names: graph
                .lane_names()
                .iter()
                .map(|(lane, name)| (*lane, name.clone()))
                .collect(),
            next_node_id: graph.next_node_id().0,
        }
    }
}

impl SerializableGraph {
    /// Encode as a graph file (header + payload).
    pub fn to_bytes(&self) -> Result<Vec<u8>, LaneGraphError> {
        encode(PersistenceHeader::new(GRAPH_MAGIC, GRAPH_FORMAT_VERSION), self)
    }
}

impl TryFrom<SerializableGraph> for LaneGraph {
    type Error = LaneGraphError;

    fn try_from(sg: SerializableGraph) -> Result<Self, Self::Error> {
        let mut graph = LaneGraph::new(sg.nodes, sg.edges, sg.lane_names.into_iter().collect())?;
        graph.reserve_ids_until(NodeId(sg.next_node_id));
        Ok(graph)
    }
}

/// Serialize a graph to bytes (header + payload).
pub fn graph_to_bytes(graph: &LaneGraph) -> Result<Vec<u8>, LaneGraphError> {
    SerializableGraph::from(graph).to_bytes()
}

/// Deserialize a graph from bytes.
///
/// The decoded state is validated like any loaded state. History starts
/// fresh from it.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<LaneGraph, LaneGraphError> {
    let (header, payload) = split_header(bytes)?;
    header.expect_magic(GRAPH_MAGIC)?;
    if header.version != GRAPH_FORMAT_VERSION {
        return Err(LaneGraphError::SerializationError(format!(
            "Unsupported version: {} (expected {})",
            header.version, GRAPH_FORMAT_VERSION
        )));
    }
    let serializable: SerializableGraph = decode(payload, "graph data")?;
    LaneGraph::try_from(serializable)
}

// =============================================================================
// TESTS
// =============================================================================
