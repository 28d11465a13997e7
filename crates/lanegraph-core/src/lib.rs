//! # lanegraph-core
//!
//! The lane graph mutation and geometry engine.
//!
//! This crate owns the directed waypoint graph of an editing session and
//! every operation that changes it: id-safe node and edge mutations,
//! snapshot undo/redo, route search in a direction-strict and a relaxed mode,
//! and weighted spline smoothing of sub-paths.
//!
//! ## Module Map
//!
//! - `types` → identifiers, `Node`/`Edge`/`Point`, `Indicator`, errors
//! - `graph` → `LaneGraph`, the graph store
//! - `history` → undo/redo snapshots
//! - `path` → breadth-first route search
//! - `smoothing` + `spline` → segment smoothing
//! - `session` → selection and smoothing preview on top of the store
//! - `formats` → row shapes, lane/graph files, the persistence seam
//! - `export` → canonical directed export
//! - `system` → yaw diagnostics and metrics
//!
//! ## Architectural Constraints
//!
//! - Single writer: every operation runs to completion on `&mut self`
//! - Atomic: an operation is fully applied or fully rejected
//! - No file I/O, no async, no network: persistence is a collaborator's job

// =============================================================================
// MODULES
// =============================================================================

pub mod export;
pub mod formats;
pub mod graph;
pub mod history;
pub mod path;
pub mod primitives;
pub mod session;
pub mod smoothing;
pub mod spline;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Edge, Indicator, LaneGraphError, LaneId, Node, NodeId, Point};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use export::{ExportEdge, ExportGraph, ExportNode};
pub use graph::{LaneGraph, PropertyUpdate, UndoOutcome, validate_state};
pub use history::{History, Snapshot};
pub use path::{PathMode, find_path};
pub use session::{Session, SmoothPreview};
pub use smoothing::{SmoothError, SmoothingParams, smooth_segment};
pub use spline::{BSplineCurve, fit_smoothing_spline};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    LaneData, PersistenceAdapter, SerializableGraph, graph_from_bytes, graph_to_bytes,
    lane_from_bytes, lane_to_bytes, node_from_fields,
};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{GraphMetrics, YawCheck, verify_yaw};
