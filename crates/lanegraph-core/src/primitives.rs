//! # Engine Constants
//!
//! Hardcoded constants for the lane graph engine. These are compiled into the
//! binary; tunable editing parameters live in `SmoothingParams` and the app config.

// =============================================================================
// SMOOTHING
// =============================================================================

/// Degree of the fitted smoothing spline (cubic).
pub const SPLINE_DEGREE: usize = 3;

/// Weight pinning the true start and end of a smoothed segment.
pub const ENDPOINT_WEIGHT: f64 = 100.0;

/// Weight of the neighbouring tangent anchors just outside a segment.
pub const ANCHOR_WEIGHT: f64 = 1.0;

/// Floor for the user smoothness before it is scaled by the segment length.
///
/// Near-zero smoothing factors turn the fit into an interpolation.
pub const MIN_SMOOTHNESS: f64 = 0.1;

/// Relative tolerance on the residual target of a smoothing fit.
pub const SMOOTHING_TOLERANCE: f64 = 1e-3;

/// Iteration cap for the smoothing-weight search.
pub const MAX_FIT_ITERATIONS: usize = 200;

/// Default user smoothness.
pub const DEFAULT_SMOOTHNESS: f64 = 1.0;

/// Default interior point weight.
pub const DEFAULT_POINT_WEIGHT: f64 = 0.5;

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Largest stored-yaw vs edge-bearing difference (radians) still considered aligned.
pub const YAW_ALIGNMENT_THRESHOLD: f64 = 0.4;

// =============================================================================
// BINARY FORMATS
// =============================================================================

/// Magic bytes of a single lane file.
pub const LANE_MAGIC: &[u8; 4] = b"LANE";

/// Lane file version with 7-field node rows.
pub const LANE_FORMAT_VERSION: u8 = 2;

/// Lane file version with legacy 5-field node rows.
pub const LEGACY_LANE_FORMAT_VERSION: u8 = 1;

/// Magic bytes of a whole-session graph file.
pub const GRAPH_MAGIC: &[u8; 4] = b"LGRF";

/// Current graph file version.
///
/// Increment this when making breaking changes to the serialization format.
pub const GRAPH_FORMAT_VERSION: u8 = 1;

/// Length of the magic + version header shared by both binary formats.
pub const HEADER_LEN: usize = 5;

/// Maximum payload accepted by any decoder, checked before deserialization.
pub const MAX_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

/// Number of fields in a node row.
pub const NODE_ROW_FIELDS: usize = 7;

/// Number of fields in a legacy node row.
pub const LEGACY_NODE_ROW_FIELDS: usize = 5;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Minimum spacing between two automatic backups.
pub const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 300;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_differ_between_formats() {
        assert_ne!(LANE_MAGIC, GRAPH_MAGIC);
        assert_eq!(HEADER_LEN, LANE_MAGIC.len() + 1);
    }
}
