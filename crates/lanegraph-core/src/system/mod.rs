//! # System Module
//!
//! Read-only diagnostics over a graph: heading consistency and summary metrics.
//!
//! Nothing here mutates the graph. Results are plain data for the app layer
//! to report.

mod alignment;
mod metrics;

pub use alignment::{YawCheck, verify_yaw, wrap_angle};
pub use metrics::GraphMetrics;
