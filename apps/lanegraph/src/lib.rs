//! # lanegraph
//!
//! The lane graph editor binary: command-line interface, TOML configuration,
//! and the file-backed persistence adapter around `lanegraph-core`.
//!
//! This is the only component that touches the filesystem.

pub mod cli;
pub mod config;
pub mod script;
pub mod store;
