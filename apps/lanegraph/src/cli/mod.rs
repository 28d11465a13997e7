//! # Lanegraph CLI Module
//!
//! This module implements the command-line interface of the lane graph editor.
//!
//! ## Available Commands
//!
//! - `init` - Create an empty graph file
//! - `import` - Merge node/edge rows or a lane file into the graph
//! - `status` - Show graph metrics
//! - `path` - Find a route between two nodes
//! - `smooth` - Smooth the route between two nodes
//! - `edit` - Apply a JSON edit script
//! - `verify-yaw` - Report edges whose source yaw disagrees with the edge
//! - `export` - Write the canonical JSON export or a lane file

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand, ValueEnum};
use lanegraph_core::LaneGraphError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Lanegraph - lane graph editor
///
/// Edits a directed waypoint graph stored in a single graph file.
#[derive(Parser, Debug)]
#[command(name = "lanegraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the session graph file
    #[arg(short, long, global = true, default_value = "lanegraph.lgraph")]
    pub graph: PathBuf,

    /// Path to the configuration file (optional; defaults apply when missing)
    #[arg(short, long, global = true, default_value = "lanegraph.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Canonical directed graph: nodes by id, edges with Euclidean weight
    Json,
    /// Binary lane file with 7-field node rows
    Lane,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty graph file
    Init {
        /// Overwrite an existing graph file
        #[arg(short, long)]
        force: bool,
    },

    /// Merge nodes and edges into the graph
    Import {
        /// Node rows as JSON (`[[id, x, y, yaw, zone, width, indicator], ...]`
        /// or legacy `[[id, x, y, yaw, lane_id], ...]`), or a binary lane file
        #[arg(short, long)]
        nodes: PathBuf,

        /// Edge rows as JSON (`[[from, to], ...]`); ignored for lane files
        #[arg(short, long)]
        edges: Option<PathBuf>,

        /// Lane id assigned to 7-field rows
        #[arg(short, long, default_value = "0")]
        lane: i64,

        /// Display name of the lane (defaults to the node file stem)
        #[arg(long)]
        name: Option<String>,
    },

    /// Show graph status
    Status,

    /// Find a route between two nodes
    Path {
        #[arg(short, long)]
        start: u64,

        #[arg(short, long)]
        end: u64,

        /// Ignore edge direction
        #[arg(short, long)]
        force: bool,
    },

    /// Smooth the route between two nodes
    Smooth {
        #[arg(short, long)]
        start: u64,

        #[arg(short, long)]
        end: u64,

        /// Smoothing budget per point (overrides the config file)
        #[arg(long)]
        smoothness: Option<f64>,

        /// Weight of interior points (overrides the config file)
        #[arg(long)]
        weight: Option<f64>,

        /// Ignore edge direction when finding the route
        #[arg(short, long)]
        force: bool,

        /// Print the preview without changing the graph
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply a JSON edit script and save the result
    Edit {
        /// Path to the script
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check stored yaw against edge bearings
    VerifyYaw {
        /// Alignment threshold in radians (overrides the config file)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// List aligned edges too
        #[arg(short, long)]
        all: bool,
    },

    /// Export the graph
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format
        #[arg(short = 't', long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Only export nodes of this lane (and edges between them)
        #[arg(short, long)]
        lane: Option<i64>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), LaneGraphError> {
    let config = Config::load(&cli.config)?;
    let ctx = Context {
        graph_path: cli.graph,
        config,
        json_mode: cli.json_mode,
        quiet: cli.quiet,
    };

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Import {
            nodes,
            edges,
            lane,
            name,
        }) => cmd_import(&ctx, &nodes, edges.as_deref(), lane, name),
        Some(Commands::Status) | None => cmd_status(&ctx),
        Some(Commands::Path { start, end, force }) => cmd_path(&ctx, start, end, force),
        Some(Commands::Smooth {
            start,
            end,
            smoothness,
            weight,
            force,
            dry_run,
        }) => cmd_smooth(
            &ctx,
            SmoothRequest {
                start,
                end,
                smoothness,
                weight,
                force,
                dry_run,
            },
        ),
        Some(Commands::Edit { file }) => cmd_edit(&ctx, &file),
        Some(Commands::VerifyYaw { threshold, all }) => cmd_verify_yaw(&ctx, threshold, all),
        Some(Commands::Export {
            output,
            format,
            lane,
        }) => cmd_export(&ctx, &output, format, lane),
    }
}
