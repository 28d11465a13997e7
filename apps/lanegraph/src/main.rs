//! # Lanegraph - Lane Graph Editor
//!
//! The main binary for editing directed lane graphs.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                apps/lanegraph (THE BINARY)            │
//! │                                                       │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────┐   │
//! │  │    CLI     │   │   Config   │   │  FileStore   │   │
//! │  │   (clap)   │   │   (toml)   │   │  + backups   │   │
//! │  └─────┬──────┘   └─────┬──────┘   └──────┬───────┘   │
//! │        └────────────────┼─────────────────┘           │
//! │                         ▼                             │
//! │                ┌────────────────┐                     │
//! │                │ lanegraph-core │                     │
//! │                │  (THE ENGINE)  │                     │
//! │                └────────────────┘                     │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! lanegraph init
//! lanegraph import --nodes lane_3.json --edges lane_3_edges.json --lane 3
//! lanegraph path --start 4 --end 19
//! lanegraph smooth --start 4 --end 19 --smoothness 0.5 --dry-run
//! lanegraph edit -f fixes.json
//! lanegraph export -o graph.json
//! ```
//!
//! Exit codes: 0 on success, 1 when the command was rejected, 2 when the
//! engine reported an invariant violation.

use clap::Parser;
use lanegraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // LANEGRAPH_LOG_FORMAT=json enables machine-parseable logs. Logs go to
    // stderr so --json-mode output on stdout stays parseable.
    let log_format = std::env::var("LANEGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lanegraph=info,lanegraph_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(if e.is_recoverable() { 1 } else { 2 });
    }
}
