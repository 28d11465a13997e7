//! # CLI Command Implementations
//!
//! Every command loads the session graph file, runs against the engine, and
//! saves through [`FileStore`] when it changed something.

use crate::cli::ExportFormat;
use crate::config::Config;
use crate::script::{apply_script, parse_script};
use crate::store::{FileStore, write_atomic};
use lanegraph_core::formats::edge_from_fields;
use lanegraph_core::primitives::LANE_MAGIC;
use lanegraph_core::{
    Edge, ExportGraph, GraphMetrics, LaneGraph, LaneGraphError, LaneId, Node, NodeId, PathMode,
    PersistenceAdapter, SerializableGraph, Session, lane_from_bytes, lane_to_bytes,
    node_from_fields, verify_yaw,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a JSON row file or edit script (64 MB).
const MAX_TEXT_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum size of a binary lane file (256 MB).
const MAX_LANE_FILE_SIZE: u64 = 256 * 1024 * 1024;

// =============================================================================
// CONTEXT
// =============================================================================

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub graph_path: PathBuf,
    pub config: Config,
    pub json_mode: bool,
    pub quiet: bool,
}

impl Context {
    fn store(&self) -> FileStore {
        FileStore::new(&self.graph_path, &self.config.persistence)
    }

    fn load(&self) -> Result<LaneGraph, LaneGraphError> {
        self.store().load_or_empty()
    }

    fn save(&self, graph: &LaneGraph) -> Result<(), LaneGraphError> {
        self.store().persist(&SerializableGraph::from(graph))?;
        if !self.quiet && !self.json_mode {
            println!("Saved {}", self.graph_path.display());
        }
        Ok(())
    }
}

/// Arguments of the `smooth` command.
#[derive(Debug, Clone, Copy)]
pub struct SmoothRequest {
    pub start: u64,
    pub end: u64,
    pub smoothness: Option<f64>,
    pub weight: Option<f64>,
    pub force: bool,
    pub dry_run: bool,
}

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Resolve an input path and check it is a regular file within `max_size`.
fn validate_input(path: &Path, max_size: u64) -> Result<PathBuf, LaneGraphError> {
    let canonical = path.canonicalize().map_err(|e| {
        LaneGraphError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| LaneGraphError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if !metadata.is_file() {
        return Err(LaneGraphError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > max_size {
        return Err(LaneGraphError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(canonical)
}

fn read_input(path: &Path, max_size: u64) -> Result<Vec<u8>, LaneGraphError> {
    let validated = validate_input(path, max_size)?;
    std::fs::read(&validated)
        .map_err(|e| LaneGraphError::IoError(format!("Read {}: {}", path.display(), e)))
}

/// Resolve the parent directory of an output path.
fn validate_output(path: &Path) -> Result<PathBuf, LaneGraphError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let canonical_parent = parent.canonicalize().map_err(|e| {
        LaneGraphError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    let filename = path
        .file_name()
        .ok_or_else(|| LaneGraphError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

fn read_rows(path: &Path) -> Result<Vec<Vec<f64>>, LaneGraphError> {
    let bytes = read_input(path, MAX_TEXT_FILE_SIZE)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        LaneGraphError::SerializationError(format!("{}: {}", path.display(), e))
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LaneGraphError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| LaneGraphError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty graph file.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), LaneGraphError> {
    if ctx.graph_path.exists() && !force {
        return Err(LaneGraphError::IoError(format!(
            "Graph file {} already exists. Use --force to overwrite.",
            ctx.graph_path.display()
        )));
    }
    ctx.save(&LaneGraph::new_empty())?;
    if !ctx.quiet {
        println!("Initialized empty graph at {}", ctx.graph_path.display());
    }
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Nodes and edges read from import files.
fn read_import(
    nodes_path: &Path,
    edges_path: Option<&Path>,
    lane: LaneId,
) -> Result<(Vec<Node>, Vec<Edge>), LaneGraphError> {
    let bytes = read_input(nodes_path, MAX_LANE_FILE_SIZE)?;
    if bytes.starts_with(LANE_MAGIC) {
        if edges_path.is_some() {
            tracing::warn!("lane files carry their own edges, --edges ignored");
        }
        let data = lane_from_bytes(&bytes, lane)?;
        return Ok((data.nodes, data.edges));
    }

    let rows: Vec<Vec<f64>> = serde_json::from_slice(&bytes).map_err(|e| {
        LaneGraphError::SerializationError(format!("{}: {}", nodes_path.display(), e))
    })?;
    let nodes = rows
        .iter()
        .map(|row| node_from_fields(row, lane))
        .collect::<Result<Vec<_>, _>>()?;
    let edges = match edges_path {
        Some(path) => read_rows(path)?
            .iter()
            .map(|row| edge_from_fields(row))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok((nodes, edges))
}

/// Merge node/edge rows or a lane file into the graph.
///
/// Imported ids must not clash with ids already in the graph.
pub fn cmd_import(
    ctx: &Context,
    nodes_path: &Path,
    edges_path: Option<&Path>,
    lane: i64,
    name: Option<String>,
) -> Result<(), LaneGraphError> {
    let lane = LaneId(lane);
    let (nodes, edges) = read_import(nodes_path, edges_path, lane)?;
    let (node_count, edge_count) = (nodes.len(), edges.len());
    let uses_lane = nodes.iter().any(|node| node.lane_id == lane);

    let mut graph = ctx.load()?;
    let mut all_nodes = graph.nodes().to_vec();
    all_nodes.extend(nodes);
    let mut all_edges = graph.edges().to_vec();
    all_edges.extend(edges);
    graph.replace_state(all_nodes, all_edges)?;

    if uses_lane {
        let name = name.or_else(|| {
            nodes_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        });
        if let Some(name) = name {
            graph.set_lane_name(lane, name);
        }
    }
    ctx.save(&graph)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "imported_nodes": node_count,
            "imported_edges": edge_count,
            "node_count": graph.nodes().len(),
            "edge_count": graph.edges().len(),
        }))
    } else {
        println!("Imported {} nodes, {} edges", node_count, edge_count);
        Ok(())
    }
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show graph metrics.
pub fn cmd_status(ctx: &Context) -> Result<(), LaneGraphError> {
    let graph = ctx.load()?;
    let metrics = GraphMetrics::from_graph(&graph, ctx.config.diagnostics.yaw_threshold);

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "graph": ctx.graph_path.to_string_lossy(),
            "metrics": metrics,
            "next_node_id": graph.next_node_id().0,
            "lanes": graph
                .lane_names()
                .iter()
                .map(|(lane, name)| (lane.0.to_string(), serde_json::Value::from(name.clone())))
                .collect::<serde_json::Map<_, _>>(),
        }));
    }

    println!("Lane Graph Status");
    println!("=================");
    println!("Graph:            {}", ctx.graph_path.display());
    println!();
    println!("Nodes:            {}", metrics.node_count);
    println!("Edges:            {}", metrics.edge_count);
    println!("Lanes:            {}", metrics.lane_count);
    println!("Isolated nodes:   {}", metrics.isolated_nodes);
    println!("Total length:     {:.3}", metrics.total_edge_length);
    println!("Misaligned edges: {}", metrics.misaligned_edges);
    for (lane, name) in graph.lane_names() {
        println!("  lane {}: {}", lane, name);
    }
    Ok(())
}

// =============================================================================
// PATH COMMAND
// =============================================================================

/// Find and print a route.
pub fn cmd_path(ctx: &Context, start: u64, end: u64, force: bool) -> Result<(), LaneGraphError> {
    let session = Session::with_graph(ctx.load()?);
    let path = session.find_path(NodeId(start), NodeId(end), PathMode::from_force(force))?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "path": path, "length": path.len() }))
    } else {
        println!("{}", format_path(&path));
        Ok(())
    }
}

// =============================================================================
// SMOOTH COMMAND
// =============================================================================

/// Smooth the route between two nodes, or just preview it.
pub fn cmd_smooth(ctx: &Context, request: SmoothRequest) -> Result<(), LaneGraphError> {
    let params = ctx
        .config
        .smoothing
        .params(request.smoothness, request.weight);
    let mut session = Session::with_graph(ctx.load()?);
    let preview = session
        .preview_smooth(
            NodeId(request.start),
            NodeId(request.end),
            params,
            PathMode::from_force(request.force),
        )?
        .clone();

    if !request.dry_run {
        session.apply_smooth()?;
        ctx.save(session.graph())?;
    }

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "path": preview.path,
            "coords": preview.coords,
            "applied": !request.dry_run,
        }));
    }
    for (id, point) in preview.path.iter().zip(&preview.coords) {
        println!("{:>8}  {:>12.4} {:>12.4}", id, point.x, point.y);
    }
    if request.dry_run {
        println!("Dry run: graph unchanged");
    }
    Ok(())
}

// =============================================================================
// EDIT COMMAND
// =============================================================================

/// Apply an edit script and save the result.
pub fn cmd_edit(ctx: &Context, script: &Path) -> Result<(), LaneGraphError> {
    let bytes = read_input(script, MAX_TEXT_FILE_SIZE)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| LaneGraphError::SerializationError(format!("edit script: {}", e)))?;
    let ops = parse_script(&text)?;

    let mut session = Session::with_graph(ctx.load()?);
    let reports = apply_script(&mut session, &ops, ctx.config.smoothing.params(None, None))?;
    ctx.save(session.graph())?;

    if ctx.json_mode {
        return print_json(&reports);
    }
    for report in &reports {
        let mark = if report.applied { "ok  " } else { "skip" };
        println!("[{}] {:>3} {}: {}", mark, report.index, report.op, report.detail);
    }
    let skipped = reports.iter().filter(|r| !r.applied).count();
    println!("{} operations, {} skipped", reports.len(), skipped);
    Ok(())
}

// =============================================================================
// VERIFY-YAW COMMAND
// =============================================================================

/// Report edges whose source yaw differs from the edge bearing.
pub fn cmd_verify_yaw(
    ctx: &Context,
    threshold: Option<f64>,
    all: bool,
) -> Result<(), LaneGraphError> {
    let threshold = threshold.unwrap_or(ctx.config.diagnostics.yaw_threshold);
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(LaneGraphError::Config(format!(
            "yaw threshold must be positive, got {}",
            threshold
        )));
    }
    let graph = ctx.load()?;
    let checks = verify_yaw(graph.nodes(), graph.edges(), threshold);
    let misaligned = checks.iter().filter(|check| !check.aligned).count();
    let shown: Vec<_> = checks
        .into_iter()
        .filter(|check| all || !check.aligned)
        .collect();

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "threshold": threshold,
            "misaligned": misaligned,
            "edges": shown,
        }));
    }
    for check in &shown {
        let mark = if check.aligned { "ok " } else { "BAD" };
        println!(
            "[{}] {} -> {}  diff {:.4} rad",
            mark, check.from, check.to, check.diff
        );
    }
    println!(
        "{} of {} edges misaligned (threshold {} rad)",
        misaligned,
        graph.edges().len(),
        threshold
    );
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Nodes and edges of one lane, or of the whole graph.
fn lane_subset(graph: &LaneGraph, lane: Option<LaneId>) -> (Vec<Node>, Vec<Edge>) {
    let Some(lane) = lane else {
        return (graph.nodes().to_vec(), graph.edges().to_vec());
    };
    let nodes: Vec<Node> = graph
        .nodes()
        .iter()
        .filter(|node| node.lane_id == lane)
        .cloned()
        .collect();
    let kept: BTreeSet<NodeId> = nodes.iter().map(|node| node.id).collect();
    let edges = graph
        .edges()
        .iter()
        .filter(|edge| kept.contains(&edge.from) && kept.contains(&edge.to))
        .copied()
        .collect();
    (nodes, edges)
}

/// Write the graph (or one lane of it) to a file.
pub fn cmd_export(
    ctx: &Context,
    output: &Path,
    format: ExportFormat,
    lane: Option<i64>,
) -> Result<(), LaneGraphError> {
    let output = validate_output(output)?;
    let graph = ctx.load()?;
    let (nodes, edges) = lane_subset(&graph, lane.map(LaneId));

    let bytes = match format {
        ExportFormat::Json => {
            let export = ExportGraph::from_parts(&nodes, &edges)?;
            serde_json::to_vec_pretty(&export)
                .map_err(|e| LaneGraphError::SerializationError(e.to_string()))?
        }
        ExportFormat::Lane => lane_to_bytes(&nodes, &edges)?,
    };
    write_atomic(&output, &bytes)?;
    tracing::info!(path = %output.display(), ?format, nodes = nodes.len(), "export written");

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "output": output.to_string_lossy(),
            "nodes": nodes.len(),
            "edges": edges.len(),
        }))
    } else {
        println!(
            "Exported {} nodes, {} edges to {}",
            nodes.len(),
            edges.len(),
            output.display()
        );
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
