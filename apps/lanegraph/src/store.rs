//! # File Store
//!
//! The file-backed [`PersistenceAdapter`]: one session graph file plus
//! throttled, timestamped backups.
//!
//! The graph file is replaced atomically (write to a sibling temp file, then
//! rename), so a crash mid-save leaves the previous file intact. Backups land
//! in the configured directory as `backup_<unix-seconds>.lgraph`, at most
//! once per interval. The newest backup name is the throttle clock, which
//! keeps the interval meaningful across separate CLI runs.

use crate::config::PersistenceConfig;
use lanegraph_core::primitives::MAX_PAYLOAD_SIZE;
use lanegraph_core::{
    LaneGraph, LaneGraphError, PersistenceAdapter, SerializableGraph, graph_from_bytes,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_EXTENSION: &str = "lgraph";

fn io_error(action: &str, path: &Path, err: std::io::Error) -> LaneGraphError {
    LaneGraphError::IoError(format!("{} {}: {}", action, path.display(), err))
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Write `bytes` to `path` via a temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LaneGraphError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes).map_err(|e| io_error("write", &tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_error("rename onto", path, e))
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Persists a session to a graph file, with periodic backups.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    backup_dir: PathBuf,
    backup_interval: Duration,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, config: &PersistenceConfig) -> Self {
        Self {
            path: path.into(),
            backup_dir: config.backup_dir.clone(),
            backup_interval: Duration::from_secs(config.backup_interval_secs),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the graph file.
    pub fn load(&self) -> Result<LaneGraph, LaneGraphError> {
        let metadata =
            std::fs::metadata(&self.path).map_err(|e| io_error("stat", &self.path, e))?;
        if metadata.len() > MAX_PAYLOAD_SIZE as u64 {
            return Err(LaneGraphError::SerializationError(format!(
                "File size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_PAYLOAD_SIZE
            )));
        }
        let bytes = std::fs::read(&self.path).map_err(|e| io_error("read", &self.path, e))?;
        let graph = graph_from_bytes(&bytes)?;
        tracing::debug!(
            path = %self.path.display(),
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            "graph loaded"
        );
        Ok(graph)
    }

    /// Read the graph file, or start empty when there is none yet.
    pub fn load_or_empty(&self) -> Result<LaneGraph, LaneGraphError> {
        if self.exists() {
            self.load()
        } else {
            tracing::info!(path = %self.path.display(), "no graph file, starting empty");
            Ok(LaneGraph::new_empty())
        }
    }

    /// Time of the newest backup, read from the backup file names.
    fn last_backup(&self) -> Option<u64> {
        let entries = std::fs::read_dir(&self.backup_dir).ok()?;
        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let stem = name.to_str()?.strip_prefix(BACKUP_PREFIX)?;
                stem.strip_suffix(BACKUP_EXTENSION)?
                    .strip_suffix('.')?
                    .parse()
                    .ok()
            })
            .max()
    }

    fn backup_due(&self, now: u64) -> bool {
        match self.last_backup() {
            Some(last) => now.saturating_sub(last) >= self.backup_interval.as_secs(),
            None => true,
        }
    }

    /// Write a backup if the interval has elapsed. Returns the backup path.
    pub fn backup_if_due(&self, bytes: &[u8]) -> Result<Option<PathBuf>, LaneGraphError> {
        self.backup_at(bytes, unix_seconds(SystemTime::now()))
    }

    fn backup_at(&self, bytes: &[u8], now: u64) -> Result<Option<PathBuf>, LaneGraphError> {
        if !self.backup_due(now) {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|e| io_error("create", &self.backup_dir, e))?;
        let target = self
            .backup_dir
            .join(format!("{}{}.{}", BACKUP_PREFIX, now, BACKUP_EXTENSION));
        write_atomic(&target, bytes)?;
        tracing::info!(path = %target.display(), "backup written");
        Ok(Some(target))
    }
}

impl PersistenceAdapter for FileStore {
    /// Replace the graph file, then take a backup when one is due.
    ///
    /// A failed backup is logged and does not fail the save.
    fn persist(&mut self, state: &SerializableGraph) -> Result<(), LaneGraphError> {
        let bytes = state.to_bytes()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
        }
        write_atomic(&self.path, &bytes)?;
        tracing::info!(
            path = %self.path.display(),
            nodes = state.nodes.len(),
            edges = state.edges.len(),
            "graph saved"
        );
        if let Err(err) = self.backup_if_due(&bytes) {
            tracing::warn!(error = %err, "backup failed");
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lanegraph_core::{LaneId, Point};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, interval: u64) -> FileStore {
        FileStore::new(
            dir.path().join("session.lgraph"),
            &PersistenceConfig {
                backup_dir: dir.path().join("backups"),
                backup_interval_secs: interval,
            },
        )
    }

    fn sample() -> LaneGraph {
        let mut graph = LaneGraph::new_empty();
        graph
            .add_polyline(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)], LaneId(2), None)
            .expect("polyline");
        graph
    }

    #[test]
    fn persist_then_load_roundtrip() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir, 300);
        let graph = sample();
        store.persist(&SerializableGraph::from(&graph)).expect("persist");

        let loaded = store.load().expect("load");
        assert_eq!(loaded.snapshot(), graph.snapshot());
        assert_eq!(loaded.next_node_id(), graph.next_node_id());
        assert!(!dir.path().join("session.lgraph.tmp").exists());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir, 300);
        assert!(!store.exists());
        assert!(store.load_or_empty().expect("load").nodes().is_empty());
        assert!(store.load().is_err());
    }

    #[test]
    fn backups_are_throttled() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir, 300);
        let bytes = SerializableGraph::from(&sample()).to_bytes().expect("bytes");

        let first = store.backup_at(&bytes, 1_000).expect("backup");
        assert!(first.is_some());
        assert!(store.backup_at(&bytes, 1_299).expect("backup").is_none());
        let later = store.backup_at(&bytes, 1_300).expect("backup");
        assert_eq!(
            later.as_deref().and_then(Path::file_name).and_then(|n| n.to_str()),
            Some("backup_1300.lgraph")
        );

        let restored = graph_from_bytes(&std::fs::read(first.expect("path")).expect("read"))
            .expect("decode");
        assert_eq!(restored.nodes().len(), 2);
    }

    #[test]
    fn persist_writes_first_backup() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store_in(&dir, 300);
        store
            .persist(&SerializableGraph::from(&sample()))
            .expect("persist");
        let backups = std::fs::read_dir(dir.path().join("backups"))
            .expect("dir")
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn unrelated_files_do_not_count_as_backups() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir, 300);
        std::fs::create_dir_all(dir.path().join("backups")).expect("mkdir");
        std::fs::write(dir.path().join("backups/notes.txt"), b"x").expect("write");
        std::fs::write(dir.path().join("backups/backup_9999.tmp"), b"x").expect("write");
        assert_eq!(store.last_backup(), None);
    }
}
