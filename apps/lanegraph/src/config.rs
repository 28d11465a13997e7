//! # Configuration
//!
//! Optional `lanegraph.toml` with editing defaults:
//!
//! ```toml
//! [smoothing]
//! smoothness = 1.0
//! weight = 0.5
//!
//! [persistence]
//! backup_dir = "workspace-Backup"
//! backup_interval_secs = 300
//!
//! [diagnostics]
//! yaw_threshold = 0.4
//! ```
//!
//! Every key is optional. A missing file means all defaults.

use lanegraph_core::primitives::{
    DEFAULT_BACKUP_INTERVAL_SECS, DEFAULT_POINT_WEIGHT, DEFAULT_SMOOTHNESS,
    YAW_ALIGNMENT_THRESHOLD,
};
use lanegraph_core::{LaneGraphError, SmoothingParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default backup directory, relative to the working directory.
pub const DEFAULT_BACKUP_DIR: &str = "workspace-Backup";

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingConfig {
    pub smoothness: f64,
    pub weight: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            smoothness: DEFAULT_SMOOTHNESS,
            weight: DEFAULT_POINT_WEIGHT,
        }
    }
}

impl SmoothingConfig {
    /// Smoothing parameters, with command-line overrides taking precedence.
    #[must_use]
    pub fn params(&self, smoothness: Option<f64>, weight: Option<f64>) -> SmoothingParams {
        SmoothingParams::new(
            smoothness.unwrap_or(self.smoothness),
            weight.unwrap_or(self.weight),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistenceConfig {
    /// Directory receiving timestamped backups.
    pub backup_dir: PathBuf,
    /// Minimum seconds between two backups. Zero backs up on every save.
    pub backup_interval_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            backup_interval_secs: DEFAULT_BACKUP_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Yaw difference in radians above which an edge counts as misaligned.
    pub yaw_threshold: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            yaw_threshold: YAW_ALIGNMENT_THRESHOLD,
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub smoothing: SmoothingConfig,
    pub persistence: PersistenceConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, LaneGraphError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            LaneGraphError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&text)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(text: &str) -> Result<Self, LaneGraphError> {
        let config: Self = toml::from_str(text).map_err(|e| LaneGraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no editing command could work with.
    pub fn validate(&self) -> Result<(), LaneGraphError> {
        let SmoothingConfig { smoothness, weight } = self.smoothing;
        if !smoothness.is_finite() || smoothness < 0.0 {
            return Err(LaneGraphError::Config(format!(
                "smoothing.smoothness must be a non-negative number, got {}",
                smoothness
            )));
        }
        if !weight.is_finite() || weight <= 0.0 {
            return Err(LaneGraphError::Config(format!(
                "smoothing.weight must be positive, got {}",
                weight
            )));
        }
        let threshold = self.diagnostics.yaw_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(LaneGraphError::Config(format!(
                "diagnostics.yaw_threshold must be positive, got {}",
                threshold
            )));
        }
        if self.persistence.backup_dir.as_os_str().is_empty() {
            return Err(LaneGraphError::Config(
                "persistence.backup_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
