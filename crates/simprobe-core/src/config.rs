//! Persistent configuration for simprobe.
//!
//! Settings are read from `~/.simprobe/config.json` (or an explicit path).
//! Every field has a default, so a missing file or a partial file is fine.
//!
//! ```json
//! {
//!   "device": "34CF8CC3-211A-4B4E-B04F-EF09DDD381D3",
//!   "bundle_id": "com.roomies.HouseholdApp",
//!   "settle": { "launch_ms": 5000 },
//!   "heuristic": { "success_transitions": 2, "metric": { "kind": "pixel_diff", "threshold": 0.05 } }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metric::TransitionMetric;
use crate::simctl;

const CONFIG_FILENAME: &str = "config.json";

/// Bundle identifier of the household app probed by the built-in script.
pub const DEFAULT_BUNDLE_ID: &str = "com.roomies.HouseholdApp";

/// Default parent directory for run artifact directories.
pub const DEFAULT_ARTIFACT_ROOT: &str = "/tmp/simprobe";

/// Errors raised while loading configuration or script files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns the simprobe home directory (`~/.simprobe/`).
pub fn simprobe_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".simprobe")
}

/// Fixed pauses inserted after UI-mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    /// Pause after every tap.
    pub tap_ms: u64,
    /// Pause after every text entry.
    pub type_ms: u64,
    /// Pause after a successful launch.
    pub launch_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            tap_ms: 500,
            type_ms: 500,
            launch_ms: 3000,
        }
    }
}

/// Thresholds of the transition heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Fewer artifacts than this classify the run as a likely failure.
    pub min_artifacts: usize,
    /// Only the first `window` ordered artifacts are compared.
    pub window: usize,
    /// Changes needed for a likely-success verdict.
    pub success_transitions: usize,
    /// How consecutive artifacts are compared.
    pub metric: TransitionMetric,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            min_artifacts: 5,
            window: 8,
            success_transitions: 3,
            metric: TransitionMetric::default(),
        }
    }
}

/// Complete simprobe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Simulator UDID, or `booted`.
    pub device: String,
    /// Bundle identifier of the app under test.
    pub bundle_id: String,
    /// Parent directory under which each run gets its own directory.
    pub artifact_root: PathBuf,
    /// Program used to reach simctl.
    pub simctl_program: String,
    pub settle: SettleConfig,
    pub heuristic: HeuristicConfig,
    /// Terminate the app once the script finishes.
    pub terminate_after: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            device: simctl::BOOTED.to_string(),
            bundle_id: DEFAULT_BUNDLE_ID.to_string(),
            artifact_root: PathBuf::from(DEFAULT_ARTIFACT_ROOT),
            simctl_program: simctl::DEFAULT_PROGRAM.to_string(),
            settle: SettleConfig::default(),
            heuristic: HeuristicConfig::default(),
            terminate_after: false,
        }
    }
}

impl ProbeConfig {
    /// Default config file location (`~/.simprobe/config.json`).
    pub fn default_path() -> PathBuf {
        simprobe_dir().join(CONFIG_FILENAME)
    }

    /// Loads the config from the default location.
    ///
    /// A missing file yields [`Default`]; an unreadable or malformed one is
    /// returned as an error so the caller can decide how loudly to report it.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::load_from(&Self::default_path()) {
            Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            other => other,
        }
    }

    /// Loads the config from an explicit path. Unlike
    /// [`load_default`](Self::load_default), a missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory for a run started at `started`: `<root>/run_<YYYYmmdd_HHMMSS>`.
    pub fn run_dir(&self, started: chrono::DateTime<chrono::Utc>) -> PathBuf {
        self.artifact_root
            .join(format!("run_{}", started.format("%Y%m%d_%H%M%S")))
    }

    /// Like [`run_dir`](Self::run_dir), but skips names that already exist by
    /// appending `_2`, `_3`, and so on.
    pub fn fresh_run_dir(&self, started: chrono::DateTime<chrono::Utc>) -> PathBuf {
        let base = self.run_dir(started);
        let mut dir = base.clone();
        let mut n = 1;
        while dir.exists() {
            n += 1;
            dir = base.with_file_name(format!("run_{}_{}", started.format("%Y%m%d_%H%M%S"), n));
        }
        dir
    }
}
