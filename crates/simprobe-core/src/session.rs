//! Exploration log: the single record of a probe run.
//!
//! The [`ExplorationLog`] holds every issued action with its result, in
//! issue order. Artifacts are not stored separately: they are derived from
//! entries whose action is a succeeded screenshot, so a failed capture can
//! never appear in the artifact set.
//!
//! When created with [`ExplorationLog::create`] or
//! [`ExplorationLog::with_log_file`], each entry is also appended to a JSON
//! Lines file as it is recorded, and [`ExplorationLog::load`] rebuilds the log
//! from that file later.
//!
//! # Example
//!
//! ```
//! use simprobe_core::action::{Action, ActionResult};
//! use simprobe_core::session::ExplorationLog;
//!
//! let mut log = ExplorationLog::in_memory("/tmp/simprobe/run");
//! log.record(1, Action::Launch, ActionResult::success(), None);
//! assert_eq!(log.entries().len(), 1);
//! assert_eq!(log.artifacts().count(), 0);
//! ```

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::action::{Action, ActionResult};
use crate::artifact::Artifact;

/// File name of the persisted log inside a run directory.
pub const LOG_FILENAME: &str = "exploration.jsonl";

/// Errors raised while reloading a persisted log.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("run directory already holds a log: {0}")]
    RunExists(PathBuf),

    #[error("malformed log entry on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One issued action and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique identifier for this entry.
    pub id: Uuid,
    /// 1-based position in the log.
    pub seq: usize,
    /// When the action finished.
    pub timestamp: DateTime<Utc>,
    /// Ordinal of the probe step that issued the action.
    pub step: u8,
    pub action: Action,
    pub result: ActionResult,
    /// The capture written by this action; only ever set on a succeeded
    /// screenshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

/// Ordered record of a probe run.
pub struct ExplorationLog {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    artifact_dir: PathBuf,
    entries: Vec<LogEntry>,
    writer: Option<BufWriter<std::fs::File>>,
}

impl ExplorationLog {
    /// Creates a log that is kept in memory only.
    pub fn in_memory(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            artifact_dir: artifact_dir.into(),
            entries: Vec::new(),
            writer: None,
        }
    }

    /// Creates a log that appends entries to `<artifact_dir>/exploration.jsonl`.
    ///
    /// The log file must not exist yet: a directory that already holds a run
    /// is refused with [`SessionError::RunExists`] and left untouched.
    pub fn create(artifact_dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let mut log = Self::in_memory(artifact_dir);
        let path = log.log_path();
        std::fs::create_dir_all(&log.artifact_dir)?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => SessionError::RunExists(path.clone()),
                _ => SessionError::Io(e),
            })?;
        log.writer = Some(BufWriter::new(file));
        Ok(log)
    }

    /// Like [`create`](Self::create), but degrades to an in-memory log with a
    /// warning when the file cannot be created. An existing log is never
    /// truncated.
    pub fn with_log_file(artifact_dir: impl Into<PathBuf>) -> Self {
        let artifact_dir = artifact_dir.into();
        match Self::create(artifact_dir.clone()) {
            Ok(log) => log,
            Err(e) => {
                warn!(dir = %artifact_dir.display(), error = %e, "exploration log will not be persisted");
                Self::in_memory(artifact_dir)
            }
        }
    }

    /// Reloads a persisted log. `path` may be the JSONL file itself or the
    /// run directory containing it.
    ///
    /// Artifact paths are resolved against the directory holding the log, so
    /// a run directory can be moved or copied and still be re-analyzed.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let file_path = if path.is_dir() {
            path.join(LOG_FILENAME)
        } else {
            path.to_path_buf()
        };
        let artifact_dir = file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let reader = BufReader::new(std::fs::File::open(&file_path)?);
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut entry: LogEntry = serde_json::from_str(&line).map_err(|source| SessionError::Malformed {
                line: idx + 1,
                source,
            })?;
            if let Some(artifact) = entry.artifact.as_mut() {
                artifact.path = artifact_dir.join(artifact.file_name());
            }
            entries.push(entry);
        }

        let started_at = entries.first().map(|e| e.timestamp).unwrap_or_else(Utc::now);
        Ok(Self {
            run_id: Uuid::new_v4(),
            started_at,
            artifact_dir,
            entries,
            writer: None,
        })
    }

    /// Appends an entry. `artifact` is dropped unless `action` is a
    /// screenshot and `result` succeeded.
    pub fn record(
        &mut self,
        step: u8,
        action: Action,
        result: ActionResult,
        artifact: Option<Artifact>,
    ) -> &LogEntry {
        let artifact = match (&action, result.succeeded) {
            (Action::Screenshot { .. }, true) => artifact,
            _ => None,
        };

        let entry = LogEntry {
            id: Uuid::new_v4(),
            seq: self.entries.len() + 1,
            timestamp: Utc::now(),
            step,
            action,
            result,
            artifact,
        };

        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }

        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Directory captures are written to.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Location of the persisted JSONL file (whether or not it was written).
    pub fn log_path(&self) -> PathBuf {
        self.artifact_dir.join(LOG_FILENAME)
    }

    pub fn is_persisted(&self) -> bool {
        self.writer.is_some()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Artifacts produced by succeeded screenshots, in capture order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.iter().filter_map(|e| e.artifact.as_ref())
    }

    /// Number of failed actions.
    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.result.succeeded).count()
    }

    /// Returns `true` if an artifact with this file name was already recorded.
    pub fn has_artifact_named(&self, file_name: &str) -> bool {
        self.artifacts().any(|a| a.file_name() == file_name)
    }
}

impl std::fmt::Debug for ExplorationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationLog")
            .field("run_id", &self.run_id)
            .field("started_at", &self.started_at)
            .field("artifact_dir", &self.artifact_dir)
            .field("entries", &self.entries.len())
            .field("writer", &"<Option<BufWriter<File>>>")
            .finish()
    }
}
