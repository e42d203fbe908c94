//! Action types and results for blind device interaction.
//!
//! An [`Action`] is a single command issued to the simulator through the
//! device control client. Every action produces an [`ActionResult`] carrying
//! the exit status and captured output of the underlying invocation.
//!
//! # Example
//!
//! ```
//! use simprobe_core::action::{Action, ActionResult};
//!
//! let action = Action::Tap { x: 393, y: 600 };
//! assert_eq!(action.name(), "tap");
//!
//! let result = ActionResult::failure("device not found");
//! assert!(!result.succeeded);
//! ```

use serde::{Deserialize, Serialize};

/// Commands that can be issued to a simulator.
///
/// Actions are serialized as JSON with a `type` tag discriminator so that
/// probe scripts and persisted logs stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Tap at specific screen coordinates.
    ///
    /// Coordinates are in screen points and are not checked against the
    /// device resolution; out-of-bounds taps are passed through.
    Tap {
        /// The x-coordinate in screen points.
        x: u32,
        /// The y-coordinate in screen points.
        y: u32,
    },

    /// Type text into whatever currently has keyboard focus.
    TypeText {
        /// The text to type.
        text: String,
    },

    /// Capture the current frame buffer to a named file.
    Screenshot {
        /// File name of the artifact, relative to the artifact directory.
        name: String,
    },

    /// Launch the application under test.
    Launch,

    /// Terminate the application under test.
    Terminate,
}

impl Action {
    /// Returns a short, static name for this action, used in tracing span
    /// metadata and console output.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Tap { .. } => "tap",
            Action::TypeText { .. } => "type_text",
            Action::Screenshot { .. } => "screenshot",
            Action::Launch => "launch",
            Action::Terminate => "terminate",
        }
    }

    /// Human-readable one-line description.
    pub fn describe(&self) -> String {
        match self {
            Action::Tap { x, y } => format!("tap at ({}, {})", x, y),
            Action::TypeText { text } => format!("type '{}'", text),
            Action::Screenshot { name } => format!("screenshot {}", name),
            Action::Launch => "launch app".to_string(),
            Action::Terminate => "terminate app".to_string(),
        }
    }
}

/// Outcome of issuing one [`Action`].
///
/// A zero exit status maps to `succeeded = true`. Spawn errors and non-zero
/// exit statuses map to `succeeded = false` with whatever output could be
/// captured. Results are never retried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the invocation exited with status zero.
    pub succeeded: bool,

    /// Captured standard output.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,

    /// Captured standard error, or the spawn error message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,

    /// Wall time spent in the invocation, excluding settle delays.
    #[serde(default)]
    pub duration_ms: u64,
}

impl ActionResult {
    /// Creates a successful result with no output.
    pub fn success() -> Self {
        Self {
            succeeded: true,
            ..Self::default()
        }
    }

    /// Creates a failed result with the given diagnostic on stderr.
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    /// Sets the invocation duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// The most useful diagnostic line: the first non-empty line of stderr,
    /// falling back to stdout.
    pub fn diagnostic(&self) -> Option<&str> {
        self.stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
    }
}
