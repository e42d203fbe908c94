//! Device control client.
//!
//! [`DeviceClient`] turns the five high-level operations (tap, type,
//! screenshot, launch, terminate) into one simctl invocation each and runs it
//! through a [`CommandRunner`]. Every operation returns an [`ActionResult`];
//! none retries and none returns an error.
//!
//! Taps, text entry and successful launches are followed by a fixed settle
//! delay so the UI can react before the next operation. The delay is a
//! pause, not a readiness check.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use simprobe_core::config::SettleConfig;
//! use simprobe_core::device::{DeviceClient, DeviceTarget};
//! use simprobe_core::runner::ProcessRunner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let target = DeviceTarget::new("booted", "com.roomies.HouseholdApp");
//!     let client = DeviceClient::new(Arc::new(ProcessRunner), target, "/tmp/simprobe/run")
//!         .with_settle(SettleConfig::default());
//!
//!     let result = client.tap(393, 600).await;
//!     println!("tap succeeded: {}", result.succeeded);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, Instrument};

use crate::action::{Action, ActionResult};
use crate::artifact::artifact_path;
use crate::config::SettleConfig;
use crate::runner::{CommandRunner, Invocation};
use crate::simctl::{self, Simctl};

/// The simulator and application under test. Fixed for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    /// Simulator UDID, or `booted`.
    pub udid: String,
    /// Bundle identifier of the application.
    pub bundle_id: String,
}

impl DeviceTarget {
    pub fn new(udid: impl Into<String>, bundle_id: impl Into<String>) -> Self {
        Self {
            udid: udid.into(),
            bundle_id: bundle_id.into(),
        }
    }
}

/// Issues device operations through a [`CommandRunner`].
pub struct DeviceClient {
    runner: Arc<dyn CommandRunner>,
    target: DeviceTarget,
    artifact_dir: PathBuf,
    program: String,
    settle: SettleConfig,
}

impl DeviceClient {
    /// Creates a client that writes captures into `artifact_dir`.
    pub fn new(runner: Arc<dyn CommandRunner>, target: DeviceTarget, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            target,
            artifact_dir: artifact_dir.into(),
            program: simctl::DEFAULT_PROGRAM.to_string(),
            settle: SettleConfig::default(),
        }
    }

    /// Overrides the settle delays.
    pub fn with_settle(mut self, settle: SettleConfig) -> Self {
        self.settle = settle;
        self
    }

    /// Overrides the program used to reach simctl.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn target(&self) -> &DeviceTarget {
        &self.target
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Path a screenshot named `name` is written to.
    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        artifact_path(&self.artifact_dir, name)
    }

    /// Taps at `(x, y)`, then waits the tap settle delay.
    pub async fn tap(&self, x: u32, y: u32) -> ActionResult {
        let invocation = Simctl::tap(&self.program, &self.target.udid, x, y);
        let result = self.invoke("tap", &invocation).await;
        settle(self.settle.tap_ms).await;
        result
    }

    /// Types `text` into the focused element, then waits the type settle delay.
    pub async fn type_text(&self, text: &str) -> ActionResult {
        let invocation = Simctl::type_text(&self.program, &self.target.udid, text);
        let result = self.invoke("type_text", &invocation).await;
        settle(self.settle.type_ms).await;
        result
    }

    /// Captures the screen to `<artifact_dir>/<name>`.
    ///
    /// Captures never overwrite: if the file already exists the command is not
    /// issued and a failed result is returned.
    pub async fn screenshot(&self, name: &str) -> ActionResult {
        let path = self.screenshot_path(name);
        if path.exists() {
            debug!(path = %path.display(), "refusing to overwrite existing capture");
            return ActionResult::failure(format!("artifact already exists: {}", path.display()));
        }
        if let Err(e) = std::fs::create_dir_all(&self.artifact_dir) {
            return ActionResult::failure(format!(
                "cannot create artifact directory {}: {}",
                self.artifact_dir.display(),
                e
            ));
        }

        let invocation = Simctl::screenshot(&self.program, &self.target.udid, &path);
        self.invoke("screenshot", &invocation).await
    }

    /// Launches the app. Waits the launch settle delay only on success.
    pub async fn launch(&self) -> ActionResult {
        let invocation = Simctl::launch(&self.program, &self.target.udid, &self.target.bundle_id);
        let result = self.invoke("launch", &invocation).await;
        if result.succeeded {
            settle(self.settle.launch_ms).await;
        }
        result
    }

    /// Terminates the app.
    pub async fn terminate(&self) -> ActionResult {
        let invocation = Simctl::terminate(&self.program, &self.target.udid, &self.target.bundle_id);
        self.invoke("terminate", &invocation).await
    }

    /// Dispatches an [`Action`] to the matching operation.
    pub async fn perform(&self, action: &Action) -> ActionResult {
        match action {
            Action::Tap { x, y } => self.tap(*x, *y).await,
            Action::TypeText { text } => self.type_text(text).await,
            Action::Screenshot { name } => self.screenshot(name).await,
            Action::Launch => self.launch().await,
            Action::Terminate => self.terminate().await,
        }
    }

    async fn invoke(&self, operation: &'static str, invocation: &Invocation) -> ActionResult {
        let span = info_span!("device_command", operation, udid = %self.target.udid);
        async {
            let result = self.runner.run(invocation).await;
            debug!(
                command = %invocation,
                success = result.succeeded,
                elapsed_ms = result.duration_ms,
                "device command complete"
            );
            result
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for DeviceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("runner", &"<dyn CommandRunner>")
            .field("target", &self.target)
            .field("artifact_dir", &self.artifact_dir)
            .field("program", &self.program)
            .field("settle", &self.settle)
            .finish()
    }
}

async fn settle(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
