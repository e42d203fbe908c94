//! Exploration driver: runs a [`ProbeScript`] against a device.
//!
//! The driver executes every step and every attempt in order, whatever the
//! outcome of individual actions. A failed launch, tap or capture is recorded
//! and the next declared action runs anyway; the script is a fixed probe, so
//! there is nothing to re-plan around. Actions are issued one at a time and
//! each is awaited before the next.
//!
//! Progress is reported through an [`ExplorationObserver`]; the run state
//! itself lives only in the returned [`ExplorationLog`].

use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::action::{Action, ActionResult};
use crate::artifact::Artifact;
use crate::device::DeviceClient;
use crate::script::{ProbeScript, ProbeStep};
use crate::session::{ExplorationLog, LogEntry};

/// Receives progress notifications during a run.
///
/// All methods default to doing nothing.
pub trait ExplorationObserver {
    /// A step is about to run.
    fn step_started(&mut self, _step: &ProbeStep) {}

    /// An action finished and was recorded.
    fn action_finished(&mut self, _entry: &LogEntry) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExplorationObserver for NoopObserver {}

/// Executes probe scripts, building an [`ExplorationLog`].
#[derive(Debug)]
pub struct ExplorationDriver {
    client: DeviceClient,
    terminate_after: bool,
}

impl ExplorationDriver {
    pub fn new(client: DeviceClient) -> Self {
        Self {
            client,
            terminate_after: false,
        }
    }

    /// Terminate the app once the script has finished.
    pub fn terminate_after(mut self, terminate: bool) -> Self {
        self.terminate_after = terminate;
        self
    }

    pub fn client(&self) -> &DeviceClient {
        &self.client
    }

    /// Runs `script` to completion, recording into `log`, and returns the log.
    pub async fn run(
        &self,
        script: &ProbeScript,
        mut log: ExplorationLog,
        observer: &mut dyn ExplorationObserver,
    ) -> ExplorationLog {
        let span = info_span!("exploration", script = %script.name, run_id = %log.run_id());
        async {
            info!(
                udid = %self.client.target().udid,
                bundle_id = %self.client.target().bundle_id,
                artifact_dir = %log.artifact_dir().display(),
                "starting exploration"
            );

            for step in &script.steps {
                self.run_step(step, &mut log, observer)
                    .instrument(info_span!("step", ordinal = step.ordinal, label = %step.label))
                    .await;
            }

            if self.terminate_after {
                let last = script.steps.last().map(|s| s.ordinal).unwrap_or(0);
                self.issue(last, Action::Terminate, &mut log, observer).await;
            }

            info!(
                actions = log.entries().len(),
                failures = log.failure_count(),
                artifacts = log.artifacts().count(),
                "exploration finished"
            );
            log
        }
        .instrument(span)
        .await
    }

    async fn run_step(&self, step: &ProbeStep, log: &mut ExplorationLog, observer: &mut dyn ExplorationObserver) {
        observer.step_started(step);

        for (index, attempt) in step.attempts.iter().enumerate() {
            for action in &attempt.actions {
                self.issue(step.ordinal, action.clone(), log, observer).await;
            }

            let name = step.capture_name(index).file_name();
            self.issue(step.ordinal, Action::Screenshot { name }, log, observer).await;

            if attempt.pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(attempt.pause_ms)).await;
            }
        }
    }

    async fn issue(
        &self,
        step: u8,
        action: Action,
        log: &mut ExplorationLog,
        observer: &mut dyn ExplorationObserver,
    ) {
        let result = match &action {
            // A name already captured in this run would break append-only
            // ordering; refuse it without touching the device.
            Action::Screenshot { name } if log.has_artifact_named(name) => {
                ActionResult::failure(format!("artifact already recorded: {}", name))
            }
            _ => self.client.perform(&action).await,
        };

        let artifact = match &action {
            Action::Screenshot { name } if result.succeeded => Some(Artifact::new(self.client.screenshot_path(name))),
            _ => None,
        };

        if result.succeeded {
            debug!(action = action.name(), "action succeeded");
        } else {
            warn!(
                action = action.name(),
                detail = result.diagnostic().unwrap_or("no output"),
                "action failed, continuing"
            );
        }

        let entry = log.record(step, action, result, artifact);
        observer.action_finished(entry);
    }
}
