//! External command execution primitive.
//!
//! The device control client never spawns processes itself. It builds an
//! [`Invocation`] and hands it to a [`CommandRunner`], which reports the
//! outcome as an [`ActionResult`]. [`ProcessRunner`] is the production
//! implementation; tests substitute a scripted runner.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::action::ActionResult;

/// A single external command: program plus argument vector.
///
/// Arguments are passed to the program verbatim. No shell is involved, so
/// quotes and metacharacters in typed text reach the tool unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute (looked up on `PATH`).
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the last argument, which for capture commands is the output path.
    pub fn last_arg(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Executes external commands on behalf of the device control client.
///
/// Implementations must never return an error or panic for a failed command:
/// every outcome, including a spawn failure, is folded into an
/// [`ActionResult`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation to completion and reports its outcome.
    async fn run(&self, invocation: &Invocation) -> ActionResult;
}

/// Runs invocations as child processes and waits for them to exit.
///
/// There is no timeout: a hung tool blocks the caller until it exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> ActionResult {
        let start = Instant::now();
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match output {
            Ok(output) => {
                let result = ActionResult {
                    succeeded: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration_ms: elapsed_ms,
                };
                debug!(
                    command = %invocation,
                    status = ?output.status.code(),
                    elapsed_ms,
                    "command exited"
                );
                result
            }
            Err(e) => {
                warn!(command = %invocation, error = %e, "failed to spawn command");
                ActionResult::failure(e.to_string()).with_duration_ms(elapsed_ms)
            }
        }
    }
}
