//! Shared test helpers for simprobe-core integration tests.
//!
//! [`MockSimctl`] stands in for the simctl process: it records every
//! invocation, fails the subcommands it is told to fail, and on a successful
//! `screenshot` writes a file of a scripted size to the requested path.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use simprobe_core::action::ActionResult;
use simprobe_core::config::SettleConfig;
use simprobe_core::device::{DeviceClient, DeviceTarget};
use simprobe_core::runner::{CommandRunner, Invocation};

/// Size written for captures once the scripted sizes run out.
pub const DEFAULT_CAPTURE_SIZE: usize = 1_000;

#[derive(Default)]
pub struct MockSimctl {
    calls: Mutex<Vec<Invocation>>,
    failing: Vec<String>,
    capture_sizes: Mutex<VecDeque<usize>>,
}

impl MockSimctl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every invocation whose simctl subcommand (`tap`, `type`,
    /// `screenshot`, `launch`, `terminate`) matches.
    pub fn failing(mut self, subcommand: &str) -> Self {
        self.failing.push(subcommand.to_string());
        self
    }

    /// Sizes of successive capture files.
    pub fn capture_sizes(self, sizes: &[usize]) -> Self {
        *self.capture_sizes.lock().unwrap() = sizes.iter().copied().collect();
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// The simctl subcommand of each recorded invocation, in order.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls().iter().map(|c| subcommand(c).to_string()).collect()
    }
}

fn subcommand(invocation: &Invocation) -> &str {
    match invocation.args.get(1).map(String::as_str) {
        Some("io") => invocation.args.get(3).map(String::as_str).unwrap_or(""),
        Some(other) => other,
        None => "",
    }
}

#[async_trait]
impl CommandRunner for MockSimctl {
    async fn run(&self, invocation: &Invocation) -> ActionResult {
        self.calls.lock().unwrap().push(invocation.clone());
        let sub = subcommand(invocation);

        if self.failing.iter().any(|f| f == sub) {
            return ActionResult::failure(format!("An error was encountered processing the command ({})", sub));
        }

        if sub == "screenshot" {
            let size = self
                .capture_sizes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(DEFAULT_CAPTURE_SIZE);
            let path = invocation.last_arg().expect("screenshot has an output path");
            std::fs::write(path, vec![0u8; size]).unwrap();
        }

        ActionResult::success()
    }
}

/// Settle delays matching the household probe.
pub fn default_settle() -> SettleConfig {
    SettleConfig::default()
}

/// A client targeting the household app, writing captures into `dir`.
pub fn household_client(mock: Arc<MockSimctl>, dir: &Path) -> DeviceClient {
    DeviceClient::new(
        mock,
        DeviceTarget::new("34CF8CC3-211A-4B4E-B04F-EF09DDD381D3", "com.roomies.HouseholdApp"),
        dir,
    )
    .with_settle(default_settle())
}

/// Writes files of the given sizes as `01_capture.png`, `02_capture.png`, ...
pub fn write_captures(dir: &Path, sizes: &[usize]) -> Vec<simprobe_core::artifact::Artifact> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, len)| {
            let path = dir.join(format!("{:02}_capture.png", i + 1));
            std::fs::write(&path, vec![0u8; *len]).unwrap();
            simprobe_core::artifact::Artifact::new(path)
        })
        .collect()
}
