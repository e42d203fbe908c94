//! Interface to Apple's `xcrun simctl` command-line tool.
//!
//! Two halves live here: device discovery (`list_devices`, `get_booted_udid`),
//! which runs synchronously and returns typed errors, and the invocation
//! builders used by [`DeviceClient`](crate::device::DeviceClient), which only
//! describe a command and leave execution to a
//! [`CommandRunner`](crate::runner::CommandRunner).
//!
//! # Requirements
//!
//! Xcode must be installed for `xcrun simctl` to be available.
//!
//! # Example
//!
//! ```no_run
//! use simprobe_core::simctl::{Simctl, DEFAULT_PROGRAM};
//!
//! let devices = Simctl::list_devices(DEFAULT_PROGRAM).unwrap();
//! for device in &devices {
//!     println!("{}: {} ({})", device.name, device.udid, device.state);
//! }
//! ```

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::Invocation;

/// Program used to reach simctl unless configured otherwise.
pub const DEFAULT_PROGRAM: &str = "xcrun";

/// Device identifier simctl resolves to the currently booted simulator.
pub const BOOTED: &str = "booted";

/// Errors that can occur when discovering simulators.
#[derive(Error, Debug)]
pub enum SimctlError {
    /// A simctl command failed to execute successfully.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// No simulator is currently in the "Booted" state.
    #[error("No booted simulator found")]
    NoBootedSimulator,

    /// Failed to parse JSON output from simctl.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// An I/O error occurred while executing the command.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An iOS Simulator device as reported by `xcrun simctl list devices -j`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorDevice {
    /// The unique device identifier (UDID) for this simulator.
    pub udid: String,

    /// The human-readable name of the device (e.g., "iPhone 16 Pro").
    pub name: String,

    /// The current state of the device (e.g., "Booted", "Shutdown").
    pub state: String,

    /// The device type identifier.
    #[serde(rename = "deviceTypeIdentifier")]
    pub device_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    devices: std::collections::HashMap<String, Vec<SimulatorDevice>>,
}

/// Wrapper for `xcrun simctl` commands.
pub struct Simctl;

impl Simctl {
    /// Lists all available simulator devices across all runtimes.
    ///
    /// # Errors
    ///
    /// - [`SimctlError::Io`] if the command fails to execute
    /// - [`SimctlError::CommandFailed`] if simctl returns a non-zero exit code
    /// - [`SimctlError::JsonParse`] if the output cannot be parsed as JSON
    pub fn list_devices(program: &str) -> Result<Vec<SimulatorDevice>, SimctlError> {
        let output = Command::new(program)
            .args(["simctl", "list", "devices", "-j"])
            .output()?;

        if !output.status.success() {
            return Err(SimctlError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        Self::parse_device_list(&output.stdout)
    }

    /// Returns the UDID of the first booted simulator.
    ///
    /// # Errors
    ///
    /// - [`SimctlError::NoBootedSimulator`] if no simulator is currently booted
    /// - Any errors from [`Self::list_devices`]
    pub fn get_booted_udid(program: &str) -> Result<String, SimctlError> {
        let devices = Self::list_devices(program)?;
        Self::find_booted_device(&devices)
            .map(|d| d.udid.clone())
            .ok_or(SimctlError::NoBootedSimulator)
    }

    /// Parses device list JSON into a flat vector of devices.
    pub fn parse_device_list(json: &[u8]) -> Result<Vec<SimulatorDevice>, SimctlError> {
        let device_list: DeviceList = serde_json::from_slice(json)?;
        Ok(device_list.devices.into_values().flatten().collect())
    }

    /// Finds the first device with state "Booted".
    pub fn find_booted_device(devices: &[SimulatorDevice]) -> Option<&SimulatorDevice> {
        devices.iter().find(|d| d.state == "Booted")
    }

    /// `simctl io <udid> tap <x> <y>`
    pub fn tap(program: &str, udid: &str, x: u32, y: u32) -> Invocation {
        Invocation::new(
            program,
            ["simctl".to_string(), "io".into(), udid.into(), "tap".into(), x.to_string(), y.to_string()],
        )
    }

    /// `simctl io <udid> type <text>`
    pub fn type_text(program: &str, udid: &str, text: &str) -> Invocation {
        Invocation::new(program, ["simctl", "io", udid, "type", text])
    }

    /// `simctl io <udid> screenshot <path>`
    pub fn screenshot(program: &str, udid: &str, path: &Path) -> Invocation {
        Invocation::new(
            program,
            ["simctl".to_string(), "io".into(), udid.into(), "screenshot".into(), path.display().to_string()],
        )
    }

    /// `simctl launch <udid> <bundle>`
    pub fn launch(program: &str, udid: &str, bundle_id: &str) -> Invocation {
        Invocation::new(program, ["simctl", "launch", udid, bundle_id])
    }

    /// `simctl terminate <udid> <bundle>`
    pub fn terminate(program: &str, udid: &str, bundle_id: &str) -> Invocation {
        Invocation::new(program, ["simctl", "terminate", udid, bundle_id])
    }
}
