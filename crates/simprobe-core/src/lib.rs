//! # simprobe-core
//!
//! Black-box exploration of iOS Simulator apps on macOS.
//!
//! simprobe drives an app purely through coordinate taps, text entry and
//! screenshots, with no access to its view hierarchy. A fixed probe script is
//! run against the simulator, every capture is kept on disk, and a transition
//! heuristic estimates from the captures how many distinct screens were
//! reached. The verdict is a signal for human review, not a pass/fail gate.
//!
//! ## Modules
//!
//! - [`runner`] - External command execution seam ([`runner::CommandRunner`])
//! - [`simctl`] - `xcrun simctl` invocations and device discovery
//! - [`device`] - Device control client with settle delays
//! - [`action`] - Action and result types
//! - [`artifact`] - Capture naming convention and ordering
//! - [`script`] - Fixed probe scripts, including the built-in household probe
//! - [`explorer`] - Exploration driver
//! - [`session`] - Exploration log and its JSON Lines persistence
//! - [`metric`] - Screen-change metrics for consecutive captures
//! - [`analyzer`] - Transition heuristic and verdict
//! - [`config`] - Persistent configuration
//!
//! ## External Dependencies
//!
//! - **Xcode** (for `xcrun simctl`)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use simprobe_core::analyzer::TransitionAnalyzer;
//! use simprobe_core::device::{DeviceClient, DeviceTarget};
//! use simprobe_core::explorer::{ExplorationDriver, NoopObserver};
//! use simprobe_core::runner::ProcessRunner;
//! use simprobe_core::script::ProbeScript;
//! use simprobe_core::session::ExplorationLog;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dir = "/tmp/simprobe/manual";
//!     let target = DeviceTarget::new("booted", "com.roomies.HouseholdApp");
//!     let driver = ExplorationDriver::new(DeviceClient::new(Arc::new(ProcessRunner), target, dir));
//!
//!     let log = driver
//!         .run(&ProbeScript::household(), ExplorationLog::with_log_file(dir), &mut NoopObserver)
//!         .await;
//!
//!     let verdict = TransitionAnalyzer::default().analyze_log(&log);
//!     println!("{}", verdict.classification);
//! }
//! ```

pub mod action;
pub mod analyzer;
pub mod artifact;
pub mod config;
pub mod device;
pub mod explorer;
pub mod metric;
pub mod runner;
pub mod script;
pub mod session;
pub mod simctl;
