//! Console rendering of probe progress and verdicts.
//!
//! Nothing here feeds back into the run: the observer only prints, and the
//! summary is rendered from the finished log and verdict.

use std::path::Path;

use serde_json::json;

use simprobe_core::analyzer::{Classification, Verdict};
use simprobe_core::config::HeuristicConfig;
use simprobe_core::device::DeviceTarget;
use simprobe_core::explorer::ExplorationObserver;
use simprobe_core::script::{ProbeScript, ProbeStep};
use simprobe_core::session::{ExplorationLog, LogEntry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Prints a line per step and per action while a probe runs.
///
/// Silent in JSON mode and when `quiet` is set.
pub struct ConsoleObserver {
    enabled: bool,
}

impl ConsoleObserver {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self {
            enabled: format == OutputFormat::Text && !quiet,
        }
    }

    pub fn header(&self, target: &DeviceTarget, script: &ProbeScript, artifact_dir: &Path) {
        if !self.enabled {
            return;
        }
        println!("simprobe: {} probe", script.name);
        println!("{}", "=".repeat(60));
        println!("Device:    {}", target.udid);
        println!("Bundle:    {}", target.bundle_id);
        println!("Captures:  {}", artifact_dir.display());
        println!("Actions:   {}", script.action_count());
        println!("{}", "=".repeat(60));
    }
}

impl ExplorationObserver for ConsoleObserver {
    fn step_started(&mut self, step: &ProbeStep) {
        if self.enabled {
            println!("\n[{:02}] {}", step.ordinal, step.title);
        }
    }

    fn action_finished(&mut self, entry: &LogEntry) {
        if !self.enabled {
            return;
        }
        if entry.result.succeeded {
            println!("  ok    {}", entry.action.describe());
        } else {
            println!(
                "  FAIL  {}: {}",
                entry.action.describe(),
                entry.result.diagnostic().unwrap_or("no output")
            );
        }
    }
}

/// Renders the capture list and verdict.
pub fn print_summary(log: &ExplorationLog, verdict: &Verdict, heuristic: &HeuristicConfig, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", summary_json(log, verdict)),
        OutputFormat::Text => print_text_summary(log, verdict, heuristic),
    }
}

fn summary_json(log: &ExplorationLog, verdict: &Verdict) -> serde_json::Value {
    let artifacts: Vec<_> = log
        .artifacts()
        .map(|a| {
            json!({
                "file": a.file_name(),
                "path": a.path,
                "bytes": a.size_on_disk(),
            })
        })
        .collect();

    json!({
        "artifact_dir": log.artifact_dir(),
        "log_file": log.log_path(),
        "actions": log.entries().len(),
        "failures": log.failure_count(),
        "artifacts": artifacts,
        "verdict": verdict,
    })
}

fn print_text_summary(log: &ExplorationLog, verdict: &Verdict, heuristic: &HeuristicConfig) {
    println!("\nCaptures in {}:", log.artifact_dir().display());
    let mut any = false;
    for artifact in log.artifacts() {
        any = true;
        match artifact.size_on_disk() {
            Some(bytes) => println!("  {:<32} {:>10} bytes", artifact.file_name(), bytes),
            None => println!("  {:<32} {:>10}", artifact.file_name(), "missing"),
        }
    }
    if !any {
        println!("  (none)");
    }
    println!(
        "{} actions, {} failed",
        log.entries().len(),
        log.failure_count()
    );

    println!("\nTransition analysis ({})", verdict.metric);
    println!("{}", "-".repeat(40));
    for line in verdict_lines(verdict, heuristic) {
        println!("{}", line);
    }

    if verdict.classification != Classification::LikelySuccess {
        println!("\nManual verification recommended:");
        println!("  1. Open the iOS Simulator");
        println!("  2. Open the app under test");
        println!("  3. Navigate to the Profile tab");
        println!("  4. Find 'Manage Household'");
        println!("  5. Walk through household creation");
    }
}

/// Human-readable verdict lines.
pub fn verdict_lines(verdict: &Verdict, heuristic: &HeuristicConfig) -> Vec<String> {
    match verdict.classification {
        Classification::LikelySuccess => vec![
            format!(
                "Detected {} screen changes across {} captures",
                verdict.distinct_screen_estimate, verdict.artifact_count
            ),
            "LIKELY SUCCESS: the probed feature appears reachable".to_string(),
        ],
        Classification::NeedsManualReview => vec![
            format!(
                "Only {} screen changes detected across {} captures (need {})",
                verdict.distinct_screen_estimate, verdict.artifact_count, heuristic.success_transitions
            ),
            "NEEDS MANUAL REVIEW: inspect the captures".to_string(),
        ],
        Classification::LikelyFailure => vec![
            format!(
                "Only {} captures found (need at least {})",
                verdict.artifact_count, heuristic.min_artifacts
            ),
            "LIKELY FAILURE: the app may not have responded".to_string(),
        ],
    }
}
