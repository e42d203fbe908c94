//! Command-line runner for blind iOS Simulator exploration probes.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in household probe against the booted simulator
//! simprobe run
//!
//! # Target a specific simulator and app
//! simprobe run --device 34CF8CC3-211A-4B4E-B04F-EF09DDD381D3 --bundle com.roomies.HouseholdApp
//!
//! # Compare captures by pixels instead of file size
//! simprobe run --metric pixel
//!
//! # Run a custom fixed script
//! simprobe script > probe.json
//! simprobe run --script probe.json
//!
//! # Re-analyze a previous run
//! simprobe analyze /tmp/simprobe/run_20261019_080509
//!
//! # Machine-readable output
//! simprobe --format json run
//! ```

mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use simprobe_core::analyzer::TransitionAnalyzer;
use simprobe_core::config::{ConfigError, ProbeConfig};
use simprobe_core::device::{DeviceClient, DeviceTarget};
use simprobe_core::explorer::ExplorationDriver;
use simprobe_core::metric::TransitionMetric;
use simprobe_core::runner::ProcessRunner;
use simprobe_core::script::ProbeScript;
use simprobe_core::session::ExplorationLog;
use simprobe_core::simctl::{self, Simctl};

use crate::report::{ConsoleObserver, OutputFormat};

/// File name of the per-run tracing log.
const RUN_LOG_FILENAME: &str = "simprobe.log";

/// Blind exploration of iOS Simulator apps through taps and screenshots.
#[derive(Parser)]
#[command(name = "simprobe")]
#[command(about = "Probe an iOS Simulator app by coordinate taps and judge screen transitions")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.simprobe/config.json)
    #[arg(short, long, env = "SIMPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Suppress the per-action trace
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum MetricArg {
    /// Compare capture file sizes
    Size,
    /// Compare decoded grayscale pixels
    Pixel,
}

#[derive(Subcommand)]
enum Command {
    /// Run a probe script against the simulator and print a verdict
    Run {
        /// Simulator UDID, or "booted"
        #[arg(short, long, env = "SIMPROBE_DEVICE")]
        device: Option<String>,
        /// Bundle identifier of the app under test
        #[arg(short, long, env = "SIMPROBE_BUNDLE")]
        bundle: Option<String>,
        /// Directory for captures (defaults to a timestamped run directory)
        #[arg(short = 'o', long, env = "SIMPROBE_ARTIFACT_DIR")]
        artifact_dir: Option<PathBuf>,
        /// JSON probe script to run instead of the built-in household probe
        #[arg(long)]
        script: Option<PathBuf>,
        /// Screen-change metric
        #[arg(short, long)]
        metric: Option<MetricArg>,
        /// Terminate the app when the script finishes
        #[arg(long)]
        terminate: bool,
    },

    /// Re-run the transition analysis on a previous run
    Analyze {
        /// Run directory or exploration.jsonl file
        path: PathBuf,
        /// Screen-change metric
        #[arg(short, long)]
        metric: Option<MetricArg>,
    },

    /// Print the built-in probe script as JSON
    Script,

    /// List available simulators
    ListDevices,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // A broken default config is reported once tracing is installed.
    let (config, config_warning) = match &cli.config {
        Some(path) => match ProbeConfig::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => match ProbeConfig::load_default() {
            Ok(config) => (config, None),
            Err(e) => (ProbeConfig::default(), Some(e)),
        },
    };
    let config_warning = config_warning.as_ref();

    let result = match cli.command {
        Command::Run {
            device,
            bundle,
            artifact_dir,
            script,
            metric,
            terminate,
        } => {
            let mut config = config;
            if let Some(device) = device {
                config.device = device;
            }
            if let Some(bundle) = bundle {
                config.bundle_id = bundle;
            }
            if let Some(metric) = metric {
                config.heuristic.metric = select_metric(metric, &config.heuristic.metric);
            }
            config.terminate_after |= terminate;
            run_probe(config, config_warning, artifact_dir, script, cli.format, cli.quiet).await
        }
        Command::Analyze { path, metric } => {
            let mut config = config;
            if let Some(metric) = metric {
                config.heuristic.metric = select_metric(metric, &config.heuristic.metric);
            }
            init_tracing(None, config_warning);
            analyze_run(&config, &path, cli.format)
        }
        Command::Script => {
            init_tracing(None, config_warning);
            print_script()
        }
        Command::ListDevices => {
            init_tracing(None, config_warning);
            list_devices(&config, cli.format)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Switches metric kind while keeping a configured threshold of the same kind.
fn select_metric(arg: MetricArg, configured: &TransitionMetric) -> TransitionMetric {
    match (arg, configured) {
        (MetricArg::Size, m @ TransitionMetric::FileSize { .. }) => m.clone(),
        (MetricArg::Pixel, m @ TransitionMetric::PixelDiff { .. }) => m.clone(),
        (MetricArg::Size, _) => TransitionMetric::default(),
        (MetricArg::Pixel, _) => TransitionMetric::PixelDiff { threshold: 0.05 },
    }
}

/// Installs the stderr subscriber (`RUST_LOG`, default `warn`) and, when a run
/// directory is given, a debug-level file log inside it. A config problem found
/// before the subscriber existed is reported here.
fn init_tracing(run_dir: Option<&Path>, config_warning: Option<&ConfigError>) {
    use tracing_subscriber::prelude::*;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let file_layer = run_dir.map(|dir| {
        let appender = tracing_appender::rolling::never(dir, RUN_LOG_FILENAME);
        tracing_subscriber::fmt::layer()
            .with_writer(appender)
            .with_ansi(false)
            .with_filter(EnvFilter::new("simprobe_core=debug,simprobe=debug"))
    });

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let Some(e) = config_warning {
        warn!(error = %e, "ignoring unreadable config file");
    }
}

async fn run_probe(
    mut config: ProbeConfig,
    config_warning: Option<&ConfigError>,
    artifact_dir: Option<PathBuf>,
    script_path: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let script = match script_path {
        Some(ref path) => ProbeScript::load(path)?,
        None => ProbeScript::household(),
    };

    // Captures and the log are append-only, so an earlier run is never reused.
    let started = chrono::Utc::now();
    let artifact_dir = artifact_dir.unwrap_or_else(|| config.fresh_run_dir(started));
    let log = ExplorationLog::create(&artifact_dir)?;
    init_tracing(Some(&artifact_dir), config_warning);

    // Best-effort: report the concrete simulator behind "booted".
    if config.device == simctl::BOOTED {
        match Simctl::get_booted_udid(&config.simctl_program) {
            Ok(udid) => {
                info!(%udid, "resolved booted simulator");
                config.device = udid;
            }
            Err(e) => warn!(error = %e, "could not resolve booted simulator, passing 'booted' through"),
        }
    }

    let target = DeviceTarget::new(config.device.clone(), config.bundle_id.clone());
    let client = DeviceClient::new(Arc::new(ProcessRunner), target.clone(), &artifact_dir)
        .with_settle(config.settle.clone())
        .with_program(config.simctl_program.clone());
    let driver = ExplorationDriver::new(client).terminate_after(config.terminate_after);

    let mut console = ConsoleObserver::new(format, quiet);
    console.header(&target, &script, &artifact_dir);

    let log = driver.run(&script, log, &mut console).await;
    let verdict = TransitionAnalyzer::new(config.heuristic.clone()).analyze_log(&log);

    report::print_summary(&log, &verdict, &config.heuristic, format);
    Ok(())
}

fn analyze_run(config: &ProbeConfig, path: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let log = ExplorationLog::load(path)?;
    let verdict = TransitionAnalyzer::new(config.heuristic.clone()).analyze_log(&log);
    report::print_summary(&log, &verdict, &config.heuristic, format);
    Ok(())
}

fn print_script() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&ProbeScript::household())?);
    Ok(())
}

fn list_devices(config: &ProbeConfig, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let devices = Simctl::list_devices(&config.simctl_program)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&devices)?),
        OutputFormat::Text => {
            if devices.is_empty() {
                println!("No simulators found");
            }
            for device in &devices {
                println!("{}  {:<10}  {}", device.udid, device.state, device.name);
            }
        }
    }
    Ok(())
}
