//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "lift", version, about = "Linear lift controller CLI")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Persistent settings file (bounds, presets, theme, device name);
    /// in-memory when omitted
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full controller on the simulated rig in real time
    Simulate {
        /// How long to run before shutting down
        #[arg(long, value_name = "MS", default_value_t = 2_000)]
        duration_ms: u64,
        /// TOML scenario of timed panel, host and battery events
        #[arg(long, value_name = "FILE")]
        scenario: Option<PathBuf>,
        /// Battery state of charge at start-up (%)
        #[arg(long, value_name = "PERCENT", default_value_t = 80.0)]
        soc: f32,
    },
    /// Measure and store the travel bounds (simulated rig unless built with `hardware`)
    Calibrate,
    /// Feed a recorded `t_ms,raw` sensor trace through the height estimator
    Replay {
        /// Trace CSV (strict header)
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Lower travel bound (mm); with --top also prints panel steps
        #[arg(long, value_name = "MM", requires = "top")]
        bottom: Option<f32>,
        /// Upper travel bound (mm)
        #[arg(long, value_name = "MM", requires = "bottom")]
        top: Option<f32>,
    },
    /// Quick check of configuration, store and the simulated sensor path
    SelfCheck,
    /// Health report for operational monitoring
    Health,
}
