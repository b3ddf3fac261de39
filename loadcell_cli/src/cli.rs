//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file tried when `--config` is not given; defaults apply if it is absent.
pub const DEFAULT_CONFIG_PATH: &str = "etc/loadcell.toml";

#[derive(Parser, Debug)]
#[command(name = "loadcell", version, about = "HX711 load cell scale")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Calibration file; overrides calibration.file from the config
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Print results and logs as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Zero the scale; it must be empty
    Tare,
    /// Calibrate against a known weight placed on the scale
    Calibrate {
        /// Known weight in grams
        #[arg(long, value_name = "GRAMS")]
        weight: f64,
        /// Tare first, then prompt for the weight to be placed
        #[arg(long, action = ArgAction::SetTrue)]
        tare_first: bool,
    },
    /// Print the live weight until Ctrl-C
    Watch {
        /// Print interval in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 500)]
        interval_ms: u64,
        /// Stop after this many lines
        #[arg(long, value_name = "N")]
        count: Option<u64>,
    },
    /// Show the stored calibration without touching the sensor
    Show,
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
}
