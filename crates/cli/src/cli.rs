//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lane Session - closed-loop lane-detection session for the CARLA simulator
#[derive(Parser, Debug)]
#[command(
    name = "lane-session",
    author,
    version,
    about = "Closed-loop lane-detection session for the CARLA simulator",
    long_about = "Drives a CARLA world in lock-step, runs lane detection on a front camera,\n\
                  shows the result with debug thumbnails, optionally records it and \n\
                  feeds a validation harness once the simulation has warmed up."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LANE_SESSION_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "LANE_SESSION_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "LANE_SESSION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the town to load
    #[arg(long, env = "LANE_SESSION_TOWN")]
    pub town: Option<String>,

    /// Record every rendered result image
    #[arg(long)]
    pub record: bool,

    /// Disable the validation gate
    #[arg(long)]
    pub no_validation: bool,

    /// Override CARLA server host from configuration
    #[arg(long, env = "LANE_SESSION_HOST")]
    pub host: Option<String>,

    /// Override CARLA server port from configuration
    #[arg(long, env = "LANE_SESSION_PORT")]
    pub port: Option<u16>,

    /// Stop after this many loop iterations (0 = unlimited)
    #[arg(long, default_value = "0", env = "LANE_SESSION_MAX_TICKS")]
    pub max_ticks: u64,

    /// Use the built-in mock simulator instead of a CARLA server
    #[arg(long, env = "LANE_SESSION_MOCK")]
    pub mock: bool,

    /// Do not read the keyboard
    #[arg(long)]
    pub no_keyboard: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LANE_SESSION_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "tree")]
    pub format: InfoFormat,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

/// `info` output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InfoFormat {
    /// Human-readable tree
    #[default]
    Tree,
    /// Effective configuration as TOML
    Toml,
    /// Effective configuration as JSON
    Json,
}
