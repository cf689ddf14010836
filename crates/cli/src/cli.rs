//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Queue Bridge - batch dispatcher for at-least-once message queues
#[derive(Parser, Debug)]
#[command(
    name = "queue-bridge",
    author,
    version,
    about = "Bridge message batches to an at-least-once queue",
    long_about = "Reads messages line by line, groups them into batches and dispatches \n\
                  each batch to the configured queue through a bounded worker pool.\n\n\
                  Excess batches are rejected instead of blocking the reader; throughput \n\
                  and pool occupancy are logged periodically."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "QUEUE_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "QUEUE_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read messages from stdin (or a file) and dispatch them
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "bridge.toml",
        env = "QUEUE_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Read messages from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override queue URL from configuration
    #[arg(long, env = "QUEUE_BRIDGE_QUEUE_URL")]
    pub queue_url: Option<String>,

    /// Override worker count from configuration
    #[arg(long, env = "QUEUE_BRIDGE_WORKERS")]
    pub workers: Option<usize>,

    /// Override backlog capacity from configuration
    #[arg(long, env = "QUEUE_BRIDGE_BACKLOG")]
    pub backlog_capacity: Option<usize>,

    /// Override messages per batch from configuration
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Stop reading after this many seconds (0 = until end of input)
    #[arg(long, default_value = "0", env = "QUEUE_BRIDGE_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without dispatching
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled, overrides telemetry.metrics_port)
    #[arg(long, env = "QUEUE_BRIDGE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show client params
    #[arg(long)]
    pub params: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
