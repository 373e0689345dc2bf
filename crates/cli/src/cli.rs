//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stereo Sampler - Sampling pipeline for stereo depth camera rigs
#[derive(Parser, Debug)]
#[command(
    name = "stereo-sampler",
    author,
    version,
    about = "Stereo depth rig sampling pipeline",
    long_about = "A sampling pipeline for stereo depth camera rigs.\n\n\
                  Builds the device topology from configuration, polls the \n\
                  color and depth output queues in lockstep, assembles CHW \n\
                  tensor samples, and dispatches them to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STEREO_SAMPLER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STEREO_SAMPLER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sampling pipeline
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
        default_value = "rig.toml",
        env = "STEREO_SAMPLER_CONFIG"
    )]
    pub config: PathBuf,

    /// Device backend to run against
    #[arg(
        long,
        value_enum,
        default_value = "mock",
        env = "STEREO_SAMPLER_BACKEND"
    )]
    pub backend: Backend,

    /// Recorded session directory (replay backend only)
    #[arg(long, env = "STEREO_SAMPLER_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = original speed)
    #[arg(long, default_value = "1.0")]
    pub replay_speed: f64,

    /// Loop replay when the recording ends
    #[arg(long)]
    pub replay_loop: bool,

    /// Maximum number of samples to capture (0 = unlimited)
    #[arg(long, default_value = "0", env = "STEREO_SAMPLER_MAX_SAMPLES")]
    pub max_samples: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "STEREO_SAMPLER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for the dispatcher input queue
    #[arg(long, default_value = "100", env = "STEREO_SAMPLER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "STEREO_SAMPLER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "rig.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "rig.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-stream frame layout
    #[arg(long)]
    pub streams: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Device backend selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Synthetic frames, no camera required
    #[default]
    Mock,
    /// Replay a recorded session
    Replay,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
