//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::DeviceProfile;
use std::path::PathBuf;

/// pulsefuse - wearable biosensor frame decoding and PPG/acceleration fusion
#[derive(Parser, Debug)]
#[command(
    name = "pulsefuse",
    author,
    version,
    about = "Biosensor notification decoder and PPG/acceleration fusion",
    long_about = "Decodes data notifications of optical heart-rate sensors, pairs every \n\
                  pulse sample with the latest acceleration sample (zero-order hold) \n\
                  and dispatches the fused records to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PULSEFUSE_VERBOSE")]
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
        env = "PULSEFUSE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode and fuse a notification stream
    Run(RunArgs),

    /// Record a synthetic device session to a capture file
    Capture(CaptureArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "pulsefuse.toml", env = "PULSEFUSE_CONFIG")]
    pub config: PathBuf,

    /// Replay notifications from a capture file
    #[arg(long, conflicts_with = "mock_seconds")]
    pub capture: Option<PathBuf>,

    /// Replay speed relative to device time (0 = as fast as possible)
    #[arg(long, default_value = "0", requires = "capture")]
    pub speed: f64,

    /// Length of the synthetic session when no capture is given
    #[arg(long, default_value = "10", env = "PULSEFUSE_MOCK_SECONDS")]
    pub mock_seconds: f64,

    /// Release synthetic notifications in real time
    #[arg(long)]
    pub realtime: bool,

    /// Stop after this many fused records (0 = unlimited)
    #[arg(long, default_value = "0", env = "PULSEFUSE_MAX_RECORDS")]
    pub max_records: u64,

    /// Stop after this many seconds of wall time (0 = no timeout)
    #[arg(long, default_value = "0", env = "PULSEFUSE_TIMEOUT")]
    pub timeout: u64,

    /// Dispatcher input buffer size
    #[arg(long, default_value = "1024", env = "PULSEFUSE_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Prometheus exporter port (0 = disabled)
    #[arg(long, default_value = "0", env = "PULSEFUSE_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON instead of a text summary
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `capture` command
#[derive(Parser, Debug, Clone)]
pub struct CaptureArgs {
    /// Sensor model to imitate
    #[arg(short, long, value_enum, default_value = "oh1")]
    pub profile: ProfileArg,

    /// Length of the recording in device time
    #[arg(short, long, default_value = "10")]
    pub seconds: f64,

    /// Replace every n-th notification with a truncated frame (0 = never)
    #[arg(long, default_value = "0")]
    pub corrupt_every: u64,

    /// Output capture file
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pulsefuse.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "pulsefuse.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the control commands sent at start
    #[arg(long)]
    pub commands: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Sensor model selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ProfileArg {
    /// Optical heart-rate armband (PPG + ACC)
    Oh1,
    /// Chest strap (ECG + ACC)
    H10,
}

impl From<ProfileArg> for DeviceProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Oh1 => DeviceProfile::Oh1,
            ProfileArg::H10 => DeviceProfile::H10,
        }
    }
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
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
