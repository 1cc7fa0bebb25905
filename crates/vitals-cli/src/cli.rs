//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Output compact JSON (one object per line)
    #[arg(long)]
    pub compact: bool,
}

#[derive(Parser)]
#[command(name = "vitals")]
#[command(author, version, about = "CLI for wearable heart rate and SpO2 trackers", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "VITALS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output (also honors NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream heart rate samples until interrupted
    Monitor {
        /// Stop after this many samples (0 for no limit)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run one blood oxygen measurement
    Measure {
        /// Give up after this many milliseconds (overrides config)
        #[arg(short, long)]
        duration_ms: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Connect and report which trackers the device supports
    Capabilities {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Decode a raw heart rate record
    Decode {
        /// Packed inter-beat interval (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_packed_ibi)]
        packed_ibi: u16,

        /// Raw heart rate status code
        #[arg(short, long, default_value = "1", allow_hyphen_values = true)]
        status: i32,

        /// Raw heart rate value
        #[arg(short = 'r', long, default_value = "0", allow_hyphen_values = true)]
        heart_rate: i32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Parse a 16-bit packed IBI given in decimal or `0x` hex.
pub fn parse_packed_ibi(value: &str) -> Result<u16, String> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse::<u16>(),
    };
    parsed.map_err(|_| format!("'{}' is not a 16-bit value (0-65535 or 0x0000-0xFFFF)", value))
}
