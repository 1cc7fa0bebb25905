use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vitals_cli::cli::{Cli, Commands};
use vitals_cli::commands::{cmd_capabilities, cmd_config, cmd_decode, cmd_measure, cmd_monitor};
use vitals_cli::config::Config;
use vitals_cli::format::FormatOptions;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // The config command must work even when the file is missing or invalid
    let config = if matches!(cli.command, Commands::Config { .. }) {
        Config::default()
    } else {
        Config::load_validated(cli.config.as_deref())?
    };
    let no_color = cli.no_color || config.no_color || std::env::var_os("NO_COLOR").is_some();
    let mut stdout = io::stdout();

    match cli.command {
        Commands::Monitor { count, output } => {
            let opts = FormatOptions::new(no_color).with_compact(output.compact);
            cmd_monitor(&mut stdout, &config, count, output.format, &opts).await?;
        }
        Commands::Measure {
            duration_ms,
            output,
        } => {
            let opts = FormatOptions::new(no_color).with_compact(output.compact);
            let outcome =
                cmd_measure(&mut stdout, &config, duration_ms, output.format, &opts).await?;
            if !outcome.is_success() {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::Capabilities { output } => {
            let opts = FormatOptions::new(no_color).with_compact(output.compact);
            cmd_capabilities(&mut stdout, &config, output.format, &opts).await?;
        }
        Commands::Decode {
            packed_ibi,
            status,
            heart_rate,
            output,
        } => {
            let opts = FormatOptions::new(no_color).with_compact(output.compact);
            cmd_decode(&mut stdout, packed_ibi, status, heart_rate, output.format, &opts)?;
        }
        Commands::Config { action } => {
            cmd_config(&mut stdout, action, cli.config.as_deref())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
