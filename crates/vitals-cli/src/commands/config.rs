//! Config command implementation.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::{Config, default_config_path};

pub fn cmd_config(
    out: &mut dyn Write,
    action: ConfigAction,
    explicit: Option<&Path>,
) -> Result<()> {
    let path: PathBuf = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    match action {
        ConfigAction::Path => {
            writeln!(out, "{}", path.display())?;
        }
        ConfigAction::Show => {
            let config = Config::load_validated(explicit)?;
            let content =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            out.write_all(content.as_bytes())?;
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Configuration file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            writeln!(out, "Wrote default configuration to {}", path.display())?;
        }
    }
    Ok(())
}
