//! Capabilities command implementation.

use std::io::Write;

use anyhow::Result;

use crate::cli::OutputFormat;
use crate::commands::connect;
use crate::config::Config;
use crate::format::{FormatOptions, format_capabilities_json, format_capabilities_text};

pub async fn cmd_capabilities(
    out: &mut dyn Write,
    config: &Config,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<()> {
    let conn = connect(config).await?;
    let content = match format {
        OutputFormat::Json => format_capabilities_json(&conn.capabilities, opts)?,
        OutputFormat::Text => format_capabilities_text(&conn.capabilities, opts),
    };
    out.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_capabilities_json() {
        let config = Config {
            simulation: SimulationConfig {
                supported: vec!["spo2".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let mut out = Vec::new();
        let opts = FormatOptions::new(true).with_compact(true);
        cmd_capabilities(&mut out, &config, OutputFormat::Json, &opts)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"supported\":[\"spo2\"],\"missing\":[\"heart_rate\"]}\n"
        );
    }
}
