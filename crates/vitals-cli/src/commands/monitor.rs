//! Monitor command implementation.
//!
//! Starts a session for every configured tracker the device supports and
//! prints everything the bus publishes until interrupted, until `count`
//! samples have been shown, or until every tracker has failed.

use std::io::Write;

use anyhow::{Result, bail};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use vitals_core::{EventPayload, TrackerSession};
use vitals_types::Severity;

use crate::cli::OutputFormat;
use crate::commands::connect;
use crate::config::Config;
use crate::format::{FormatOptions, format_event_text};

pub async fn cmd_monitor(
    out: &mut dyn Write,
    config: &Config,
    count: u32,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<()> {
    let mut conn = connect(config).await?;

    let sessions: Vec<TrackerSession> = config
        .tracker_kinds()?
        .into_iter()
        .filter(|kind| conn.capabilities.supports(*kind))
        .map(|kind| conn.open_session(kind))
        .collect::<Result<_>>()?;
    if sessions.is_empty() {
        bail!(
            "None of the configured trackers are supported (device supports: {})",
            conn.capabilities
        );
    }
    for session in &sessions {
        session.start()?;
    }
    info!("Monitoring {} tracker(s)", sessions.len());

    let mut samples: u32 = 0;
    let result = loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                break Ok(());
            }
            event = conn.events.recv() => event,
        };

        let event = match event {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Output fell behind, skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break Ok(()),
        };

        let content = match format {
            OutputFormat::Json => opts.as_json(&event)?,
            OutputFormat::Text => format_event_text(&event, opts),
        };
        out.write_all(content.as_bytes())?;
        out.flush()?;

        match event.payload {
            EventPayload::Alert { alert } if alert.severity() == Severity::Failure => {
                if sessions.iter().all(|session| !session.is_running()) {
                    break Err(anyhow::anyhow!("All trackers stopped: {}", alert));
                }
            }
            EventPayload::HeartRate { .. } | EventPayload::SpO2 { .. } => {
                samples += 1;
                if count > 0 && samples >= count {
                    break Ok(());
                }
            }
            _ => {}
        }
    };

    for session in &sessions {
        session.stop();
    }
    if result.is_ok() && count > 0 {
        eprintln!("Completed {} samples.", samples);
    }
    result
}
