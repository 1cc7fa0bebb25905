//! Measure command implementation.
//!
//! Takes one blood oxygen reading. Status changes are printed as they
//! happen in text mode; JSON mode prints only the outcome.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use time::OffsetDateTime;
use tracing::debug;
use vitals_types::TrackerKind;

use crate::cli::OutputFormat;
use crate::commands::connect;
use crate::config::Config;
use crate::format::{
    FormatOptions, format_alert, format_clock, format_outcome_text, format_spo2_line,
};
use crate::measurement::{Measurement, MeasurementOutcome, MeasurementUpdate};

pub async fn cmd_measure(
    out: &mut dyn Write,
    config: &Config,
    duration_ms: Option<u64>,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<MeasurementOutcome> {
    let conn = connect(config).await?;
    let session = conn.open_session(TrackerKind::SpO2)?;
    let duration = Duration::from_millis(duration_ms.unwrap_or(config.measurement_duration_ms));
    let tick = Duration::from_millis(config.tick_ms);
    let mut measurement = Measurement::new(session, duration, tick);

    if format == OutputFormat::Text {
        writeln!(
            out,
            "Measuring SpO2 for up to {:.0} s. Keep your arm still.",
            duration.as_secs_f64()
        )?;
    }

    let mut progress = format == OutputFormat::Text;
    let outcome = measurement
        .run(|update| {
            if !progress {
                return;
            }
            let now = OffsetDateTime::now_utc();
            let line = match update {
                MeasurementUpdate::Status(sample) => format_spo2_line(now, &sample, opts),
                MeasurementUpdate::Alert(alert) => format!(
                    "{}  {}\n",
                    format_clock(now),
                    format_alert(alert, opts.no_color)
                ),
            };
            if let Err(e) = out.write_all(line.as_bytes()) {
                debug!("Progress output failed, suppressing further lines: {}", e);
                progress = false;
            }
        })
        .await?;

    let content = match format {
        OutputFormat::Json => opts.as_json(&outcome)?,
        OutputFormat::Text => format_outcome_text(&outcome, opts),
    };
    out.write_all(content.as_bytes())?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InjectedError, SimulationConfig};
    use vitals_types::Alert;

    fn config(simulation: SimulationConfig) -> Config {
        Config {
            tick_ms: 10,
            simulation: SimulationConfig {
                sample_interval_ms: 10,
                seed: Some(11),
                ..simulation
            },
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_measure_completes() {
        let mut out = Vec::new();
        let opts = FormatOptions::new(true);
        let outcome = cmd_measure(
            &mut out,
            &config(SimulationConfig::default()),
            Some(5_000),
            OutputFormat::Text,
            &opts,
        )
        .await
        .unwrap();

        let MeasurementOutcome::Completed { value, .. } = outcome else {
            panic!("expected completion, got {:?}", outcome);
        };
        assert!((95..=99).contains(&value));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[MEASURING]"));
        assert!(text.contains("[MOVING]"));
        assert!(text.contains(&format!("SpO2: {}%", value)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_measure_reports_tracker_failure_as_json() {
        let mut out = Vec::new();
        let opts = FormatOptions::new(true).with_compact(true);
        let outcome = cmd_measure(
            &mut out,
            &config(SimulationConfig {
                inject_error: Some(InjectedError::Policy),
                error_after_samples: 2,
                ..Default::default()
            }),
            Some(5_000),
            OutputFormat::Json,
            &opts,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            MeasurementOutcome::Failed {
                alert: Alert::PolicyRestricted
            }
        );
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["outcome"], "failed");
    }

    /// Accepts `budget` bytes, then fails every write.
    struct ClosedAfter {
        budget: usize,
        rejected: usize,
    }

    impl Write for ClosedAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.budget == 0 {
                self.rejected += 1;
                return Err(std::io::ErrorKind::BrokenPipe.into());
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_broken_progress_output_is_not_retried() {
        let header = "Measuring SpO2 for up to 5 s. Keep your arm still.\n";
        let mut out = ClosedAfter {
            budget: header.len(),
            rejected: 0,
        };
        let err = cmd_measure(
            &mut out,
            &config(SimulationConfig::default()),
            Some(5_000),
            OutputFormat::Text,
            &FormatOptions::new(true),
        )
        .await
        .unwrap_err();

        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::BrokenPipe);
        // One failed progress line, then the outcome.
        assert_eq!(out.rejected, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_measure_without_spo2_support() {
        let mut out = Vec::new();
        let result = cmd_measure(
            &mut out,
            &config(SimulationConfig {
                supported: vec!["heart_rate".into()],
                ..Default::default()
            }),
            None,
            OutputFormat::Text,
            &FormatOptions::new(true),
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("not supported"));
    }
}
