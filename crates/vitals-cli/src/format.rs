//! Output formatting for text and JSON output.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;

use vitals_core::{Capabilities, EventPayload, TrackerEvent};
use vitals_types::{
    Alert, HeartRateSample, HeartRateStatus, Severity, SpO2Sample, SpO2Status, TrackerKind,
};

use crate::measurement::MeasurementOutcome;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            compact: false,
        }
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Wall-clock time of an event as `HH:MM:SS` (UTC).
#[must_use]
pub fn format_clock(at: OffsetDateTime) -> String {
    format!("{:02}:{:02}:{:02}", at.hour(), at.minute(), at.second())
}

// ============================================================================
// Status labels
// ============================================================================

/// Heart rate status as a short bracketed label.
#[must_use]
pub fn format_heart_rate_status(status: HeartRateStatus, no_color: bool) -> String {
    let label = match status {
        HeartRateStatus::FindingHr => "FOUND",
        HeartRateStatus::Attached => "ATTACHED",
        HeartRateStatus::DetectingMove => "MOVING",
        HeartRateStatus::Detached => "DETACHED",
        HeartRateStatus::LowReliability => "LOW",
        HeartRateStatus::VeryLowReliability => "VERY LOW",
        HeartRateStatus::NoDataFlush => "NO DATA",
        _ => "WAITING",
    };

    if no_color {
        return format!("[{}]", label);
    }
    match status {
        HeartRateStatus::FindingHr => format!("[{}]", label.green()),
        HeartRateStatus::Detached | HeartRateStatus::VeryLowReliability => {
            format!("[{}]", label.red())
        }
        HeartRateStatus::DetectingMove | HeartRateStatus::LowReliability => {
            format!("[{}]", label.yellow())
        }
        _ => format!("[{}]", label.dimmed()),
    }
}

/// Blood oxygen status as a short bracketed label.
#[must_use]
pub fn format_spo2_status(status: SpO2Status, no_color: bool) -> String {
    let label = match status {
        SpO2Status::Calculating => "MEASURING",
        SpO2Status::Completed => "DONE",
        SpO2Status::DeviceMoving => "MOVING",
        SpO2Status::LowSignal => "LOW SIGNAL",
        _ => "WAITING",
    };

    if no_color {
        return format!("[{}]", label);
    }
    match status {
        SpO2Status::Completed => format!("[{}]", label.green()),
        SpO2Status::Calculating => format!("[{}]", label.cyan()),
        SpO2Status::DeviceMoving | SpO2Status::LowSignal => format!("[{}]", label.yellow()),
        _ => format!("[{}]", label.dimmed()),
    }
}

/// Alert line, colored by severity.
#[must_use]
pub fn format_alert(alert: Alert, no_color: bool) -> String {
    let tag = match alert.severity() {
        Severity::Warning => "[!!]",
        Severity::Failure => "[ERR]",
    };
    if no_color {
        return format!("{} {}", tag, alert);
    }
    match alert.severity() {
        Severity::Warning => format!("{} {}", tag.yellow(), alert),
        Severity::Failure => format!("{} {}", tag.red().bold(), alert),
    }
}

// ============================================================================
// Samples and events
// ============================================================================

/// One line for a heart rate sample.
#[must_use]
pub fn format_heart_rate_line(
    at: OffsetDateTime,
    sample: &HeartRateSample,
    opts: &FormatOptions,
) -> String {
    let bpm = match sample.bpm() {
        Some(bpm) if opts.no_color => format!("{:>3} bpm", bpm),
        Some(bpm) => format!("{:>3} bpm", bpm.bold()),
        None => " -- bpm".to_string(),
    };
    let mut line = format!(
        "{}  {}  {}  IBI {} ms",
        format_clock(at),
        format_heart_rate_status(sample.status, opts.no_color),
        bpm,
        sample.ibi_ms()
    );
    if sample.ibi_quality_bad() {
        if opts.no_color {
            line.push_str(" (low quality)");
        } else {
            line.push_str(&format!(" {}", "(low quality)".dimmed()));
        }
    }
    line + "\n"
}

/// One line for a blood oxygen status change.
#[must_use]
pub fn format_spo2_line(at: OffsetDateTime, sample: &SpO2Sample, opts: &FormatOptions) -> String {
    let status = format_spo2_status(sample.status, opts.no_color);
    match sample.reading() {
        Some(value) if opts.no_color => format!("{}  {}  {}%\n", format_clock(at), status, value),
        Some(value) => format!("{}  {}  {}%\n", format_clock(at), status, value.bold()),
        None => format!("{}  {}  {}\n", format_clock(at), status, sample.status),
    }
}

/// Text line for any forwarded event.
#[must_use]
pub fn format_event_text(event: &TrackerEvent, opts: &FormatOptions) -> String {
    match &event.payload {
        EventPayload::HeartRate { sample } => {
            format_heart_rate_line(event.received_at, sample, opts)
        }
        EventPayload::SpO2 { sample } => format_spo2_line(event.received_at, sample, opts),
        EventPayload::Alert { alert } => format!(
            "{}  {}\n",
            format_clock(event.received_at),
            format_alert(*alert, opts.no_color)
        ),
        other => format!("{}  {:?}\n", format_clock(event.received_at), other),
    }
}

// ============================================================================
// Capabilities
// ============================================================================

#[derive(Serialize)]
struct CapabilitiesReport<'a> {
    supported: &'a [TrackerKind],
    missing: Vec<TrackerKind>,
}

/// Supported and missing trackers, one per line.
#[must_use]
pub fn format_capabilities_text(capabilities: &Capabilities, opts: &FormatOptions) -> String {
    let mut output = String::new();
    for kind in TrackerKind::ALL {
        let (mark, note) = if capabilities.supports(kind) {
            ("[OK]", "supported")
        } else {
            ("[--]", "not supported")
        };
        let mark = match (opts.no_color, capabilities.supports(kind)) {
            (true, _) => mark.to_string(),
            (false, true) => mark.green().to_string(),
            (false, false) => mark.yellow().to_string(),
        };
        output.push_str(&format!("{} {:<12} {}\n", mark, kind.to_string(), note));
    }
    output
}

pub fn format_capabilities_json(capabilities: &Capabilities, opts: &FormatOptions) -> Result<String> {
    opts.as_json(&CapabilitiesReport {
        supported: capabilities.supported(),
        missing: capabilities.missing(),
    })
}

// ============================================================================
// Decode
// ============================================================================

/// Field-by-field view of a decoded heart rate record.
#[must_use]
pub fn format_decode_text(sample: &HeartRateSample, opts: &FormatOptions) -> String {
    let quality = if sample.ibi_quality_bad() { "bad" } else { "good" };
    let mut output = String::new();
    output.push_str(&format!("Packed IBI:  0x{:04X}\n", sample.packed_ibi()));
    output.push_str(&format!("IBI:         {} ms\n", sample.ibi_ms()));
    output.push_str(&format!("Quality:     {}\n", quality));
    output.push_str(&format!(
        "Status:      {} {}\n",
        format_heart_rate_status(sample.status, opts.no_color),
        sample.status
    ));
    output.push_str(&format!("Heart rate:  {}\n", sample.heart_rate));
    output
}

// ============================================================================
// Measurement
// ============================================================================

/// Summary of a finished blood oxygen measurement.
#[must_use]
pub fn format_outcome_text(outcome: &MeasurementOutcome, opts: &FormatOptions) -> String {
    match outcome {
        MeasurementOutcome::Completed { value, elapsed_ms } => {
            let value = if opts.no_color {
                format!("{}%", value)
            } else {
                format!("{}", format!("{}%", value).green().bold())
            };
            format!(
                "SpO2: {} (measured in {:.1} s)\n",
                value,
                *elapsed_ms as f64 / 1000.0
            )
        }
        MeasurementOutcome::TimedOut { elapsed_ms } => {
            let msg = format!(
                "No result after {:.1} s; keep the watch still and try again",
                *elapsed_ms as f64 / 1000.0
            );
            if opts.no_color {
                format!("[!!] {}\n", msg)
            } else {
                format!("{} {}\n", "[!!]".yellow(), msg)
            }
        }
        MeasurementOutcome::Failed { alert } => {
            format!("{}\n", format_alert(*alert, opts.no_color))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn plain() -> FormatOptions {
        FormatOptions::new(true)
    }

    #[test]
    fn test_heart_rate_line_no_color() {
        let sample = HeartRateSample::new(HeartRateStatus::FindingHr, 72, 830);
        let line = format_heart_rate_line(datetime!(2024-01-15 10:30:05 UTC), &sample, &plain());
        assert_eq!(line, "10:30:05  [FOUND]   72 bpm  IBI 830 ms\n");
    }

    #[test]
    fn test_heart_rate_line_without_value() {
        let sample = HeartRateSample::new(HeartRateStatus::Detached, 0, 0x8000 | 12);
        let line = format_heart_rate_line(datetime!(2024-01-15 08:00:00 UTC), &sample, &plain());
        assert!(line.contains("[DETACHED]"));
        assert!(line.contains(" -- bpm"));
        assert!(line.contains("IBI 12 ms (low quality)"));
    }

    #[test]
    fn test_spo2_line() {
        let at = datetime!(2024-01-15 10:30:05 UTC);
        let done = format_spo2_line(at, &SpO2Sample::new(SpO2Status::Completed, 97), &plain());
        assert_eq!(done, "10:30:05  [DONE]  97%\n");

        let moving = format_spo2_line(at, &SpO2Sample::new(SpO2Status::DeviceMoving, 0), &plain());
        assert_eq!(moving, "10:30:05  [MOVING]  Device moving\n");
    }

    #[test]
    fn test_alert_tags_follow_severity() {
        assert!(format_alert(Alert::CapabilityMissing(TrackerKind::SpO2), true).starts_with("[!!]"));
        assert!(format_alert(Alert::PermissionDenied, true).starts_with("[ERR]"));
    }

    #[test]
    fn test_colored_label_keeps_text() {
        let colored = format_heart_rate_status(HeartRateStatus::FindingHr, false);
        assert!(colored.contains("FOUND"));
        assert!(colored.contains("\x1b["));
        assert!(!format_heart_rate_status(HeartRateStatus::FindingHr, true).contains("\x1b["));
    }

    #[test]
    fn test_capabilities_text_and_json() {
        let caps = Capabilities::new([TrackerKind::HeartRate]);
        let text = format_capabilities_text(&caps, &plain());
        assert!(text.contains("[OK] Heart Rate"));
        assert!(text.contains("[--] SpO2"));

        let json = format_capabilities_json(&caps, &plain().with_compact(true)).unwrap();
        assert_eq!(json, "{\"supported\":[\"heart_rate\"],\"missing\":[\"spo2\"]}\n");
    }

    #[test]
    fn test_decode_text() {
        let sample = HeartRateSample::new(HeartRateStatus::FindingHr, 64, 0x8000 | 920);
        let text = format_decode_text(&sample, &plain());
        assert!(text.contains("Packed IBI:  0x8398"));
        assert!(text.contains("IBI:         920 ms"));
        assert!(text.contains("Quality:     bad"));
        assert!(text.contains("Heart rate:  64"));
    }

    #[test]
    fn test_outcome_text() {
        let done = MeasurementOutcome::Completed {
            value: 98,
            elapsed_ms: 12_400,
        };
        assert_eq!(
            format_outcome_text(&done, &plain()),
            "SpO2: 98% (measured in 12.4 s)\n"
        );

        let timed_out = MeasurementOutcome::TimedOut { elapsed_ms: 35_000 };
        assert!(format_outcome_text(&timed_out, &plain()).starts_with("[!!] No result after 35.0 s"));
    }

    #[test]
    fn test_event_text_alert() {
        let event = TrackerEvent {
            received_at: datetime!(2024-01-15 23:59:59 UTC),
            payload: EventPayload::Alert {
                alert: Alert::PolicyRestricted,
            },
        };
        assert_eq!(
            format_event_text(&event, &plain()),
            "23:59:59  [ERR] Tracker access denied by SDK policy\n"
        );
    }

    #[test]
    fn test_as_json_compact_vs_pretty() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(plain().with_compact(true).as_json(&value).unwrap(), "{\"a\":1}\n");
        assert!(plain().as_json(&value).unwrap().contains("\n  \"a\": 1"));
    }
}
