//! One blood oxygen measurement from start to result.
//!
//! A measurement starts the SpO2 session, watches the bus until the tracker
//! reports a completed value, a tracker failure arrives or the time budget
//! runs out, and then stops the session again.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use vitals_core::{NotificationBus, Result, TrackerDataObserver, TrackerSession};
use vitals_types::{Alert, HeartRateSample, Severity, SpO2Sample, SpO2Status};

use crate::policy::SpO2StatusFilter;

/// Something the user should see while a measurement runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementUpdate {
    /// The measurement status changed.
    Status(SpO2Sample),
    /// An alert arrived on the bus.
    Alert(Alert),
}

/// How a measurement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MeasurementOutcome {
    /// The tracker reported a value.
    Completed { value: i32, elapsed_ms: u64 },
    /// No value arrived within the time budget.
    TimedOut { elapsed_ms: u64 },
    /// The tracker failed.
    Failed { alert: Alert },
}

impl MeasurementOutcome {
    /// Whether a value was obtained.
    pub fn is_success(&self) -> bool {
        matches!(self, MeasurementOutcome::Completed { .. })
    }
}

enum Update {
    Status(SpO2Sample),
    Alert(Alert),
}

/// Forwards bus notifications into the measurement task.
struct Relay {
    tx: mpsc::UnboundedSender<Update>,
}

impl TrackerDataObserver for Relay {
    fn on_heart_rate_changed(&self, _sample: HeartRateSample) {}

    fn on_spo2_changed(&self, status: SpO2Status, value: i32) {
        let _ = self.tx.send(Update::Status(SpO2Sample::new(status, value)));
    }

    fn on_error(&self, alert: Alert) {
        let _ = self.tx.send(Update::Alert(alert));
    }
}

/// Runner for SpO2 measurements on one session.
pub struct Measurement {
    session: TrackerSession,
    bus: Arc<NotificationBus>,
    duration: Duration,
    tick: Duration,
    filter: SpO2StatusFilter,
}

impl Measurement {
    /// Create a runner. `tick` is how often the time budget is checked.
    pub fn new(session: TrackerSession, duration: Duration, tick: Duration) -> Self {
        let bus = Arc::clone(session.bus());
        Self {
            session,
            bus,
            duration,
            tick,
            filter: SpO2StatusFilter::new(),
        }
    }

    /// The session being measured.
    pub fn session(&self) -> &TrackerSession {
        &self.session
    }

    /// Run one measurement, reporting status changes and alerts to
    /// `on_update` as they arrive.
    ///
    /// The session is stopped before this returns, whatever the outcome.
    pub async fn run<F>(&mut self, mut on_update: F) -> Result<MeasurementOutcome>
    where
        F: FnMut(MeasurementUpdate),
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let relay = Arc::new(Relay { tx });
        self.bus.add_observer(&relay);
        self.filter.reset();

        if let Err(e) = self.session.start() {
            self.bus.remove_observer(&relay);
            return Err(e);
        }
        info!(
            "SpO2 measurement started ({} ms budget)",
            self.duration.as_millis()
        );

        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if started.elapsed() >= self.duration {
                        warn!("SpO2 measurement timed out");
                        break MeasurementOutcome::TimedOut {
                            elapsed_ms: elapsed_ms(started),
                        };
                    }
                }
                Some(update) = rx.recv() => match update {
                    Update::Status(sample) => {
                        if !self.filter.accept(sample.status) {
                            continue;
                        }
                        debug!("SpO2 status changed to {}", sample.status);
                        on_update(MeasurementUpdate::Status(sample));
                        if let Some(value) = sample.reading() {
                            break MeasurementOutcome::Completed {
                                value,
                                elapsed_ms: elapsed_ms(started),
                            };
                        }
                    }
                    Update::Alert(alert) => {
                        on_update(MeasurementUpdate::Alert(alert));
                        if alert.severity() == Severity::Failure {
                            break MeasurementOutcome::Failed { alert };
                        }
                    }
                },
            }
        };

        self.session.stop();
        self.bus.remove_observer(&relay);
        info!("SpO2 measurement finished: {:?}", outcome);
        Ok(outcome)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
