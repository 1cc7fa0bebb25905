//! Simulated tracker output.
//!
//! [`Simulator`] owns a background thread that feeds every attached
//! [`MockTracker`] of a [`MockService`] with synthetic records, the way a
//! vendor service would deliver them from its own thread. Samples come from
//! a [`SignalGenerator`], which is seeded for reproducible runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use vitals_core::error::{OLD_PLATFORM_VERSION, PACKAGE_NOT_INSTALLED};
use vitals_core::mock::{MockService, MockServiceBuilder, MockTracker};
use vitals_core::tracker::{DataPoint, HealthTracker};
use vitals_types::decode::{MAX_IBI_MS, pack_ibi};
use vitals_types::{HeartRateStatus, SpO2Status, TrackerKind};

use crate::config::{ConfigError, InjectedError, SimulationConfig};

/// Steps of a simulated blood oxygen measurement, in order.
const SPO2_SCRIPT: [SpO2Status; 8] = [
    SpO2Status::Calculating,
    SpO2Status::Calculating,
    SpO2Status::DeviceMoving,
    SpO2Status::Calculating,
    SpO2Status::LowSignal,
    SpO2Status::Calculating,
    SpO2Status::Calculating,
    SpO2Status::Completed,
];

/// Build the mock service described by the simulation settings.
pub fn build_service(config: &SimulationConfig) -> Result<MockService, ConfigError> {
    let mut builder = MockServiceBuilder::new()
        .supported(&config.supported_kinds()?)
        .background(true);
    if let Some(code) = config.fail_connection {
        let has_resolution = matches!(code, OLD_PLATFORM_VERSION | PACKAGE_NOT_INSTALLED);
        builder = builder.fail_with(code, "Simulated connection failure", has_resolution);
    }
    Ok(builder.build())
}

/// Produces synthetic raw records.
#[derive(Debug)]
pub struct SignalGenerator {
    rng: StdRng,
    heart_rate_ticks: u32,
    spo2_attachment: u32,
    spo2_step: usize,
}

impl SignalGenerator {
    /// A generator with a fixed seed, or an OS-seeded one.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            heart_rate_ticks: 0,
            spo2_attachment: 0,
            spo2_step: 0,
        }
    }

    /// Next heart rate record. The first record of a run has no value yet.
    pub fn heart_rate(&mut self) -> DataPoint {
        self.heart_rate_ticks += 1;
        if self.heart_rate_ticks == 1 {
            return DataPoint::heart_rate(HeartRateStatus::None as i32, 0, 0);
        }

        let bpm: i32 = self.rng.random_range(58..=96);
        let jitter: i32 = self.rng.random_range(-25..=25);
        let ibi = (60_000 / bpm + jitter).clamp(0, i32::from(MAX_IBI_MS)) as u16;
        let quality_bad = self.rng.random_bool(0.1);
        DataPoint::heart_rate(
            HeartRateStatus::FindingHr as i32,
            bpm,
            pack_ibi(ibi, quality_bad),
        )
    }

    /// Next blood oxygen record for the given attachment.
    ///
    /// A new attachment restarts the script. After completion the tracker
    /// keeps reporting the completed value.
    pub fn spo2(&mut self, attachment: u32) -> DataPoint {
        if attachment != self.spo2_attachment {
            self.spo2_attachment = attachment;
            self.spo2_step = 0;
        }
        let status = SPO2_SCRIPT[self.spo2_step.min(SPO2_SCRIPT.len() - 1)];
        self.spo2_step += 1;

        let value = if status == SpO2Status::Completed {
            self.rng.random_range(95..=99)
        } else {
            0
        };
        DataPoint::spo2(status as i32, value)
    }
}

/// Background feeder for a mock service.
///
/// Dropping the simulator stops and joins its thread.
pub struct Simulator {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Simulator {
    /// Start feeding `service` according to `config`.
    pub fn spawn(service: Arc<MockService>, config: &SimulationConfig) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let interval = Duration::from_millis(config.sample_interval_ms);
        let mut feeder = Feeder {
            service,
            generator: SignalGenerator::new(config.seed),
            inject: config.inject_error,
            error_after: config.error_after_samples,
            emitted: 0,
        };

        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            info!("Simulator started ({} ms per sample)", interval.as_millis());
            while !thread_stop.load(Ordering::SeqCst) {
                feeder.tick();
                thread::park_timeout(interval);
            }
            debug!("Simulator stopped after {} samples", feeder.emitted);
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the feeder thread and wait for it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Feeder {
    service: Arc<MockService>,
    generator: SignalGenerator,
    inject: Option<InjectedError>,
    error_after: u32,
    emitted: u32,
}

impl Feeder {
    fn tick(&mut self) {
        for kind in TrackerKind::ALL {
            let Some(tracker) = self.service.tracker(kind) else {
                continue;
            };
            if !tracker.is_attached() {
                continue;
            }
            let point = match kind {
                TrackerKind::HeartRate => self.generator.heart_rate(),
                TrackerKind::SpO2 => self.generator.spo2(tracker.attach_count()),
            };
            if tracker.emit(&[point]) {
                self.emitted += 1;
                self.maybe_inject(&tracker);
            }
        }
    }

    fn maybe_inject(&mut self, tracker: &MockTracker) {
        if self.emitted < self.error_after {
            return;
        }
        if let Some(inject) = self.inject.take() {
            info!("Injecting {:?} error into {} tracker", inject, tracker.kind());
            tracker.fail(inject.tracker_error());
        }
    }
}
