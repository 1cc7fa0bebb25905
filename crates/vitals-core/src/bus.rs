//! Process-wide fan-out of tracker notifications.
//!
//! The [`NotificationBus`] keeps a membership set of observers and delivers
//! every published sample or alert to each of them. It does not own the
//! observers: it stores [`Weak`] references, so an observer that is dropped
//! by its owner simply stops receiving notifications.
//!
//! Each publish takes a snapshot of the membership under a read lock and
//! delivers outside the lock. Observers added or removed while a delivery is
//! in flight do not disturb it; they take effect on the next publish.
//! Deliveries from one thread reach every observer in the order they were
//! published. Nothing is de-duplicated.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vitals_core::{NotificationBus, TrackerDataObserver};
//! use vitals_types::{Alert, HeartRateSample, SpO2Status};
//!
//! struct Printer;
//!
//! impl TrackerDataObserver for Printer {
//!     fn on_heart_rate_changed(&self, sample: HeartRateSample) {
//!         println!("{}", sample);
//!     }
//!     fn on_spo2_changed(&self, status: SpO2Status, value: i32) {
//!         println!("{} {}", status, value);
//!     }
//!     fn on_error(&self, alert: Alert) {
//!         eprintln!("{}", alert);
//!     }
//! }
//!
//! let bus = NotificationBus::new();
//! let printer = Arc::new(Printer);
//! bus.add_observer(&printer);
//! bus.publish_error(Alert::PermissionDenied);
//! bus.remove_observer(&printer);
//! ```

use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use tracing::debug;

use vitals_types::{Alert, HeartRateSample, SpO2Sample, SpO2Status};

/// Receiver of tracker notifications.
///
/// Callbacks run on the publishing thread, which is usually a session's
/// dispatch worker. They should return quickly.
pub trait TrackerDataObserver: Send + Sync {
    /// A heart rate sample was decoded.
    fn on_heart_rate_changed(&self, sample: HeartRateSample);

    /// A blood oxygen sample was decoded.
    ///
    /// `value` is only meaningful when `status` is [`SpO2Status::Completed`].
    fn on_spo2_changed(&self, status: SpO2Status, value: i32);

    /// A tracker failed or the device lacks a capability.
    ///
    /// Check [`Alert::severity`] to tell warnings from failures.
    fn on_error(&self, alert: Alert);
}

type ObserverRef = Weak<dyn TrackerDataObserver>;

/// Registry of observers with snapshot delivery.
#[derive(Default)]
pub struct NotificationBus {
    observers: RwLock<Vec<ObserverRef>>,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("observers", &self.observer_count())
            .finish()
    }
}

static GLOBAL: OnceLock<Arc<NotificationBus>> = OnceLock::new();

fn same_observer<O: TrackerDataObserver>(entry: &ObserverRef, observer: &Arc<O>) -> bool {
    std::ptr::addr_eq(entry.as_ptr(), Arc::as_ptr(observer))
}

impl NotificationBus {
    /// Create an empty bus.
    ///
    /// Most applications use [`NotificationBus::global`]; separate buses are
    /// useful in tests and embedded setups.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide bus, created on first use and never replaced.
    pub fn global() -> Arc<NotificationBus> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(NotificationBus::new())))
    }

    /// Register an observer. Returns `false` if it was already registered.
    pub fn add_observer<O: TrackerDataObserver + 'static>(&self, observer: &Arc<O>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        observers.retain(|entry| entry.strong_count() > 0);
        if observers.iter().any(|entry| same_observer(entry, observer)) {
            return false;
        }
        let weak: Weak<O> = Arc::downgrade(observer);
        observers.push(weak);
        debug!("Observer added ({} registered)", observers.len());
        true
    }

    /// Unregister an observer. Returns `false` if it was not registered.
    pub fn remove_observer<O: TrackerDataObserver + 'static>(&self, observer: &Arc<O>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|entry| !same_observer(entry, observer));
        let removed = observers.len() != before;
        observers.retain(|entry| entry.strong_count() > 0);
        if removed {
            debug!("Observer removed ({} registered)", observers.len());
        }
        removed
    }

    /// Number of registered observers that are still alive.
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Deliver a heart rate sample to every registered observer.
    pub fn publish_heart_rate(&self, sample: HeartRateSample) {
        for observer in self.snapshot() {
            observer.on_heart_rate_changed(sample);
        }
    }

    /// Deliver a blood oxygen status and value to every registered observer.
    pub fn publish_spo2(&self, status: SpO2Status, value: i32) {
        for observer in self.snapshot() {
            observer.on_spo2_changed(status, value);
        }
    }

    /// Convenience for [`publish_spo2`](Self::publish_spo2) with a decoded sample.
    pub fn publish_spo2_sample(&self, sample: SpO2Sample) {
        self.publish_spo2(sample.status, sample.value);
    }

    /// Deliver an alert to every registered observer.
    pub fn publish_error(&self, alert: Alert) {
        for observer in self.snapshot() {
            observer.on_error(alert);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn TrackerDataObserver>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}
