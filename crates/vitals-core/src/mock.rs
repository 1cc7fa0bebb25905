//! Mock tracking service for testing.
//!
//! This module provides stand-ins for the vendor tracking service so the
//! session and supervisor logic can be exercised without a watch.
//!
//! - [`MockTracker`] records attach/detach/flush calls and lets a test (or a
//!   simulator thread) push raw records and errors into whatever listener is
//!   attached.
//! - [`MockService`] scripts the connection outcome and the capability set.
//!   Build one with [`MockServiceBuilder`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::debug;

use vitals_types::TrackerKind;

use crate::error::{ConnectionFailure, Error, Result};
use crate::supervisor::{ConnectionListener, HealthTrackingService};
use crate::tracker::{DataPoint, HealthTracker, TrackerError, TrackerEventListener};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock vendor tracker.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vitals_core::{DispatchContext, NotificationBus, TrackerSession};
/// use vitals_core::mock::MockTracker;
/// use vitals_core::tracker::DataPoint;
/// use vitals_types::TrackerKind;
///
/// let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
/// let session = TrackerSession::with_tracker(
///     tracker.clone(),
///     Arc::new(NotificationBus::new()),
///     DispatchContext::manual(),
/// );
///
/// session.start().unwrap();
/// assert!(tracker.emit(&[DataPoint::heart_rate(1, 72, 830)]));
/// assert_eq!(session.dispatch().run_pending(), 1);
/// session.stop();
/// assert_eq!(tracker.detach_count(), 1);
/// ```
pub struct MockTracker {
    kind: TrackerKind,
    listener: Mutex<Option<Arc<dyn TrackerEventListener>>>,
    attach_count: AtomicU32,
    detach_count: AtomicU32,
    flush_count: AtomicU32,
}

impl std::fmt::Debug for MockTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTracker")
            .field("kind", &self.kind)
            .field("attached", &self.is_attached())
            .field("attach_count", &self.attach_count())
            .field("detach_count", &self.detach_count())
            .finish()
    }
}

impl MockTracker {
    /// Create a detached mock tracker.
    pub fn new(kind: TrackerKind) -> Self {
        Self {
            kind,
            listener: Mutex::new(None),
            attach_count: AtomicU32::new(0),
            detach_count: AtomicU32::new(0),
            flush_count: AtomicU32::new(0),
        }
    }

    /// Number of `set_event_listener` calls.
    pub fn attach_count(&self) -> u32 {
        self.attach_count.load(Ordering::SeqCst)
    }

    /// Number of `unset_event_listener` calls.
    pub fn detach_count(&self) -> u32 {
        self.detach_count.load(Ordering::SeqCst)
    }

    /// Number of `flush` calls.
    pub fn flush_count(&self) -> u32 {
        self.flush_count.load(Ordering::SeqCst)
    }

    /// Whether a listener is attached.
    pub fn is_attached(&self) -> bool {
        lock(&self.listener).is_some()
    }

    /// The attached listener, if any.
    pub fn listener(&self) -> Option<Arc<dyn TrackerEventListener>> {
        lock(&self.listener).clone()
    }

    /// Deliver raw records to the attached listener.
    ///
    /// Returns `false` if no listener is attached.
    pub fn emit(&self, points: &[DataPoint]) -> bool {
        // Call outside our own lock: the listener may detach us.
        match self.listener() {
            Some(listener) => {
                listener.on_data_received(points);
                true
            }
            None => false,
        }
    }

    /// Report an error to the attached listener.
    ///
    /// Returns `false` if no listener is attached.
    pub fn fail(&self, error: TrackerError) -> bool {
        match self.listener() {
            Some(listener) => {
                listener.on_error(error);
                true
            }
            None => false,
        }
    }
}

impl HealthTracker for MockTracker {
    fn kind(&self) -> TrackerKind {
        self.kind
    }

    fn set_event_listener(&self, listener: Arc<dyn TrackerEventListener>) {
        self.attach_count.fetch_add(1, Ordering::SeqCst);
        *lock(&self.listener) = Some(listener);
    }

    fn unset_event_listener(&self) {
        self.detach_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.listener).take();
    }

    fn flush(&self) {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        if let Some(listener) = self.listener() {
            listener.on_flush_completed();
        }
    }
}

/// Scripted result of [`MockService`]'s connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// The service connects.
    Success,
    /// The service ends the connection right away.
    Ended,
    /// The service fails to connect.
    Failed(ConnectionFailure),
}

/// A mock vendor tracking service.
pub struct MockService {
    outcome: ConnectionOutcome,
    supported: Vec<TrackerKind>,
    background: bool,
    connected: Arc<AtomicBool>,
    connect_calls: AtomicU32,
    disconnect_calls: AtomicU32,
    trackers: Mutex<HashMap<TrackerKind, Arc<MockTracker>>>,
    listener: Mutex<Option<Arc<dyn ConnectionListener>>>,
}

impl std::fmt::Debug for MockService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockService")
            .field("outcome", &self.outcome)
            .field("supported", &self.supported)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl MockService {
    /// A service that connects inline and supports every tracker kind.
    pub fn new() -> Self {
        MockServiceBuilder::new().build()
    }

    /// Whether the mock considers itself connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of `connect_service` calls.
    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Number of `disconnect_service` calls.
    pub fn disconnect_calls(&self) -> u32 {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// The mock tracker handed out for `kind`, if one was requested.
    pub fn tracker(&self, kind: TrackerKind) -> Option<Arc<MockTracker>> {
        lock(&self.trackers).get(&kind).cloned()
    }

    /// Simulate the service dropping an established connection.
    pub fn end_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(listener) = lock(&self.listener).clone() {
            listener.on_connection_ended();
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(outcome: ConnectionOutcome, connected: &AtomicBool, listener: &dyn ConnectionListener) {
    match outcome {
        ConnectionOutcome::Success => {
            connected.store(true, Ordering::SeqCst);
            listener.on_connection_success();
        }
        ConnectionOutcome::Ended => {
            connected.store(false, Ordering::SeqCst);
            listener.on_connection_ended();
        }
        ConnectionOutcome::Failed(failure) => {
            connected.store(false, Ordering::SeqCst);
            listener.on_connection_failed(failure);
        }
    }
}

impl HealthTrackingService for MockService {
    fn connect_service(&self, listener: Arc<dyn ConnectionListener>) {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.listener) = Some(Arc::clone(&listener));

        let outcome = self.outcome.clone();
        if self.background {
            let connected = Arc::clone(&self.connected);
            thread::spawn(move || deliver(outcome, &connected, listener.as_ref()));
        } else {
            deliver(outcome, &self.connected, listener.as_ref());
        }
    }

    fn disconnect_service(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        lock(&self.listener).take();
    }

    fn supported_trackers(&self) -> Vec<TrackerKind> {
        self.supported.clone()
    }

    fn health_tracker(&self, kind: TrackerKind) -> Result<Arc<dyn HealthTracker>> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let tracker = lock(&self.trackers)
            .entry(kind)
            .or_insert_with(|| {
                debug!("Mock service creating {} tracker", kind);
                Arc::new(MockTracker::new(kind))
            })
            .clone();
        Ok(tracker)
    }
}

/// Builder for [`MockService`].
#[derive(Debug, Clone)]
pub struct MockServiceBuilder {
    outcome: ConnectionOutcome,
    supported: Vec<TrackerKind>,
    background: bool,
}

impl Default for MockServiceBuilder {
    fn default() -> Self {
        Self {
            outcome: ConnectionOutcome::Success,
            supported: TrackerKind::ALL.to_vec(),
            background: false,
        }
    }
}

impl MockServiceBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tracker kinds the device supports.
    #[must_use]
    pub fn supported(mut self, kinds: &[TrackerKind]) -> Self {
        self.supported = kinds.to_vec();
        self
    }

    /// Make the connection attempt fail.
    #[must_use]
    pub fn fail_with(mut self, code: i32, message: &str, has_resolution: bool) -> Self {
        self.outcome =
            ConnectionOutcome::Failed(ConnectionFailure::new(code, message, has_resolution));
        self
    }

    /// Make the service end the connection instead of connecting.
    #[must_use]
    pub fn end_immediately(mut self) -> Self {
        self.outcome = ConnectionOutcome::Ended;
        self
    }

    /// Deliver the connection result from a background thread.
    #[must_use]
    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// Build the mock service.
    #[must_use]
    pub fn build(self) -> MockService {
        MockService {
            outcome: self.outcome,
            supported: self.supported,
            background: self.background,
            connected: Arc::new(AtomicBool::new(false)),
            connect_calls: AtomicU32::new(0),
            disconnect_calls: AtomicU32::new(0),
            trackers: Mutex::new(HashMap::new()),
            listener: Mutex::new(None),
        }
    }
}
