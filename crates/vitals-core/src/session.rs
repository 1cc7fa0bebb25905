//! Tracker session lifecycle.
//!
//! A [`TrackerSession`] owns one vendor tracker handle and one
//! [`DispatchContext`]. It is either idle or running, and that single state
//! decides both whether the handle may be touched and whether raw events
//! are accepted:
//!
//! ```text
//!            start()                  stop() / tracker error
//!   Idle ─────────────▶ Running ──────────────────────────────▶ Idle
//!    ▲  start() on Running: no-op     stop() on Idle: no-op
//! ```
//!
//! Every transition happens inside one per-session lock together with the
//! attach or detach call, so two threads can never both attach, and a
//! `stop()` racing a tracker error detaches exactly once.
//!
//! Each attach gets a fresh epoch. Callbacks from a listener of an earlier
//! attachment are ignored even if the session has been restarted since.
//!
//! Trackers must not invoke the listener synchronously from inside
//! `set_event_listener` or `unset_event_listener`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, warn};

use vitals_types::TrackerKind;
use vitals_types::decode::{decode_heart_rate, decode_spo2};

use crate::bus::NotificationBus;
use crate::dispatch::{DEFAULT_BACKLOG_WARN_THRESHOLD, DispatchContext};
use crate::error::{Error, Result};
use crate::tracker::{DataPoint, HealthTracker, TrackerError, TrackerEventListener, ValueKey};

/// Per-session tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Dispatch backlog above which a warning is logged.
    pub backlog_warn_threshold: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            backlog_warn_threshold: DEFAULT_BACKLOG_WARN_THRESHOLD,
        }
    }
}

impl SessionOptions {
    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.backlog_warn_threshold == 0 {
            return Err(Error::invalid_config("backlog_warn_threshold must be > 0"));
        }
        Ok(())
    }
}

/// Observable lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No listener attached; raw events are dropped.
    Idle,
    /// Listener attached; raw events are decoded and published.
    Running,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running { epoch: u64 },
}

struct Inner {
    lifecycle: Lifecycle,
    /// Epoch handed to the most recent attachment.
    last_epoch: u64,
    tracker: Option<Arc<dyn HealthTracker>>,
}

impl Inner {
    fn accepts(&self, epoch: u64) -> bool {
        self.lifecycle == Lifecycle::Running { epoch }
    }
}

struct Shared {
    kind: TrackerKind,
    inner: Mutex<Inner>,
    dispatch: DispatchContext,
    bus: Arc<NotificationBus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Detach and go idle. Caller holds the lock and has checked `Running`.
    fn detach(&self, inner: &mut Inner) -> usize {
        if let Some(tracker) = &inner.tracker {
            tracker.unset_event_listener();
        }
        inner.lifecycle = Lifecycle::Idle;
        self.dispatch.cancel_pending()
    }

    fn post_point(&self, point: &DataPoint) {
        let bus = Arc::clone(&self.bus);
        match self.kind {
            TrackerKind::HeartRate => {
                let sample = decode_heart_rate(
                    point.value(ValueKey::HeartRateStatus),
                    point.value(ValueKey::HeartRate),
                    point.packed_ibi(),
                );
                self.dispatch.post(move || bus.publish_heart_rate(sample));
            }
            TrackerKind::SpO2 => {
                let sample = decode_spo2(
                    point.value(ValueKey::SpO2Status),
                    point.value(ValueKey::SpO2),
                );
                self.dispatch.post(move || bus.publish_spo2_sample(sample));
            }
        }
    }
}

/// Listener attached to the tracker for one attachment epoch.
struct SessionListener {
    session: Weak<Shared>,
    epoch: u64,
}

impl TrackerEventListener for SessionListener {
    fn on_data_received(&self, points: &[DataPoint]) {
        let Some(shared) = self.session.upgrade() else {
            return;
        };
        let inner = shared.lock();
        if !inner.accepts(self.epoch) {
            debug!(
                "{} session not accepting events (epoch {}), dropping {} points",
                shared.kind,
                self.epoch,
                points.len()
            );
            return;
        }
        // Posting under the lock ties each job to the generation that a
        // later stop() will cancel.
        for point in points {
            shared.post_point(point);
        }
    }

    fn on_flush_completed(&self) {
        if let Some(shared) = self.session.upgrade() {
            info!("{} tracker flush completed", shared.kind);
        }
    }

    fn on_error(&self, error: TrackerError) {
        let Some(shared) = self.session.upgrade() else {
            return;
        };
        warn!("{} tracker error: {}", shared.kind, error);

        // Only the error that forces the transition is reported.
        let forced = {
            let mut inner = shared.lock();
            if inner.accepts(self.epoch) {
                let dropped = shared.detach(&mut inner);
                info!(
                    "{} session forced idle by tracker error ({} pending jobs dropped)",
                    shared.kind, dropped
                );
                true
            } else {
                false
            }
        };

        if !forced {
            debug!(
                "Ignoring error for {} session that is not running (epoch {})",
                shared.kind, self.epoch
            );
            return;
        }
        shared.bus.publish_error(error.alert());
    }
}

/// Lifecycle owner for one vendor tracker.
///
/// Cloning a session yields another handle to the same session.
#[derive(Clone)]
pub struct TrackerSession {
    shared: Arc<Shared>,
}

impl fmt::Debug for TrackerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("TrackerSession")
            .field("kind", &self.shared.kind)
            .field("lifecycle", &inner.lifecycle)
            .field("has_tracker", &inner.tracker.is_some())
            .finish()
    }
}

impl TrackerSession {
    /// Create an idle session without a tracker handle.
    ///
    /// [`start`](Self::start) fails until [`set_tracker`](Self::set_tracker) is called.
    pub fn new(kind: TrackerKind, bus: Arc<NotificationBus>, dispatch: DispatchContext) -> Self {
        Self {
            shared: Arc::new(Shared {
                kind,
                inner: Mutex::new(Inner {
                    lifecycle: Lifecycle::Idle,
                    last_epoch: 0,
                    tracker: None,
                }),
                dispatch,
                bus,
            }),
        }
    }

    /// Create an idle session around a tracker handle.
    pub fn with_tracker(
        tracker: Arc<dyn HealthTracker>,
        bus: Arc<NotificationBus>,
        dispatch: DispatchContext,
    ) -> Self {
        let session = Self::new(tracker.kind(), bus, dispatch);
        session.shared.lock().tracker = Some(tracker);
        session
    }

    /// Replace the tracker handle. Only allowed while idle.
    pub fn set_tracker(&self, tracker: Option<Arc<dyn HealthTracker>>) -> Result<()> {
        let mut inner = self.shared.lock();
        if inner.lifecycle != Lifecycle::Idle {
            return Err(Error::invalid_state(format!(
                "cannot replace the tracker of a running {} session",
                self.shared.kind
            )));
        }
        if let Some(tracker) = &tracker
            && tracker.kind() != self.shared.kind
        {
            return Err(Error::invalid_state(format!(
                "{} tracker given to a {} session",
                tracker.kind(),
                self.shared.kind
            )));
        }
        inner.tracker = tracker;
        Ok(())
    }

    /// Which signal this session decodes.
    pub fn kind(&self) -> TrackerKind {
        self.shared.kind
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.shared.lock().lifecycle {
            Lifecycle::Idle => SessionState::Idle,
            Lifecycle::Running { .. } => SessionState::Running,
        }
    }

    /// Whether the session is running.
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Attach to the tracker and start publishing samples.
    ///
    /// A no-op if already running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if no tracker handle is set; the
    /// session stays idle.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.shared.lock();
        if let Lifecycle::Running { epoch } = inner.lifecycle {
            debug!("{} session already running (epoch {})", self.shared.kind, epoch);
            return Ok(());
        }
        let Some(tracker) = inner.tracker.clone() else {
            return Err(Error::invalid_state(format!(
                "{} session has no tracker handle",
                self.shared.kind
            )));
        };

        let epoch = inner.last_epoch + 1;
        let listener: Arc<dyn TrackerEventListener> = Arc::new(SessionListener {
            session: Arc::downgrade(&self.shared),
            epoch,
        });
        tracker.set_event_listener(listener);
        inner.last_epoch = epoch;
        inner.lifecycle = Lifecycle::Running { epoch };
        info!("{} session started (epoch {})", self.shared.kind, epoch);
        Ok(())
    }

    /// Detach from the tracker and drop undelivered samples.
    ///
    /// A no-op if already idle.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        if inner.lifecycle == Lifecycle::Idle {
            debug!("{} session already idle", self.shared.kind);
            return;
        }
        let dropped = self.shared.detach(&mut inner);
        info!(
            "{} session stopped ({} pending jobs dropped)",
            self.shared.kind, dropped
        );
    }

    /// Ask a running tracker to deliver buffered records now.
    pub fn flush(&self) {
        let tracker = {
            let inner = self.shared.lock();
            match inner.lifecycle {
                Lifecycle::Running { .. } => inner.tracker.clone(),
                Lifecycle::Idle => None,
            }
        };
        if let Some(tracker) = tracker {
            tracker.flush();
        }
    }

    /// The session's dispatch context.
    ///
    /// With [`DispatchContext::manual`] the owner calls
    /// [`DispatchContext::run_pending`] to deliver samples.
    pub fn dispatch(&self) -> &DispatchContext {
        &self.shared.dispatch
    }

    /// The bus samples are published on.
    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.shared.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::tests::Recorder;
    use crate::mock::MockTracker;

    use vitals_types::{Alert, HeartRateStatus, SpO2Status};

    fn session_with(tracker: &Arc<MockTracker>) -> (TrackerSession, Arc<Recorder>) {
        let bus = Arc::new(NotificationBus::new());
        let recorder = Arc::new(Recorder::default());
        bus.add_observer(&recorder);
        let session = TrackerSession::with_tracker(
            Arc::clone(tracker) as Arc<dyn HealthTracker>,
            bus,
            DispatchContext::manual(),
        );
        (session, recorder)
    }

    #[test]
    fn test_start_twice_attaches_once() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, _) = session_with(&tracker);

        session.start().unwrap();
        session.start().unwrap();

        assert_eq!(tracker.attach_count(), 1);
        assert!(session.is_running());
    }

    #[test]
    fn test_stop_without_start_detaches_nothing() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, _) = session_with(&tracker);

        session.stop();
        session.stop();

        assert_eq!(tracker.detach_count(), 0);
        assert_eq!(session.dispatch().generation(), 0);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_stop_detaches_once_and_drops_pending_work() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, recorder) = session_with(&tracker);

        session.start().unwrap();
        assert!(tracker.emit(&[DataPoint::heart_rate(1, 70, 800), DataPoint::heart_rate(1, 71, 790)]));
        assert_eq!(session.dispatch().pending(), 2);

        session.stop();
        session.stop();

        assert_eq!(tracker.detach_count(), 1);
        assert_eq!(session.dispatch().pending(), 0);
        assert_eq!(session.dispatch().run_pending(), 0);
        assert!(recorder.heart_rates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_start_without_handle_is_invalid_state() {
        let bus = Arc::new(NotificationBus::new());
        let session = TrackerSession::new(TrackerKind::SpO2, bus, DispatchContext::manual());

        let err = session.start().unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_heart_rate_points_are_decoded_and_published() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, recorder) = session_with(&tracker);
        session.start().unwrap();

        tracker.emit(&[DataPoint::heart_rate(1, 100, 0x8000 | 189)]);
        assert_eq!(session.dispatch().run_pending(), 1);

        let samples = recorder.heart_rates.lock().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].status, HeartRateStatus::FindingHr);
        assert_eq!(samples[0].heart_rate, 100);
        assert_eq!(samples[0].ibi_ms(), 189);
        assert!(samples[0].ibi_quality_bad());
    }

    #[test]
    fn test_spo2_points_are_decoded_and_published() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::SpO2));
        let (session, recorder) = session_with(&tracker);
        session.start().unwrap();

        tracker.emit(&[DataPoint::spo2(-4, 97), DataPoint::spo2(2, 97)]);
        session.dispatch().run_pending();

        assert_eq!(
            *recorder.spo2.lock().unwrap(),
            vec![(SpO2Status::DeviceMoving, 97), (SpO2Status::Completed, 97)]
        );
    }

    #[test]
    fn test_flush_completed_publishes_nothing() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, recorder) = session_with(&tracker);
        session.start().unwrap();

        session.flush();
        assert_eq!(tracker.flush_count(), 1);
        assert_eq!(session.dispatch().pending(), 0);
        assert!(recorder.heart_rates.lock().unwrap().is_empty());
        assert!(recorder.alerts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_flush_while_idle_is_noop() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, _) = session_with(&tracker);
        session.flush();
        assert_eq!(tracker.flush_count(), 0);
    }

    #[test]
    fn test_tracker_error_forces_idle_and_publishes() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::SpO2));
        let (session, recorder) = session_with(&tracker);
        session.start().unwrap();
        tracker.emit(&[DataPoint::spo2(0, 0)]);

        assert!(tracker.fail(TrackerError::PermissionError));

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(tracker.detach_count(), 1);
        assert_eq!(session.dispatch().pending(), 0);
        assert_eq!(*recorder.alerts.lock().unwrap(), vec![Alert::PermissionDenied]);

        // stop() after the forced transition does not detach again.
        session.stop();
        assert_eq!(tracker.detach_count(), 1);

        // A fresh start is allowed.
        session.start().unwrap();
        assert_eq!(tracker.attach_count(), 2);
    }

    #[test]
    fn test_error_kinds_are_distinguished() {
        for (error, alert) in [
            (TrackerError::PermissionError, Alert::PermissionDenied),
            (TrackerError::SdkPolicyError, Alert::PolicyRestricted),
            (TrackerError::Other("sensor busy".into()), Alert::Other),
        ] {
            let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
            let (session, recorder) = session_with(&tracker);
            session.start().unwrap();
            tracker.fail(error);
            assert_eq!(*recorder.alerts.lock().unwrap(), vec![alert]);
        }
    }

    #[test]
    fn test_stale_listener_is_ignored_after_restart() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, recorder) = session_with(&tracker);

        session.start().unwrap();
        let old_listener = tracker.listener().unwrap();
        session.stop();
        session.start().unwrap();

        old_listener.on_data_received(&[DataPoint::heart_rate(1, 60, 0)]);
        old_listener.on_error(TrackerError::SdkPolicyError);

        assert!(session.is_running());
        assert_eq!(session.dispatch().pending(), 0);
        assert!(recorder.alerts.lock().unwrap().is_empty());
        assert_eq!(tracker.detach_count(), 1);
    }

    #[test]
    fn test_events_after_stop_are_dropped() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, _) = session_with(&tracker);

        session.start().unwrap();
        let listener = tracker.listener().unwrap();
        session.stop();

        listener.on_data_received(&[DataPoint::heart_rate(1, 60, 0)]);
        assert_eq!(session.dispatch().pending(), 0);
    }

    #[test]
    fn test_errors_after_stop_are_not_published() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        let (session, recorder) = session_with(&tracker);

        session.start().unwrap();
        let listener = tracker.listener().unwrap();
        session.stop();

        listener.on_error(TrackerError::PermissionError);
        listener.on_error(TrackerError::PermissionError);

        assert!(recorder.alerts.lock().unwrap().is_empty());
        assert_eq!(tracker.detach_count(), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_repeated_errors_are_reported_once() {
        let tracker = Arc::new(MockTracker::new(TrackerKind::SpO2));
        let (session, recorder) = session_with(&tracker);

        session.start().unwrap();
        let listener = tracker.listener().unwrap();
        listener.on_error(TrackerError::SdkPolicyError);
        listener.on_error(TrackerError::SdkPolicyError);
        listener.on_error(TrackerError::Other("still broken".into()));

        assert_eq!(*recorder.alerts.lock().unwrap(), vec![Alert::PolicyRestricted]);
        assert_eq!(tracker.detach_count(), 1);
    }

    #[test]
    fn test_set_tracker_rules() {
        let bus = Arc::new(NotificationBus::new());
        let session = TrackerSession::new(TrackerKind::HeartRate, bus, DispatchContext::manual());

        let wrong_kind: Arc<dyn HealthTracker> = Arc::new(MockTracker::new(TrackerKind::SpO2));
        assert!(matches!(
            session.set_tracker(Some(wrong_kind)),
            Err(Error::InvalidState(_))
        ));

        let tracker: Arc<dyn HealthTracker> = Arc::new(MockTracker::new(TrackerKind::HeartRate));
        session.set_tracker(Some(Arc::clone(&tracker))).unwrap();
        session.start().unwrap();
        assert!(matches!(session.set_tracker(None), Err(Error::InvalidState(_))));

        session.stop();
        session.set_tracker(None).unwrap();
        assert!(session.start().is_err());
    }

    #[test]
    fn test_observer_may_stop_session_from_callback() {
        struct StopOnComplete {
            session: Mutex<Option<TrackerSession>>,
        }

        impl crate::bus::TrackerDataObserver for StopOnComplete {
            fn on_heart_rate_changed(&self, _sample: vitals_types::HeartRateSample) {}
            fn on_spo2_changed(&self, status: SpO2Status, _value: i32) {
                if status == SpO2Status::Completed
                    && let Some(session) = self.session.lock().unwrap().as_ref()
                {
                    session.stop();
                }
            }
            fn on_error(&self, _alert: Alert) {}
        }

        let tracker = Arc::new(MockTracker::new(TrackerKind::SpO2));
        let (session, recorder) = session_with(&tracker);
        let stopper = Arc::new(StopOnComplete {
            session: Mutex::new(Some(session.clone())),
        });
        session.bus().add_observer(&stopper);

        session.start().unwrap();
        tracker.emit(&[DataPoint::spo2(2, 98), DataPoint::spo2(0, 0)]);
        session.dispatch().run_pending();

        assert!(!session.is_running());
        assert_eq!(tracker.detach_count(), 1);
        // The job queued behind the completion was cancelled by stop().
        assert_eq!(*recorder.spo2.lock().unwrap(), vec![(SpO2Status::Completed, 98)]);

        // Break the session <-> observer cycle.
        stopper.session.lock().unwrap().take();
    }

    #[test]
    fn test_options_validate() {
        assert!(SessionOptions::default().validate().is_ok());
        let options = SessionOptions {
            backlog_warn_threshold: 0,
        };
        assert!(matches!(options.validate(), Err(Error::InvalidConfig(_))));
    }
}
