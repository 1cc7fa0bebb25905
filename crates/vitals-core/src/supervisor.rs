//! Tracking service connection management.
//!
//! The [`ConnectionSupervisor`] owns the connection to the vendor tracking
//! service and the capability snapshot taken when it connects. Sessions
//! are created through it so they always wrap a handle obtained from a
//! live connection.
//!
//! Connection results arrive through [`ConnectionListener`] on whatever
//! thread the service uses. The supervisor never retries: a failed
//! connection is handed to the [`ConnectionObserver`] and resolving it is
//! up to the application.
//!
//! Capability gaps are not connection failures. For every tracker kind the
//! device does not support, an [`Alert::CapabilityMissing`] is published on
//! the bus and the connection stays usable.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use vitals_types::{Alert, TrackerKind};

use crate::bus::NotificationBus;
use crate::dispatch::DispatchContext;
use crate::error::{ConnectionFailure, Error, Result};
use crate::session::{SessionOptions, TrackerSession};
use crate::tracker::HealthTracker;

/// The vendor tracking service.
pub trait HealthTrackingService: Send + Sync {
    /// Start connecting. The result is reported to `listener` exactly once,
    /// possibly before this call returns.
    fn connect_service(&self, listener: Arc<dyn ConnectionListener>);

    /// Close the connection. Safe to call when not connected.
    fn disconnect_service(&self);

    /// Tracker kinds the connected device supports.
    fn supported_trackers(&self) -> Vec<TrackerKind>;

    /// Obtain a tracker handle from the connection.
    fn health_tracker(&self, kind: TrackerKind) -> Result<Arc<dyn HealthTracker>>;
}

/// Connection result callbacks from the vendor service.
pub trait ConnectionListener: Send + Sync {
    /// The service connected.
    fn on_connection_success(&self);

    /// The service ended the connection gracefully.
    fn on_connection_ended(&self);

    /// The connection attempt failed.
    fn on_connection_failed(&self, failure: ConnectionFailure);
}

/// Application side of the supervisor.
pub trait ConnectionObserver: Send + Sync {
    /// The connection is up.
    fn on_connected(&self, capabilities: &Capabilities);

    /// The connection attempt failed. Check
    /// [`ConnectionFailure::has_resolution`] to decide whether to offer the
    /// user a fix.
    fn on_connection_failed(&self, failure: &ConnectionFailure);

    /// The connection was closed by the service.
    fn on_disconnected(&self) {}
}

/// Tracker kinds a connected device supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    supported: Vec<TrackerKind>,
}

impl Capabilities {
    /// Create a capability set.
    pub fn new(supported: impl IntoIterator<Item = TrackerKind>) -> Self {
        let mut kinds: Vec<TrackerKind> = Vec::new();
        for kind in supported {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Self { supported: kinds }
    }

    /// Whether `kind` is supported.
    pub fn supports(&self, kind: TrackerKind) -> bool {
        self.supported.contains(&kind)
    }

    /// Supported kinds, in the order the service reported them.
    pub fn supported(&self) -> &[TrackerKind] {
        &self.supported
    }

    /// Known kinds the device does not support.
    pub fn missing(&self) -> Vec<TrackerKind> {
        TrackerKind::ALL
            .iter()
            .copied()
            .filter(|kind| !self.supports(*kind))
            .collect()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.supported.is_empty() {
            return write!(f, "none");
        }
        for (i, kind) in self.supported.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}

/// State of the service connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// `connect()` was called and no result has arrived yet.
    Connecting,
    /// Connected; sessions may be created.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Configuration for the connection supervisor.
#[derive(Debug, Clone, Default)]
pub struct SupervisorConfig {
    /// Options for sessions built by
    /// [`ConnectionSupervisor::create_session`]. Sessions built with
    /// `create_session_with` keep the settings of the supplied context.
    pub session_options: SessionOptions,
    /// Runtime that drives session dispatch workers. Falls back to the
    /// runtime of the calling thread.
    pub runtime: Option<Handle>,
}

impl SupervisorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.session_options.validate()
    }
}

struct State {
    connection: ConnectionState,
    /// Bumped by every connect and disconnect; results for older attempts
    /// are ignored.
    attempt: u64,
    capabilities: Option<Capabilities>,
    last_failure: Option<ConnectionFailure>,
}

struct Shared {
    service: Arc<dyn HealthTrackingService>,
    bus: Arc<NotificationBus>,
    config: SupervisorConfig,
    observer: Mutex<Option<Arc<dyn ConnectionObserver>>>,
    state: Mutex<State>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observer(&self) -> Option<Arc<dyn ConnectionObserver>> {
        self.observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a result for `attempt` should still be applied.
    fn is_current(state: &State, attempt: u64) -> bool {
        state.attempt == attempt && state.connection == ConnectionState::Connecting
    }
}

/// Listener handed to the service for one connection attempt.
struct SupervisorListener {
    supervisor: Weak<Shared>,
    attempt: u64,
}

impl ConnectionListener for SupervisorListener {
    fn on_connection_success(&self) {
        let Some(shared) = self.supervisor.upgrade() else {
            return;
        };
        if !Shared::is_current(&shared.state(), self.attempt) {
            debug!("Ignoring connection success for stale attempt {}", self.attempt);
            return;
        }

        // Query outside the state lock; the service is external code.
        let capabilities = Capabilities::new(shared.service.supported_trackers());
        {
            let mut state = shared.state();
            if !Shared::is_current(&state, self.attempt) {
                debug!(
                    "Connection attempt {} superseded while querying capabilities",
                    self.attempt
                );
                return;
            }
            state.connection = ConnectionState::Connected;
            state.capabilities = Some(capabilities.clone());
            state.last_failure = None;
        }
        info!("Connected to tracking service (supports: {})", capabilities);

        if let Some(observer) = shared.observer() {
            observer.on_connected(&capabilities);
        }
        for kind in capabilities.missing() {
            warn!("{} tracking is not supported on this device", kind);
            shared.bus.publish_error(Alert::CapabilityMissing(kind));
        }
    }

    fn on_connection_ended(&self) {
        let Some(shared) = self.supervisor.upgrade() else {
            return;
        };
        {
            let mut state = shared.state();
            if state.attempt != self.attempt || state.connection == ConnectionState::Disconnected {
                debug!("Ignoring connection end for stale attempt {}", self.attempt);
                return;
            }
            state.connection = ConnectionState::Disconnected;
            state.capabilities = None;
        }
        info!("Tracking service connection ended");
        if let Some(observer) = shared.observer() {
            observer.on_disconnected();
        }
    }

    fn on_connection_failed(&self, failure: ConnectionFailure) {
        let Some(shared) = self.supervisor.upgrade() else {
            return;
        };
        {
            let mut state = shared.state();
            if !Shared::is_current(&state, self.attempt) {
                debug!("Ignoring connection failure for stale attempt {}", self.attempt);
                return;
            }
            state.connection = ConnectionState::Disconnected;
            state.capabilities = None;
            state.last_failure = Some(failure.clone());
        }
        error!("Tracking service connection failed: {}", failure);
        if failure.is_platform_outdated() {
            warn!("Health platform must be installed or updated");
        }
        if let Some(observer) = shared.observer() {
            observer.on_connection_failed(&failure);
        }
    }
}

/// Owner of the tracking service connection.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vitals_core::{ConnectionSupervisor, ConnectionState, DispatchContext, NotificationBus};
/// use vitals_core::mock::MockService;
/// use vitals_types::TrackerKind;
///
/// let service = Arc::new(MockService::new());
/// let supervisor = ConnectionSupervisor::new(service, Arc::new(NotificationBus::new()));
///
/// supervisor.connect();
/// assert_eq!(supervisor.state(), ConnectionState::Connected);
///
/// let session = supervisor
///     .create_session_with(TrackerKind::HeartRate, DispatchContext::manual())
///     .unwrap();
/// session.start().unwrap();
/// session.stop();
/// supervisor.disconnect();
/// ```
#[derive(Clone)]
pub struct ConnectionSupervisor {
    shared: Arc<Shared>,
}

impl fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state();
        f.debug_struct("ConnectionSupervisor")
            .field("connection", &state.connection)
            .field("capabilities", &state.capabilities)
            .finish()
    }
}

impl ConnectionSupervisor {
    /// Create a supervisor with the default configuration.
    pub fn new(service: Arc<dyn HealthTrackingService>, bus: Arc<NotificationBus>) -> Self {
        Self::build(service, bus, SupervisorConfig::default())
    }

    /// Create a supervisor with a custom configuration.
    pub fn with_config(
        service: Arc<dyn HealthTrackingService>,
        bus: Arc<NotificationBus>,
        config: SupervisorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(service, bus, config))
    }

    fn build(
        service: Arc<dyn HealthTrackingService>,
        bus: Arc<NotificationBus>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                service,
                bus,
                config,
                observer: Mutex::new(None),
                state: Mutex::new(State {
                    connection: ConnectionState::Disconnected,
                    attempt: 0,
                    capabilities: None,
                    last_failure: None,
                }),
            }),
        }
    }

    /// Set the observer notified of connection results.
    pub fn set_observer(&self, observer: Option<Arc<dyn ConnectionObserver>>) {
        *self
            .shared
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = observer;
    }

    /// The bus capability gaps and session samples are published on.
    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.shared.bus
    }

    /// The supervisor configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.shared.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state().connection
    }

    /// Whether the service is connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Capabilities captured when the connection came up.
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.shared.state().capabilities.clone()
    }

    /// The failure of the most recent connection attempt, if it failed.
    pub fn last_failure(&self) -> Option<ConnectionFailure> {
        self.shared.state().last_failure.clone()
    }

    /// Start connecting to the tracking service.
    ///
    /// The result is delivered to the [`ConnectionObserver`]. A no-op while
    /// connecting or connected.
    pub fn connect(&self) {
        let attempt = {
            let mut state = self.shared.state();
            if state.connection != ConnectionState::Disconnected {
                debug!("connect() ignored while {}", state.connection);
                return;
            }
            state.attempt += 1;
            state.connection = ConnectionState::Connecting;
            state.last_failure = None;
            state.attempt
        };
        info!("Connecting to tracking service (attempt {})", attempt);

        let listener: Arc<dyn ConnectionListener> = Arc::new(SupervisorListener {
            supervisor: Arc::downgrade(&self.shared),
            attempt,
        });
        self.shared.service.connect_service(listener);
    }

    /// Close the connection.
    ///
    /// A no-op if never connected or already closed. Sessions created from
    /// the connection are not stopped; stop them first.
    pub fn disconnect(&self) {
        {
            let mut state = self.shared.state();
            if state.connection == ConnectionState::Disconnected {
                debug!("disconnect() ignored, not connected");
                return;
            }
            state.attempt += 1;
            state.connection = ConnectionState::Disconnected;
            state.capabilities = None;
        }
        self.shared.service.disconnect_service();
        info!("Disconnected from tracking service");
    }

    /// Create an idle session for `kind`.
    ///
    /// The session's dispatch worker runs on the configured runtime, or on
    /// the runtime of the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] while disconnected and
    /// [`Error::InvalidState`] when no tokio runtime is available.
    pub fn create_session(&self, kind: TrackerKind) -> Result<TrackerSession> {
        self.ensure_connected()?;
        let runtime = match &self.shared.config.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| {
                Error::invalid_state("no tokio runtime available for session dispatch")
            })?,
        };
        let options = &self.shared.config.session_options;
        let dispatch =
            DispatchContext::spawn(&runtime).backlog_warn_threshold(options.backlog_warn_threshold);
        self.create_session_with(kind, dispatch)
    }

    /// Create an idle session for `kind` that uses the given dispatch context.
    ///
    /// The context is used as supplied; the configured
    /// [`SessionOptions`] are not applied to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] while disconnected.
    pub fn create_session_with(
        &self,
        kind: TrackerKind,
        dispatch: DispatchContext,
    ) -> Result<TrackerSession> {
        self.ensure_connected()?;
        let tracker = self.shared.service.health_tracker(kind)?;
        if tracker.kind() != kind {
            return Err(Error::invalid_state(format!(
                "service returned a {} tracker for {}",
                tracker.kind(),
                kind
            )));
        }
        debug!("Created {} session", kind);
        Ok(TrackerSession::with_tracker(
            tracker,
            Arc::clone(&self.shared.bus),
            dispatch,
        ))
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::tests::Recorder;
    use crate::error::PACKAGE_NOT_INSTALLED;
    use crate::mock::{MockService, MockServiceBuilder};
    use crate::tracker::DataPoint;

    use vitals_types::Severity;

    #[derive(Default)]
    struct ObserverLog {
        connected: Mutex<Vec<Capabilities>>,
        failures: Mutex<Vec<ConnectionFailure>>,
        disconnects: Mutex<u32>,
    }

    impl ConnectionObserver for ObserverLog {
        fn on_connected(&self, capabilities: &Capabilities) {
            self.connected.lock().unwrap().push(capabilities.clone());
        }
        fn on_connection_failed(&self, failure: &ConnectionFailure) {
            self.failures.lock().unwrap().push(failure.clone());
        }
        fn on_disconnected(&self) {
            *self.disconnects.lock().unwrap() += 1;
        }
    }

    type Fixture = (
        ConnectionSupervisor,
        Arc<MockService>,
        Arc<Recorder>,
        Arc<ObserverLog>,
    );

    fn supervisor_for(service: MockService) -> Fixture {
        let service = Arc::new(service);
        let bus = Arc::new(NotificationBus::new());
        let recorder = Arc::new(Recorder::default());
        bus.add_observer(&recorder);
        let supervisor = ConnectionSupervisor::new(
            Arc::clone(&service) as Arc<dyn HealthTrackingService>,
            bus,
        );
        let log = Arc::new(ObserverLog::default());
        supervisor.set_observer(Some(Arc::clone(&log) as Arc<dyn ConnectionObserver>));
        (supervisor, service, recorder, log)
    }

    #[test]
    fn test_connect_success_with_full_support() {
        let (supervisor, service, recorder, log) = supervisor_for(MockService::new());

        supervisor.connect();

        assert_eq!(supervisor.state(), ConnectionState::Connected);
        assert_eq!(service.connect_calls(), 1);
        assert!(recorder.alerts.lock().unwrap().is_empty());
        let connected = log.connected.lock().unwrap();
        assert_eq!(connected.len(), 1);
        assert!(connected[0].missing().is_empty());
    }

    #[test]
    fn test_capability_gap_is_a_warning_on_the_bus() {
        let (supervisor, _service, recorder, log) = supervisor_for(
            MockServiceBuilder::new()
                .supported(&[TrackerKind::HeartRate])
                .build(),
        );

        supervisor.connect();

        assert!(supervisor.is_connected());
        let alerts = recorder.alerts.lock().unwrap();
        assert_eq!(*alerts, vec![Alert::CapabilityMissing(TrackerKind::SpO2)]);
        assert_eq!(alerts[0].severity(), Severity::Warning);
        assert!(log.failures.lock().unwrap().is_empty());

        // The connection stays usable for the supported kind.
        let session = supervisor
            .create_session_with(TrackerKind::HeartRate, DispatchContext::manual())
            .unwrap();
        session.start().unwrap();
        session.stop();
    }

    #[test]
    fn test_no_capabilities_reports_every_kind() {
        let (supervisor, _service, recorder, _log) =
            supervisor_for(MockServiceBuilder::new().supported(&[]).build());
        supervisor.connect();
        assert_eq!(
            *recorder.alerts.lock().unwrap(),
            vec![
                Alert::CapabilityMissing(TrackerKind::HeartRate),
                Alert::CapabilityMissing(TrackerKind::SpO2),
            ]
        );
    }

    #[test]
    fn test_connection_failure_is_surfaced_not_retried() {
        let (supervisor, service, recorder, log) = supervisor_for(
            MockServiceBuilder::new()
                .fail_with(PACKAGE_NOT_INSTALLED, "Health platform not installed", true)
                .build(),
        );

        supervisor.connect();

        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
        assert_eq!(service.connect_calls(), 1);
        let failures = log.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].has_resolution);
        assert!(failures[0].is_platform_outdated());
        assert_eq!(supervisor.last_failure(), Some(failures[0].clone()));
        // Connection failures go to the observer, not the bus.
        assert!(recorder.alerts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_connection_ended() {
        let (supervisor, service, _recorder, log) = supervisor_for(MockService::new());
        supervisor.connect();
        service.end_connection();

        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
        assert_eq!(*log.disconnects.lock().unwrap(), 1);
        assert!(supervisor.capabilities().is_none());
    }

    #[test]
    fn test_ended_instead_of_connecting() {
        let (supervisor, _service, _recorder, log) =
            supervisor_for(MockServiceBuilder::new().end_immediately().build());
        supervisor.connect();
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
        assert!(log.connected.lock().unwrap().is_empty());
        assert_eq!(*log.disconnects.lock().unwrap(), 1);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (supervisor, service, _recorder, _log) = supervisor_for(MockService::new());

        supervisor.disconnect();
        assert_eq!(service.disconnect_calls(), 0);

        supervisor.connect();
        supervisor.disconnect();
        supervisor.disconnect();
        assert_eq!(service.disconnect_calls(), 1);
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_twice_connects_once() {
        let (supervisor, service, _recorder, _log) = supervisor_for(MockService::new());
        supervisor.connect();
        supervisor.connect();
        assert_eq!(service.connect_calls(), 1);
    }

    #[test]
    fn test_create_session_requires_connection() {
        let (supervisor, _service, _recorder, _log) = supervisor_for(MockService::new());
        assert!(matches!(
            supervisor.create_session_with(TrackerKind::HeartRate, DispatchContext::manual()),
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            supervisor.create_session(TrackerKind::HeartRate),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_create_session_without_runtime_is_invalid_state() {
        let (supervisor, _service, _recorder, _log) = supervisor_for(MockService::new());
        supervisor.connect();
        assert!(matches!(
            supervisor.create_session(TrackerKind::SpO2),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_session_samples_reach_the_bus() {
        let (supervisor, service, recorder, _log) = supervisor_for(MockService::new());
        supervisor.connect();

        let session = supervisor
            .create_session_with(TrackerKind::SpO2, DispatchContext::manual())
            .unwrap();
        session.start().unwrap();

        let tracker = service.tracker(TrackerKind::SpO2).unwrap();
        tracker.emit(&[DataPoint::spo2(2, 96)]);
        session.dispatch().run_pending();

        assert_eq!(
            *recorder.spo2.lock().unwrap(),
            vec![(vitals_types::SpO2Status::Completed, 96)]
        );
    }

    #[tokio::test]
    async fn test_create_session_on_current_runtime() {
        let (supervisor, _service, _recorder, _log) = supervisor_for(MockService::new());
        supervisor.connect();
        let session = supervisor.create_session(TrackerKind::HeartRate).unwrap();
        assert_eq!(session.kind(), TrackerKind::HeartRate);
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_backlog_threshold_per_construction_path() {
        let config = SupervisorConfig {
            session_options: SessionOptions {
                backlog_warn_threshold: 7,
            },
            runtime: None,
        };
        let supervisor = ConnectionSupervisor::with_config(
            Arc::new(MockService::new()),
            Arc::new(NotificationBus::new()),
            config,
        )
        .unwrap();
        supervisor.connect();

        let spawned = supervisor.create_session(TrackerKind::HeartRate).unwrap();
        assert_eq!(spawned.dispatch().backlog_threshold(), 7);

        let supplied = supervisor
            .create_session_with(
                TrackerKind::SpO2,
                DispatchContext::manual().backlog_warn_threshold(3),
            )
            .unwrap();
        assert_eq!(supplied.dispatch().backlog_threshold(), 3);
    }

    #[test]
    fn test_background_delivery() {
        let (supervisor, _service, _recorder, log) =
            supervisor_for(MockServiceBuilder::new().background(true).build());
        supervisor.connect();

        for _ in 0..200 {
            if supervisor.is_connected() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(supervisor.is_connected());
        assert_eq!(log.connected.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_result_after_disconnect_is_ignored() {
        let service = Arc::new(MockService::new());
        let supervisor = ConnectionSupervisor::new(
            Arc::clone(&service) as Arc<dyn HealthTrackingService>,
            Arc::new(NotificationBus::new()),
        );
        supervisor.connect();
        supervisor.disconnect();

        // A late result for the superseded attempt.
        let listener = SupervisorListener {
            supervisor: Arc::downgrade(&supervisor.shared),
            attempt: 1,
        };
        listener.on_connection_success();
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_capabilities_helpers() {
        let caps = Capabilities::new([TrackerKind::SpO2, TrackerKind::SpO2]);
        assert_eq!(caps.supported(), &[TrackerKind::SpO2]);
        assert!(caps.supports(TrackerKind::SpO2));
        assert_eq!(caps.missing(), vec![TrackerKind::HeartRate]);
        assert_eq!(caps.to_string(), "SpO2");
        assert_eq!(Capabilities::new([]).to_string(), "none");
    }

    #[test]
    fn test_with_config_validates() {
        let config = SupervisorConfig {
            session_options: SessionOptions {
                backlog_warn_threshold: 0,
            },
            runtime: None,
        };
        let result = ConnectionSupervisor::with_config(
            Arc::new(MockService::new()),
            Arc::new(NotificationBus::new()),
            config,
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
