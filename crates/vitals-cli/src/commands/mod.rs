//! Command implementations for the CLI.

mod capabilities;
mod config;
mod decode;
mod measure;
mod monitor;

pub use capabilities::cmd_capabilities;
pub use config::cmd_config;
pub use decode::cmd_decode;
pub use measure::cmd_measure;
pub use monitor::cmd_monitor;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use vitals_core::events::DEFAULT_EVENT_CAPACITY;
use vitals_core::{
    Capabilities, ConnectionFailure, ConnectionObserver, ConnectionSupervisor, Error,
    EventForwarder, EventReceiver, HealthTrackingService, NotificationBus, SupervisorConfig,
    TrackerSession,
};
use vitals_types::TrackerKind;

use crate::config::Config;
use crate::simulator::{Simulator, build_service};

/// How long to wait for the tracking service to answer.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

enum ConnectionEvent {
    Connected(Capabilities),
    Failed(ConnectionFailure),
    Ended,
}

/// Relays supervisor callbacks to the waiting command.
struct ConnectionWaiter {
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ConnectionObserver for ConnectionWaiter {
    fn on_connected(&self, capabilities: &Capabilities) {
        let _ = self.tx.send(ConnectionEvent::Connected(capabilities.clone()));
    }

    fn on_connection_failed(&self, failure: &ConnectionFailure) {
        let _ = self.tx.send(ConnectionEvent::Failed(failure.clone()));
    }

    fn on_disconnected(&self) {
        let _ = self.tx.send(ConnectionEvent::Ended);
    }
}

/// A live connection to the (simulated) tracking service.
///
/// Dropping it stops the simulator and disconnects.
pub struct Connection {
    pub supervisor: ConnectionSupervisor,
    pub capabilities: Capabilities,
    /// Receives every bus notification published after connecting started,
    /// including capability warnings.
    pub events: EventReceiver,
    _forwarder: Arc<EventForwarder>,
    _simulator: Simulator,
}

impl Connection {
    /// Create an idle session for a tracker the device supports.
    pub fn open_session(&self, kind: TrackerKind) -> Result<TrackerSession> {
        if !self.capabilities.supports(kind) {
            return Err(Error::CapabilityMissing(kind).into());
        }
        self.supervisor
            .create_session(kind)
            .with_context(|| format!("Failed to create {} session", kind))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.supervisor.disconnect();
    }
}

/// Connect to the tracking service described by `config`.
pub async fn connect(config: &Config) -> Result<Connection> {
    let service = Arc::new(build_service(&config.simulation)?);
    let bus = Arc::new(NotificationBus::new());
    let forwarder = EventForwarder::attach(&bus, DEFAULT_EVENT_CAPACITY);
    let events = forwarder.subscribe();

    let supervisor = ConnectionSupervisor::with_config(
        Arc::clone(&service) as Arc<dyn HealthTrackingService>,
        bus,
        SupervisorConfig {
            session_options: config.session_options(),
            runtime: None,
        },
    )?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    supervisor.set_observer(Some(Arc::new(ConnectionWaiter { tx })));
    supervisor.connect();

    let event = tokio::time::timeout(CONNECT_TIMEOUT, rx.recv())
        .await
        .context("Timed out waiting for the tracking service")?;
    supervisor.set_observer(None);

    let capabilities = match event {
        Some(ConnectionEvent::Connected(capabilities)) => capabilities,
        Some(ConnectionEvent::Failed(failure)) => {
            let hint = if failure.is_platform_outdated() {
                "\n\nInstall or update the health platform on the device, then try again."
            } else {
                ""
            };
            bail!("{}{}", Error::ConnectionFailed(failure), hint);
        }
        Some(ConnectionEvent::Ended) | None => {
            bail!("The tracking service closed the connection")
        }
    };
    debug!("Connected; device supports {}", capabilities);

    for kind in config.tracker_kinds()? {
        if !capabilities.supports(kind) {
            warn!("Configured tracker {} is not supported by this device", kind);
        }
    }

    let simulator = Simulator::spawn(Arc::clone(&service), &config.simulation);
    Ok(Connection {
        supervisor,
        capabilities,
        events,
        _forwarder: forwarder,
        _simulator: simulator,
    })
}
