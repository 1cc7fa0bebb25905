//! Concurrency core for wearable health trackers.
//!
//! This crate sits between a vendor sensor-tracking service and the
//! application. It turns raw tracker callbacks, which arrive on threads the
//! application does not control, into decoded samples delivered to any
//! number of observers.
//!
//! # Components
//!
//! - **[`NotificationBus`]**: fan-out of samples and alerts to registered
//!   [`TrackerDataObserver`]s, with snapshot delivery
//! - **[`TrackerSession`]**: idle/running lifecycle around one tracker
//!   handle; safe to start and stop from any thread
//! - **[`DispatchContext`]**: the ordered, cancellable queue a session
//!   publishes through
//! - **[`ConnectionSupervisor`]**: the service connection, capability
//!   snapshot and session creation
//! - **[`EventForwarder`]**: bridge from the bus to a tokio broadcast channel
//! - **[`mock`]**: scripted tracker and service for tests and simulation
//!
//! # Errors
//!
//! Tracker errors and capability gaps share one channel,
//! [`TrackerDataObserver::on_error`]. Use [`Alert::severity`] to tell a
//! capability warning from a tracker failure. Connection failures go to the
//! [`ConnectionObserver`] instead.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use vitals_core::{ConnectionSupervisor, DispatchContext, NotificationBus, TrackerDataObserver};
//! use vitals_core::mock::MockService;
//! use vitals_core::tracker::DataPoint;
//! use vitals_types::{Alert, HeartRateSample, SpO2Status, TrackerKind};
//!
//! struct Print;
//!
//! impl TrackerDataObserver for Print {
//!     fn on_heart_rate_changed(&self, sample: HeartRateSample) {
//!         println!("{}", sample);
//!     }
//!     fn on_spo2_changed(&self, _status: SpO2Status, _value: i32) {}
//!     fn on_error(&self, alert: Alert) {
//!         eprintln!("{}", alert);
//!     }
//! }
//!
//! let bus = Arc::new(NotificationBus::new());
//! let observer = Arc::new(Print);
//! bus.add_observer(&observer);
//!
//! let service = Arc::new(MockService::new());
//! let supervisor = ConnectionSupervisor::new(service.clone(), bus);
//! supervisor.connect();
//!
//! let session = supervisor
//!     .create_session_with(TrackerKind::HeartRate, DispatchContext::manual())
//!     .unwrap();
//! session.start().unwrap();
//!
//! let tracker = service.tracker(TrackerKind::HeartRate).unwrap();
//! tracker.emit(&[DataPoint::heart_rate(1, 68, 880)]);
//! session.dispatch().run_pending();
//!
//! session.stop();
//! supervisor.disconnect();
//! ```

pub mod bus;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod mock;
pub mod session;
pub mod supervisor;
pub mod tracker;

// Core exports
pub use bus::{NotificationBus, TrackerDataObserver};
pub use dispatch::{DEFAULT_BACKLOG_WARN_THRESHOLD, DispatchContext};
pub use error::{ConnectionFailure, Error, Result};
pub use session::{SessionOptions, SessionState, TrackerSession};
pub use supervisor::{
    Capabilities, ConnectionListener, ConnectionObserver, ConnectionState, ConnectionSupervisor,
    HealthTrackingService, SupervisorConfig,
};
pub use tracker::{DataPoint, HealthTracker, TrackerError, TrackerEventListener, ValueKey};

pub use events::{EventForwarder, EventPayload, EventReceiver, EventSender, TrackerEvent};
pub use mock::{MockService, MockServiceBuilder, MockTracker};

// Re-export from vitals-types
pub use vitals_types::{
    Alert, HeartRateSample, HeartRateStatus, Severity, SpO2Sample, SpO2Status, TrackerKind,
};
