//! Serializable event stream for async consumers.
//!
//! [`EventForwarder`] is a [`TrackerDataObserver`] that turns every bus
//! notification into a [`TrackerEvent`] and sends it on a
//! [`tokio::sync::broadcast`] channel. Consumers that live in async code
//! can `subscribe()` instead of implementing the observer trait.
//!
//! The channel is bounded. A receiver that falls behind loses the oldest
//! events (`RecvError::Lagged`); the bus and the other observers are not
//! affected.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;

use vitals_types::{Alert, HeartRateSample, SpO2Sample, SpO2Status};

use crate::bus::{NotificationBus, TrackerDataObserver};

/// Default broadcast channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// One notification from the bus, stamped with the time it was forwarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerEvent {
    /// When the forwarder received the notification.
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    /// What was published.
    pub payload: EventPayload,
}

/// Payload of a [`TrackerEvent`].
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventPayload {
    /// A heart rate sample.
    HeartRate { sample: HeartRateSample },
    /// A blood oxygen sample.
    #[serde(rename = "spo2")]
    SpO2 { sample: SpO2Sample },
    /// A tracker error or capability gap.
    Alert { alert: Alert },
}

impl TrackerEvent {
    /// Stamp a payload with the current time.
    pub fn now(payload: EventPayload) -> Self {
        Self {
            received_at: OffsetDateTime::now_utc(),
            payload,
        }
    }
}

/// Sender for tracker events.
pub type EventSender = broadcast::Sender<TrackerEvent>;

/// Receiver for tracker events.
pub type EventReceiver = broadcast::Receiver<TrackerEvent>;

/// Observer that forwards bus notifications to a broadcast channel.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    sender: EventSender,
}

impl EventForwarder {
    /// Create a forwarder with the given channel capacity.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a forwarder and register it on `bus`.
    ///
    /// The bus holds the forwarder weakly; keep the returned `Arc` alive for
    /// as long as events should flow.
    pub fn attach(bus: &NotificationBus, capacity: usize) -> Arc<Self> {
        let forwarder = Arc::new(Self::new(capacity));
        bus.add_observer(&forwarder);
        forwarder
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn send(&self, payload: EventPayload) {
        // No receivers is not an error.
        let _ = self.sender.send(TrackerEvent::now(payload));
    }
}

impl Default for EventForwarder {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl TrackerDataObserver for EventForwarder {
    fn on_heart_rate_changed(&self, sample: HeartRateSample) {
        self.send(EventPayload::HeartRate { sample });
    }

    fn on_spo2_changed(&self, status: SpO2Status, value: i32) {
        self.send(EventPayload::SpO2 {
            sample: SpO2Sample::new(status, value),
        });
    }

    fn on_error(&self, alert: Alert) {
        self.send(EventPayload::Alert { alert });
    }
}
