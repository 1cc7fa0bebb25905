//! Boundary to the vendor tracking service.
//!
//! These traits describe what the core needs from a sensor-tracking
//! service. A platform binding implements [`HealthTracker`] and
//! [`crate::supervisor::HealthTrackingService`]; tests use the types in
//! [`crate::mock`].
//!
//! Trackers call their listener from threads the core does not control.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use vitals_types::{Alert, TrackerKind};

/// Key of a raw value inside a [`DataPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ValueKey {
    /// Heart rate status code.
    HeartRateStatus,
    /// Heart rate in beats per minute.
    HeartRate,
    /// Packed inter-beat interval (16 bits).
    HeartRateIbi,
    /// Blood oxygen status code.
    SpO2Status,
    /// Blood oxygen saturation percentage.
    SpO2,
}

/// One raw record delivered by a tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataPoint {
    values: BTreeMap<ValueKey, i32>,
}

impl DataPoint {
    /// Create an empty data point.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a heart rate record.
    pub fn heart_rate(status: i32, heart_rate: i32, packed_ibi: u16) -> Self {
        Self::new()
            .with(ValueKey::HeartRateStatus, status)
            .with(ValueKey::HeartRate, heart_rate)
            .with(ValueKey::HeartRateIbi, i32::from(packed_ibi))
    }

    /// Build a blood oxygen record.
    pub fn spo2(status: i32, value: i32) -> Self {
        Self::new()
            .with(ValueKey::SpO2Status, status)
            .with(ValueKey::SpO2, value)
    }

    /// Set a value.
    #[must_use]
    pub fn with(mut self, key: ValueKey, value: i32) -> Self {
        self.values.insert(key, value);
        self
    }

    /// Read a value; missing keys read as 0.
    pub fn value(&self, key: ValueKey) -> i32 {
        self.values.get(&key).copied().unwrap_or(0)
    }

    /// Read the packed IBI field as its low 16 bits.
    pub fn packed_ibi(&self) -> u16 {
        (self.value(ValueKey::HeartRateIbi) & 0xFFFF) as u16
    }
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataPoint{{")?;
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}={}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Error reported by a tracker through its listener.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackerError {
    /// The body-sensor permission is missing.
    PermissionError,
    /// The vendor SDK policy refused access.
    SdkPolicyError,
    /// Any other failure, with the vendor's description.
    Other(String),
}

impl TrackerError {
    /// The alert published on the bus for this error.
    pub fn alert(&self) -> Alert {
        match self {
            TrackerError::PermissionError => Alert::PermissionDenied,
            TrackerError::SdkPolicyError => Alert::PolicyRestricted,
            TrackerError::Other(_) => Alert::Other,
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::PermissionError => write!(f, "permission error"),
            TrackerError::SdkPolicyError => write!(f, "SDK policy error"),
            TrackerError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Callbacks a tracker invokes while a listener is attached.
pub trait TrackerEventListener: Send + Sync {
    /// A batch of raw records arrived.
    fn on_data_received(&self, points: &[DataPoint]);

    /// A requested flush finished delivering buffered records.
    fn on_flush_completed(&self);

    /// The tracker failed; it will deliver nothing more.
    fn on_error(&self, error: TrackerError);
}

/// Handle to one vendor tracker.
///
/// `unset_event_listener` must be safe to call when no listener is set.
pub trait HealthTracker: Send + Sync {
    /// Which signal this tracker produces.
    fn kind(&self) -> TrackerKind;

    /// Attach a listener; the tracker starts measuring.
    fn set_event_listener(&self, listener: Arc<dyn TrackerEventListener>);

    /// Detach the current listener; the tracker stops measuring.
    fn unset_event_listener(&self);

    /// Ask the tracker to deliver buffered records now.
    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_read_as_zero() {
        let point = DataPoint::new();
        assert_eq!(point.value(ValueKey::HeartRate), 0);
        assert_eq!(point.packed_ibi(), 0);
    }

    #[test]
    fn test_packed_ibi_keeps_low_sixteen_bits() {
        let point = DataPoint::new().with(ValueKey::HeartRateIbi, 0x1_8123);
        assert_eq!(point.packed_ibi(), 0x8123);

        // A vendor that hands the field over as a sign-extended short.
        let point = DataPoint::new().with(ValueKey::HeartRateIbi, -1);
        assert_eq!(point.packed_ibi(), 0xFFFF);
    }

    #[test]
    fn test_builders() {
        let point = DataPoint::heart_rate(1, 72, 0x8000 | 800);
        assert_eq!(point.value(ValueKey::HeartRateStatus), 1);
        assert_eq!(point.value(ValueKey::HeartRate), 72);
        assert_eq!(point.packed_ibi(), 0x8000 | 800);

        let point = DataPoint::spo2(2, 97);
        assert_eq!(point.value(ValueKey::SpO2Status), 2);
        assert_eq!(point.value(ValueKey::SpO2), 97);
    }

    #[test]
    fn test_tracker_error_alerts() {
        assert_eq!(TrackerError::PermissionError.alert(), Alert::PermissionDenied);
        assert_eq!(TrackerError::SdkPolicyError.alert(), Alert::PolicyRestricted);
        assert_eq!(TrackerError::Other("boom".into()).alert(), Alert::Other);
    }

    #[test]
    fn test_data_point_display() {
        let point = DataPoint::spo2(0, 0);
        assert_eq!(point.to_string(), "DataPoint{SpO2Status=0, SpO2=0}");
    }
}
