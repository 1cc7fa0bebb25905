//! Core types for wearable tracker samples.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::decode::{IBI_MAGNITUDE_MASK, IBI_QUALITY_SHIFT};
use crate::error::ParseError;

/// Kind of physiological signal a tracker produces.
///
/// The set is closed: sessions and the simulator match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrackerKind {
    /// Continuous heart rate with inter-beat intervals.
    HeartRate,
    /// On-demand blood oxygen saturation.
    #[cfg_attr(feature = "serde", serde(rename = "spo2"))]
    SpO2,
}

impl TrackerKind {
    /// All tracker kinds, in a stable order.
    pub const ALL: [TrackerKind; 2] = [TrackerKind::HeartRate, TrackerKind::SpO2];

    /// Stable snake_case name, as used in configuration files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerKind::HeartRate => "heart_rate",
            TrackerKind::SpO2 => "spo2",
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerKind::HeartRate => write!(f, "Heart Rate"),
            TrackerKind::SpO2 => write!(f, "SpO2"),
        }
    }
}

impl FromStr for TrackerKind {
    type Err = ParseError;

    /// Parse a tracker kind name (case-insensitive, `-` and `_` interchangeable).
    ///
    /// ```
    /// use vitals_types::TrackerKind;
    ///
    /// assert_eq!("heart_rate".parse(), Ok(TrackerKind::HeartRate));
    /// assert_eq!("HR".parse(), Ok(TrackerKind::HeartRate));
    /// assert_eq!("SpO2".parse(), Ok(TrackerKind::SpO2));
    /// assert!("ecg".parse::<TrackerKind>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "heart_rate" | "heartrate" | "hr" => Ok(TrackerKind::HeartRate),
            "spo2" | "blood_oxygen" => Ok(TrackerKind::SpO2),
            _ => Err(ParseError::UnknownTrackerKind(s.to_string())),
        }
    }
}

/// Heart rate measurement status reported with each heart rate sample.
///
/// Only [`HeartRateStatus::FindingHr`] carries a usable heart rate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[repr(i32)]
pub enum HeartRateStatus {
    /// No status yet (also used for unrecognized raw codes).
    #[default]
    None = 0,
    /// Heart rate found; the value is valid.
    FindingHr = 1,
    /// Watch is attached to the wrist.
    Attached = -1,
    /// Movement detected; measurement is paused.
    DetectingMove = -2,
    /// Watch is detached from the wrist.
    Detached = -3,
    /// Low reliability of the measured value.
    LowReliability = -8,
    /// Very low reliability of the measured value.
    VeryLowReliability = -10,
    /// No data was available when the tracker flushed.
    NoDataFlush = -99,
}

impl From<i32> for HeartRateStatus {
    fn from(value: i32) -> Self {
        match value {
            1 => HeartRateStatus::FindingHr,
            -1 => HeartRateStatus::Attached,
            -2 => HeartRateStatus::DetectingMove,
            -3 => HeartRateStatus::Detached,
            -8 => HeartRateStatus::LowReliability,
            -10 => HeartRateStatus::VeryLowReliability,
            -99 => HeartRateStatus::NoDataFlush,
            _ => HeartRateStatus::None,
        }
    }
}

impl fmt::Display for HeartRateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeartRateStatus::None => write!(f, "None"),
            HeartRateStatus::FindingHr => write!(f, "Heart rate found"),
            HeartRateStatus::Attached => write!(f, "Attached"),
            HeartRateStatus::DetectingMove => write!(f, "Movement detected"),
            HeartRateStatus::Detached => write!(f, "Detached"),
            HeartRateStatus::LowReliability => write!(f, "Low reliability"),
            HeartRateStatus::VeryLowReliability => write!(f, "Very low reliability"),
            HeartRateStatus::NoDataFlush => write!(f, "No data on flush"),
        }
    }
}

/// Blood oxygen measurement status.
///
/// [`SpO2Status::Initial`] is never produced by a tracker for a known code;
/// consumers use it as the "no status seen yet" sentinel when
/// de-duplicating status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[repr(i32)]
pub enum SpO2Status {
    /// No status yet (also used for unrecognized raw codes).
    #[default]
    Initial = -1,
    /// Measurement in progress.
    Calculating = 0,
    /// Measurement finished; the value is valid.
    Completed = 2,
    /// The device moved during measurement.
    DeviceMoving = -4,
    /// The optical signal is too weak.
    LowSignal = -5,
}

impl From<i32> for SpO2Status {
    fn from(value: i32) -> Self {
        match value {
            0 => SpO2Status::Calculating,
            2 => SpO2Status::Completed,
            -4 => SpO2Status::DeviceMoving,
            -5 => SpO2Status::LowSignal,
            _ => SpO2Status::Initial,
        }
    }
}

impl fmt::Display for SpO2Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpO2Status::Initial => write!(f, "Initial"),
            SpO2Status::Calculating => write!(f, "Calculating"),
            SpO2Status::Completed => write!(f, "Completed"),
            SpO2Status::DeviceMoving => write!(f, "Device moving"),
            SpO2Status::LowSignal => write!(f, "Low signal"),
        }
    }
}

/// One decoded heart rate sample.
///
/// The inter-beat interval and its quality flag are both views of a single
/// 16-bit packed field; they cannot be set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(into = "HeartRateSampleRepr", from = "HeartRateSampleRepr")
)]
pub struct HeartRateSample {
    /// Measurement status.
    pub status: HeartRateStatus,
    /// Heart rate in beats per minute.
    pub heart_rate: u32,
    packed_ibi: u16,
}

impl HeartRateSample {
    /// Build a sample from a status, a heart rate and a raw packed IBI field.
    #[must_use]
    pub const fn new(status: HeartRateStatus, heart_rate: u32, packed_ibi: u16) -> Self {
        Self {
            status,
            heart_rate,
            packed_ibi,
        }
    }

    /// Inter-beat interval in milliseconds (0..=32767).
    #[must_use]
    pub const fn ibi_ms(&self) -> u16 {
        self.packed_ibi & IBI_MAGNITUDE_MASK
    }

    /// Whether the tracker flagged the inter-beat interval as low quality.
    #[must_use]
    pub const fn ibi_quality_bad(&self) -> bool {
        (self.packed_ibi >> IBI_QUALITY_SHIFT) & 0x1 != 0
    }

    /// The raw 16-bit field: bit 15 is the quality flag, bits 0-14 the interval.
    #[must_use]
    pub const fn packed_ibi(&self) -> u16 {
        self.packed_ibi
    }

    /// The heart rate, if the status says it is meaningful.
    #[must_use]
    pub fn bpm(&self) -> Option<u32> {
        (self.status == HeartRateStatus::FindingHr).then_some(self.heart_rate)
    }
}

impl fmt::Display for HeartRateSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bpm() {
            Some(bpm) => write!(f, "{} bpm", bpm)?,
            None => write!(f, "-- bpm")?,
        }
        write!(
            f,
            " (IBI {} ms{}, {})",
            self.ibi_ms(),
            if self.ibi_quality_bad() { ", low quality" } else { "" },
            self.status
        )
    }
}

/// Serialized form of [`HeartRateSample`] with the IBI fields unpacked.
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct HeartRateSampleRepr {
    status: HeartRateStatus,
    heart_rate: u32,
    ibi_ms: u16,
    ibi_quality_bad: bool,
}

#[cfg(feature = "serde")]
impl From<HeartRateSample> for HeartRateSampleRepr {
    fn from(sample: HeartRateSample) -> Self {
        Self {
            status: sample.status,
            heart_rate: sample.heart_rate,
            ibi_ms: sample.ibi_ms(),
            ibi_quality_bad: sample.ibi_quality_bad(),
        }
    }
}

#[cfg(feature = "serde")]
impl From<HeartRateSampleRepr> for HeartRateSample {
    fn from(repr: HeartRateSampleRepr) -> Self {
        let quality = u16::from(repr.ibi_quality_bad) << IBI_QUALITY_SHIFT;
        HeartRateSample::new(
            repr.status,
            repr.heart_rate,
            quality | (repr.ibi_ms & IBI_MAGNITUDE_MASK),
        )
    }
}

/// One decoded blood oxygen sample.
///
/// `value` is copied verbatim from the tracker and is only meaningful when
/// `status` is [`SpO2Status::Completed`]; use [`SpO2Sample::reading`] to
/// apply that rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpO2Sample {
    /// Measurement status.
    pub status: SpO2Status,
    /// Oxygen saturation percentage as reported by the tracker.
    pub value: i32,
}

impl SpO2Sample {
    /// Create a new sample.
    #[must_use]
    pub const fn new(status: SpO2Status, value: i32) -> Self {
        Self { status, value }
    }

    /// The saturation percentage, only when the measurement completed.
    #[must_use]
    pub fn reading(&self) -> Option<i32> {
        (self.status == SpO2Status::Completed).then_some(self.value)
    }
}

/// How serious an [`Alert`] is.
///
/// Capability gaps and tracker errors travel through the same observer
/// callback; severity tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    /// Informational; everything keeps working.
    Warning,
    /// The producing tracker stopped.
    Failure,
}

/// Error kind delivered to observers on the error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "tracker", rename_all = "snake_case"))]
#[non_exhaustive]
pub enum Alert {
    /// The user has not granted the body-sensor permission.
    PermissionDenied,
    /// The vendor SDK policy refused access to the tracker.
    PolicyRestricted,
    /// Any other tracker failure.
    Other,
    /// The device does not support the given tracker kind.
    CapabilityMissing(TrackerKind),
}

impl Alert {
    /// Severity of this alert.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Alert::CapabilityMissing(_) => Severity::Warning,
            Alert::PermissionDenied | Alert::PolicyRestricted | Alert::Other => Severity::Failure,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::PermissionDenied => write!(f, "Permission for body sensors was not granted"),
            Alert::PolicyRestricted => write!(f, "Tracker access denied by SDK policy"),
            Alert::Other => write!(f, "Tracker error"),
            Alert::CapabilityMissing(kind) => {
                write!(f, "Device does not support {} tracking", kind)
            }
        }
    }
}
