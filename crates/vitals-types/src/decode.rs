//! Raw sample decoding.
//!
//! Trackers deliver samples as loose integers. The only bit-packed field is
//! the heart rate inter-beat interval (IBI):
//!
//! ```text
//!  15 14                                  0
//! +--+-------------------------------------+
//! | Q|        interval magnitude (ms)      |
//! +--+-------------------------------------+
//! ```
//!
//! `Q = 1` marks a low quality interval. The magnitude is unsigned; decoding
//! never sign-extends.
//!
//! Both decoders are total: every input produces a sample.

use crate::types::{HeartRateSample, HeartRateStatus, SpO2Sample, SpO2Status};

/// Mask selecting the 15-bit interval magnitude.
pub const IBI_MAGNITUDE_MASK: u16 = 0x7FFF;

/// Shift moving the quality flag down to bit 0.
pub const IBI_QUALITY_SHIFT: u16 = 15;

/// Largest interval magnitude that fits the packed field.
pub const MAX_IBI_MS: u16 = IBI_MAGNITUDE_MASK;

/// Decode a heart rate sample from its raw fields.
///
/// Negative heart rates (which trackers never report for a found heart
/// rate) decode as 0.
///
/// ```
/// use vitals_types::decode::decode_heart_rate;
/// use vitals_types::HeartRateStatus;
///
/// let sample = decode_heart_rate(1, 72, 0x8000 | 812);
/// assert_eq!(sample.status, HeartRateStatus::FindingHr);
/// assert_eq!(sample.heart_rate, 72);
/// assert_eq!(sample.ibi_ms(), 812);
/// assert!(sample.ibi_quality_bad());
/// ```
#[must_use]
pub fn decode_heart_rate(raw_status: i32, raw_hr: i32, raw_packed_ibi: u16) -> HeartRateSample {
    HeartRateSample::new(
        HeartRateStatus::from(raw_status),
        u32::try_from(raw_hr).unwrap_or(0),
        raw_packed_ibi,
    )
}

/// Decode a blood oxygen sample from its raw fields.
///
/// The value is copied verbatim whatever the status; consumers decide
/// whether to read it (see [`SpO2Sample::reading`]).
///
/// ```
/// use vitals_types::decode::decode_spo2;
/// use vitals_types::SpO2Status;
///
/// let sample = decode_spo2(2, 97);
/// assert_eq!(sample.status, SpO2Status::Completed);
/// assert_eq!(sample.reading(), Some(97));
/// ```
#[must_use]
pub fn decode_spo2(raw_status: i32, raw_value: i32) -> SpO2Sample {
    SpO2Sample::new(SpO2Status::from(raw_status), raw_value)
}

/// Split a packed IBI field into `(magnitude_ms, quality_bad)`.
#[must_use]
pub const fn unpack_ibi(raw_packed_ibi: u16) -> (u16, bool) {
    (
        raw_packed_ibi & IBI_MAGNITUDE_MASK,
        (raw_packed_ibi >> IBI_QUALITY_SHIFT) & 0x1 != 0,
    )
}

/// Pack an interval and quality flag into the 16-bit wire layout.
///
/// Magnitudes above [`MAX_IBI_MS`] are truncated to their low 15 bits.
#[must_use]
pub const fn pack_ibi(ibi_ms: u16, quality_bad: bool) -> u16 {
    ((quality_bad as u16) << IBI_QUALITY_SHIFT) | (ibi_ms & IBI_MAGNITUDE_MASK)
}
