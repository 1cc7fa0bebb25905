//! Platform-agnostic types for wearable health trackers.
//!
//! This crate provides the sample model shared by the tracking core
//! (vitals-core) and any consumer that only needs to read samples.
//!
//! # Features
//!
//! - Tracker kinds and status codes for heart rate and blood oxygen
//! - Decoded sample records with the packed IBI field kept bit-exact
//! - Pure decoders from raw tracker values ([`decode`])
//! - The alert kinds delivered on the error channel
//!
//! # Example
//!
//! ```
//! use vitals_types::decode::decode_heart_rate;
//! use vitals_types::HeartRateStatus;
//!
//! let sample = decode_heart_rate(1, 64, 0x03A8);
//! assert_eq!(sample.status, HeartRateStatus::FindingHr);
//! assert_eq!(sample.ibi_ms(), 936);
//! ```

pub mod decode;
pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    Alert, HeartRateSample, HeartRateStatus, Severity, SpO2Sample, SpO2Status, TrackerKind,
};
