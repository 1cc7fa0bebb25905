//! Error types for data parsing in vitals-types.

use thiserror::Error;

/// Errors that can occur when parsing tracker identifiers and raw values.
///
/// Sample decoding itself is total and never fails; this type only covers
/// textual input such as tracker kind names from configuration files.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The tracker kind name is not recognized.
    #[error("Unknown tracker kind: '{0}' (expected 'heart_rate' or 'spo2')")]
    UnknownTrackerKind(String),
}

/// Result type alias using vitals-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
