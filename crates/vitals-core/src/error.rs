//! Error types for vitals-core.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::InvalidState`] | Fix the caller | Programming error, never retried |
//! | [`Error::PermissionDenied`] | Ask the user, then `start()` again | Surfaced, not retried by the core |
//! | [`Error::PolicyRestricted`] | Do not retry | The vendor refuses access |
//! | [`Error::ConnectionFailed`] | Resolve externally, reconnect | See [`ConnectionFailure::has_resolution`] |
//! | [`Error::CapabilityMissing`] | Informational | The connection stays usable |
//! | [`Error::NotConnected`] | `connect()` first | Sessions need a live connection |
//! | [`Error::InvalidConfig`] | Fix configuration | |
//!
//! Lifecycle misuse such as calling `stop()` twice is absorbed as a no-op and
//! never produces an error.

use thiserror::Error;

use vitals_types::{Alert, ParseError, TrackerKind};

/// Errors that can occur while managing tracker sessions and connections.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operation is not valid in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The body-sensor permission is missing.
    #[error("Permission denied")]
    PermissionDenied,

    /// The vendor SDK policy refused access.
    #[error("Restricted by SDK policy")]
    PolicyRestricted,

    /// The tracking service connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(ConnectionFailure),

    /// The device does not support a tracker kind.
    #[error("{0} tracking is not supported on this device")]
    CapabilityMissing(TrackerKind),

    /// Operation attempted while not connected to the tracking service.
    #[error("Not connected to tracking service")]
    NotConnected,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Vendor error code reported when the health platform is too old.
pub const OLD_PLATFORM_VERSION: i32 = 1;

/// Vendor error code reported when the health platform is not installed.
pub const PACKAGE_NOT_INSTALLED: i32 = 2;

/// Details of a failed service connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFailure {
    /// Vendor error code.
    pub code: i32,
    /// Human readable message from the vendor service.
    pub message: String,
    /// Whether the vendor offers a user-driven resolution (install/update).
    pub has_resolution: bool,
}

impl ConnectionFailure {
    /// Create a new connection failure.
    pub fn new(code: i32, message: impl Into<String>, has_resolution: bool) -> Self {
        Self {
            code,
            message: message.into(),
            has_resolution,
        }
    }

    /// Whether the failure means the health platform must be installed or updated.
    pub fn is_platform_outdated(&self) -> bool {
        matches!(self.code, OLD_PLATFORM_VERSION | PACKAGE_NOT_INSTALLED)
    }
}

impl std::fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if self.has_resolution {
            write!(f, ", resolution available")?;
        }
        Ok(())
    }
}

impl Error {
    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a connection failure.
    pub fn connection_failed(code: i32, message: impl Into<String>, has_resolution: bool) -> Self {
        Self::ConnectionFailed(ConnectionFailure::new(code, message, has_resolution))
    }
}

impl From<Alert> for Error {
    fn from(alert: Alert) -> Self {
        match alert {
            Alert::PermissionDenied => Error::PermissionDenied,
            Alert::PolicyRestricted => Error::PolicyRestricted,
            Alert::CapabilityMissing(kind) => Error::CapabilityMissing(kind),
            _ => Error::invalid_state(format!("tracker failed: {}", alert)),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

/// Result type alias using vitals-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_state("tracker handle is not set");
        assert_eq!(err.to_string(), "Invalid state: tracker handle is not set");

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to tracking service");

        let err = Error::CapabilityMissing(TrackerKind::SpO2);
        assert_eq!(err.to_string(), "SpO2 tracking is not supported on this device");

        let err = Error::connection_failed(PACKAGE_NOT_INSTALLED, "Health platform missing", true);
        assert!(err.to_string().contains("code 2"));
        assert!(err.to_string().contains("resolution available"));
    }

    #[test]
    fn test_platform_outdated_codes() {
        assert!(ConnectionFailure::new(OLD_PLATFORM_VERSION, "old", true).is_platform_outdated());
        assert!(ConnectionFailure::new(PACKAGE_NOT_INSTALLED, "missing", true).is_platform_outdated());
        assert!(!ConnectionFailure::new(99, "other", false).is_platform_outdated());
    }

    #[test]
    fn test_alert_conversion() {
        assert_eq!(Error::from(Alert::PermissionDenied), Error::PermissionDenied);
        assert_eq!(Error::from(Alert::PolicyRestricted), Error::PolicyRestricted);
        assert_eq!(
            Error::from(Alert::CapabilityMissing(TrackerKind::HeartRate)),
            Error::CapabilityMissing(TrackerKind::HeartRate)
        );
        assert!(matches!(Error::from(Alert::Other), Error::InvalidState(_)));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = "ecg".parse::<TrackerKind>().unwrap_err().into();
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("ecg")));
    }
}
