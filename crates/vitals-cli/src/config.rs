//! Configuration file management.
//!
//! The CLI reads an optional TOML file. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration:
//!
//! ```toml
//! measurement_duration_ms = 35000
//! tick_ms = 250
//! trackers = ["heart_rate", "spo2"]
//!
//! [simulation]
//! supported = ["heart_rate", "spo2"]
//! seed = 42
//! sample_interval_ms = 500
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use vitals_core::dispatch::DEFAULT_BACKLOG_WARN_THRESHOLD;
use vitals_core::{SessionOptions, TrackerError};
use vitals_types::TrackerKind;

/// Minimum simulated sample interval in milliseconds.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 10;
/// Maximum simulated sample interval in milliseconds.
pub const MAX_SAMPLE_INTERVAL_MS: u64 = 60_000;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a blood oxygen measurement may take before it is abandoned.
    pub measurement_duration_ms: u64,
    /// How often a running measurement checks for completion or timeout.
    pub tick_ms: u64,
    /// Trackers the CLI expects the device to provide.
    pub trackers: Vec<String>,
    /// Dispatch backlog above which a warning is logged.
    pub backlog_warn_threshold: usize,
    /// Disable colored output.
    pub no_color: bool,
    /// Simulated tracking service.
    pub simulation: SimulationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            measurement_duration_ms: 35_000,
            tick_ms: 250,
            trackers: TrackerKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            backlog_warn_threshold: DEFAULT_BACKLOG_WARN_THRESHOLD,
            no_color: false,
            simulation: SimulationConfig::default(),
        }
    }
}

/// Error the simulator injects into a running tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectedError {
    /// Body-sensor permission missing.
    Permission,
    /// Vendor SDK policy refusal.
    Policy,
    /// Any other tracker failure.
    Other,
}

impl InjectedError {
    /// The tracker error this injection produces.
    pub fn tracker_error(self) -> TrackerError {
        match self {
            InjectedError::Permission => TrackerError::PermissionError,
            InjectedError::Policy => TrackerError::SdkPolicyError,
            InjectedError::Other => TrackerError::Other("simulated sensor failure".to_string()),
        }
    }
}

/// Settings of the simulated tracking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Tracker kinds the simulated device supports.
    pub supported: Vec<String>,
    /// Seed for reproducible samples; random when absent.
    pub seed: Option<u64>,
    /// Delay between simulated samples.
    pub sample_interval_ms: u64,
    /// Fail the connection with this vendor error code.
    pub fail_connection: Option<i32>,
    /// Fail a running tracker with this error.
    pub inject_error: Option<InjectedError>,
    /// Samples delivered before the injected error fires.
    pub error_after_samples: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            supported: TrackerKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            seed: None,
            sample_interval_ms: 500,
            fail_connection: None,
            inject_error: None,
            error_after_samples: 5,
        }
    }
}

impl SimulationConfig {
    /// Supported tracker kinds, parsed.
    pub fn supported_kinds(&self) -> Result<Vec<TrackerKind>, ConfigError> {
        parse_kinds(&self.supported, "simulation.supported")
    }

    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = kind_list_errors(&self.supported, "simulation.supported", true);

        if self.sample_interval_ms < MIN_SAMPLE_INTERVAL_MS {
            errors.push(ValidationError::new(
                "simulation.sample_interval_ms",
                format!(
                    "sample interval {} is too short (minimum {} ms)",
                    self.sample_interval_ms, MIN_SAMPLE_INTERVAL_MS
                ),
            ));
        } else if self.sample_interval_ms > MAX_SAMPLE_INTERVAL_MS {
            errors.push(ValidationError::new(
                "simulation.sample_interval_ms",
                format!(
                    "sample interval {} is too long (maximum {} ms)",
                    self.sample_interval_ms, MAX_SAMPLE_INTERVAL_MS
                ),
            ));
        }

        if self.inject_error.is_some() && self.error_after_samples == 0 {
            errors.push(ValidationError::new(
                "simulation.error_after_samples",
                "must be at least 1 when inject_error is set",
            ));
        }

        errors
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from an explicit path, or from the default path if it exists.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// default configuration.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.tick_ms == 0 {
            errors.push(ValidationError::new("tick_ms", "tick must be > 0"));
        }
        if self.measurement_duration_ms == 0 {
            errors.push(ValidationError::new(
                "measurement_duration_ms",
                "measurement duration must be > 0",
            ));
        } else if self.measurement_duration_ms < self.tick_ms {
            errors.push(ValidationError::new(
                "measurement_duration_ms",
                format!(
                    "measurement duration {} is shorter than one tick ({} ms)",
                    self.measurement_duration_ms, self.tick_ms
                ),
            ));
        }
        if self.backlog_warn_threshold == 0 {
            errors.push(ValidationError::new(
                "backlog_warn_threshold",
                "threshold must be > 0",
            ));
        }

        errors.extend(kind_list_errors(&self.trackers, "trackers", false));
        errors.extend(self.simulation.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate.
    pub fn load_validated(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::load_or_default(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Requested tracker kinds, parsed.
    pub fn tracker_kinds(&self) -> Result<Vec<TrackerKind>, ConfigError> {
        parse_kinds(&self.trackers, "trackers")
    }

    /// Session options derived from this configuration.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            backlog_warn_threshold: self.backlog_warn_threshold,
        }
    }
}

fn parse_kinds(names: &[String], field: &str) -> Result<Vec<TrackerKind>, ConfigError> {
    let errors = kind_list_errors(names, field, true);
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }
    Ok(names.iter().filter_map(|name| name.parse().ok()).collect())
}

fn kind_list_errors(names: &[String], field: &str, allow_empty: bool) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if names.is_empty() && !allow_empty {
        errors.push(ValidationError::new(field, "at least one tracker is required"));
    }
    let mut seen = HashSet::new();
    for (i, name) in names.iter().enumerate() {
        match name.parse::<TrackerKind>() {
            Ok(kind) => {
                if !seen.insert(kind) {
                    errors.push(ValidationError::new(
                        format!("{}[{}]", field, i),
                        format!("duplicate tracker '{}'", name),
                    ));
                }
            }
            Err(e) => errors.push(ValidationError::new(format!("{}[{}]", field, i), e.to_string())),
        }
    }
    errors
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `tick_ms` or `trackers[1]`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vitals")
        .join("config.toml")
}
