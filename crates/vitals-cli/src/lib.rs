//! Command-line interface for wearable heart rate and SpO2 trackers.
//!
//! The CLI drives the `vitals-core` session machinery against a simulated
//! tracking service, which makes it useful for exercising observers and
//! checking how a device profile behaves without hardware.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `monitor` | Stream samples and alerts until interrupted |
//! | `measure` | Run one blood oxygen measurement |
//! | `capabilities` | Report which trackers the device supports |
//! | `decode` | Decode a raw heart rate record |
//! | `config` | Show, locate or initialize the configuration file |
//!
//! # Output Formats
//!
//! - **Text** (default): Human-readable colored output
//! - **JSON**: Machine-readable JSON, pretty or `--compact`
//!
//! # Configuration
//!
//! The CLI reads `~/.config/vitals/config.toml` (or platform equivalent),
//! or the file named by `--config` / `VITALS_CONFIG`. The `[simulation]`
//! table describes the simulated device: supported trackers, sample rate,
//! seed, and failures to inject.
//!
//! # Environment Variables
//!
//! - `VITALS_CONFIG`: Configuration file path
//! - `NO_COLOR`: Disable colored output when set
//! - `RUST_LOG`: Log filter when neither `--verbose` nor `--quiet` is given
//!
//! # Examples
//!
//! ```bash
//! vitals monitor --count 20
//! vitals measure --duration-ms 20000 --format json
//! vitals decode 0x833e --status 1 --heart-rate 72
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod measurement;
pub mod policy;
pub mod simulator;
