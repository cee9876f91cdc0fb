//! Simulator configuration.
//!
//! Callers pass [`SimulatorOptions`], where every key is optional, and the
//! emulator works from the resolved [`SimulatorConfig`]. Options use the
//! camelCase keys of the board's option object so JSON files written for
//! other OpenBCI tooling load unchanged.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use obci_sim_core::types::{
    FirmwareVersion, LineNoise, SynthConfig, SAMPLE_RATE_DAISY_HZ, SAMPLE_RATE_DEFAULT_HZ,
};

/// Shortest interval between streamed samples.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(2);

/// Errors from loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// JSON was malformed
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Sample rate must be positive
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// Drift must be a finite number
    #[error("Invalid drift: {0}")]
    InvalidDrift(f64),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Caller-supplied options; unset keys take board defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulatorOptions {
    /// Enable accelerometer aux data
    pub accel: Option<bool>,
    /// Enable alpha rhythm synthesis
    pub alpha: Option<bool>,
    /// Force failure responses to radio commands
    pub board_failure: Option<bool>,
    /// Attach the 8-channel daisy module
    pub daisy: Option<bool>,
    /// Linear drift in µV per sample
    pub drift: Option<f64>,
    /// Firmware generation
    pub firmware_version: Option<FirmwareVersion>,
    /// Mains interference
    pub line_noise: Option<LineNoise>,
    /// Sample rate in Hz
    pub sample_rate: Option<u32>,
    /// Fail the port open
    pub serial_port_failure: Option<bool>,
    /// Log every command at info level
    pub verbose: Option<bool>,
    /// Seed for the synthetic random source
    pub seed: Option<u64>,
}

impl SimulatorOptions {
    /// Parse options from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Fill in defaults and validate.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero sample rate or non-finite drift.
    pub fn resolve(self) -> ConfigResult<SimulatorConfig> {
        let daisy = self.daisy.unwrap_or(false);
        let sample_rate = self.sample_rate.unwrap_or(if daisy {
            SAMPLE_RATE_DAISY_HZ
        } else {
            SAMPLE_RATE_DEFAULT_HZ
        });
        if sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }

        let drift = self.drift.unwrap_or(0.0);
        if !drift.is_finite() {
            return Err(ConfigError::InvalidDrift(drift));
        }

        Ok(SimulatorConfig {
            accel: self.accel.unwrap_or(true),
            alpha: self.alpha.unwrap_or(true),
            board_failure: self.board_failure.unwrap_or(false),
            daisy,
            drift,
            firmware_version: self.firmware_version.unwrap_or_default(),
            line_noise: self.line_noise.unwrap_or_default(),
            sample_rate,
            serial_port_failure: self.serial_port_failure.unwrap_or(false),
            verbose: self.verbose.unwrap_or(false),
            seed: self.seed,
        })
    }
}

/// Fully resolved simulator configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorConfig {
    /// Enable accelerometer aux data
    pub accel: bool,
    /// Enable alpha rhythm synthesis
    pub alpha: bool,
    /// Force failure responses to radio commands
    pub board_failure: bool,
    /// Attach the 8-channel daisy module
    pub daisy: bool,
    /// Linear drift in µV per sample
    pub drift: f64,
    /// Firmware generation
    pub firmware_version: FirmwareVersion,
    /// Mains interference
    pub line_noise: LineNoise,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Fail the port open
    pub serial_port_failure: bool,
    /// Log every command at info level
    pub verbose: bool,
    /// Seed for the synthetic random source (entropy if unset)
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            accel: true,
            alpha: true,
            board_failure: false,
            daisy: false,
            drift: 0.0,
            firmware_version: FirmwareVersion::V1,
            line_noise: LineNoise::Hz60,
            sample_rate: SAMPLE_RATE_DEFAULT_HZ,
            serial_port_failure: false,
            verbose: false,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Interval between streamed samples: `1000 / sample_rate` ms, at least 2 ms.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        let period = Duration::from_nanos(1_000_000_000 / u64::from(self.sample_rate.max(1)));
        period.max(MIN_TICK_PERIOD)
    }

    /// Parameters for the sample synthesizer.
    #[must_use]
    pub fn synth_config(&self) -> SynthConfig {
        SynthConfig {
            alpha: self.alpha,
            line_noise: self.line_noise,
            drift_uv: self.drift,
            accel: self.accel,
            ..SynthConfig::for_board(self.daisy, self.sample_rate)
        }
    }
}
