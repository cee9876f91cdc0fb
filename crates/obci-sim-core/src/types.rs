//! Core data types for the simulated board
//!
//! These types are shared between the sample synthesizer, the packet encoder
//! and the host-side emulator. All of them are `no_std` compatible.

use heapless::Vec;
use serde::{Deserialize, Serialize};

// ============================================================================
// Board Constants
// ============================================================================

/// Number of EEG channels on the main board (ADS1299).
pub const BOARD_CHANNELS: usize = 8;

/// Number of EEG channels with the daisy module attached.
pub const DAISY_CHANNELS: usize = 16;

/// Number of auxiliary values carried in every sample (accelerometer X/Y/Z).
pub const AUX_CHANNELS: usize = 3;

/// Default sample rate without the daisy module (Hz).
pub const SAMPLE_RATE_DEFAULT_HZ: u32 = 250;

/// Default sample rate with the daisy module attached (Hz).
pub const SAMPLE_RATE_DAISY_HZ: u32 = 125;

// ============================================================================
// Firmware Version
// ============================================================================

/// Firmware generation of the emulated board.
///
/// Radio commands (channel get/set, poll time) only exist on V2 firmware;
/// a V1 board silently ignores them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirmwareVersion {
    /// Original V1 firmware
    #[default]
    #[serde(alias = "v1")]
    V1,
    /// V2 firmware with radio channel management
    #[serde(alias = "v2")]
    V2,
}

impl FirmwareVersion {
    /// Whether the firmware understands radio commands.
    #[must_use]
    pub const fn has_radio_commands(self) -> bool {
        matches!(self, Self::V2)
    }
}

// ============================================================================
// Line Noise
// ============================================================================

/// Mains interference injected into synthetic samples.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineNoise {
    /// 60 Hz mains (Americas)
    #[default]
    #[serde(rename = "60Hz")]
    Hz60,
    /// 50 Hz mains (Europe, Asia)
    #[serde(rename = "50Hz")]
    Hz50,
    /// No mains interference
    None,
}

impl LineNoise {
    /// Mains frequency in Hz, if any.
    #[must_use]
    pub const fn frequency_hz(self) -> Option<f64> {
        match self {
            Self::Hz60 => Some(60.0),
            Self::Hz50 => Some(50.0),
            Self::None => None,
        }
    }

    /// Peak amplitude of the interference in µV.
    #[must_use]
    pub fn amplitude_uv(self) -> f64 {
        match self {
            Self::Hz60 => 8.0 * core::f64::consts::SQRT_2,
            Self::Hz50 => 4.0 * core::f64::consts::SQRT_2,
            Self::None => 0.0,
        }
    }
}

// ============================================================================
// Synthesis Configuration
// ============================================================================

/// Parameters that shape the synthetic signal.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Number of EEG channels (8, or 16 with daisy)
    pub channel_count: usize,
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Add a ~10 Hz alpha rhythm
    pub alpha: bool,
    /// Mains interference
    pub line_noise: LineNoise,
    /// Linear drift in µV per sample
    pub drift_uv: f64,
    /// Populate accelerometer aux values
    pub accel: bool,
}

impl SynthConfig {
    /// Configuration for a board with or without the daisy module.
    #[must_use]
    pub fn for_board(daisy: bool, sample_rate_hz: u32) -> Self {
        Self {
            channel_count: if daisy { DAISY_CHANNELS } else { BOARD_CHANNELS },
            sample_rate_hz,
            ..Self::default()
        }
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            channel_count: BOARD_CHANNELS,
            sample_rate_hz: SAMPLE_RATE_DEFAULT_HZ,
            alpha: true,
            line_noise: LineNoise::Hz60,
            drift_uv: 0.0,
            accel: true,
        }
    }
}

// ============================================================================
// Sample Record
// ============================================================================

/// One multichannel sample produced by the synthesizer.
///
/// Channel values are in volts, aux values in g.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Monotonic sample index the record was synthesized for
    pub index: u64,
    /// Per-channel values in volts (8 or 16 entries)
    pub channels: Vec<f64, DAISY_CHANNELS>,
    /// Auxiliary values (accelerometer X/Y/Z in g)
    pub aux: [f64; AUX_CHANNELS],
}

impl SampleRecord {
    /// Create a record with `channel_count` zeroed channels.
    ///
    /// Channel counts above [`DAISY_CHANNELS`] are truncated.
    #[must_use]
    pub fn zeroed(index: u64, channel_count: usize) -> Self {
        let mut channels = Vec::new();
        for _ in 0..channel_count.min(DAISY_CHANNELS) {
            // Capacity is bounded by the min() above
            let _ = channels.push(0.0);
        }
        Self { index, channels, aux: [0.0; AUX_CHANNELS] }
    }

    /// Whether the record carries daisy channels.
    #[inline]
    #[must_use]
    pub fn is_daisy(&self) -> bool {
        self.channels.len() > BOARD_CHANNELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firmware_radio_gate() {
        assert!(!FirmwareVersion::V1.has_radio_commands());
        assert!(FirmwareVersion::V2.has_radio_commands());
    }

    #[test]
    fn test_line_noise_frequency() {
        assert_eq!(LineNoise::Hz60.frequency_hz(), Some(60.0));
        assert_eq!(LineNoise::Hz50.frequency_hz(), Some(50.0));
        assert_eq!(LineNoise::None.frequency_hz(), None);
        assert!(LineNoise::Hz60.amplitude_uv() > LineNoise::Hz50.amplitude_uv());
    }

    #[test]
    fn test_synth_config_for_daisy() {
        let config = SynthConfig::for_board(true, SAMPLE_RATE_DAISY_HZ);
        assert_eq!(config.channel_count, DAISY_CHANNELS);
        assert_eq!(config.sample_rate_hz, 125);
    }

    #[test]
    fn test_zeroed_record() {
        let record = SampleRecord::zeroed(7, BOARD_CHANNELS);
        assert_eq!(record.index, 7);
        assert_eq!(record.channels.len(), 8);
        assert!(!record.is_daisy());

        let daisy = SampleRecord::zeroed(0, 40);
        assert_eq!(daisy.channels.len(), DAISY_CHANNELS);
        assert!(daisy.is_daisy());
    }
}
