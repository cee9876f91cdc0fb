//! Board state owned by the emulator.

use serde::Serialize;

use obci_sim_core::protocol::SdLogDuration;
use obci_sim_core::types::FirmwareVersion;

use crate::config::SimulatorConfig;

/// Radio channel the dongle starts on.
pub const DEFAULT_RADIO_CHANNEL: u8 = 1;

/// SD card logging session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SdLogState {
    /// A log file is open
    pub active: bool,
    /// Device time the session started (ms)
    pub start_time_ms: f64,
    /// Requested duration of the current session
    pub duration: Option<SdLogDuration>,
}

/// Mutable state of the emulated board.
///
/// Mutated only by the command dispatcher and the stream scheduler.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceState {
    /// Port has opened successfully
    pub connected: bool,
    /// Sample stream is running
    pub streaming: bool,
    /// SD card logging
    pub sd_log: SdLogState,
    /// Radio channel (V2 firmware)
    pub channel_number: u8,
    /// Sample number carried in the next frame (wraps at 255)
    pub sample_number: u8,
    /// Frames emitted since open; drives the synthesizer phase
    pub samples_emitted: u64,
    /// Firmware generation
    pub firmware_version: FirmwareVersion,
    /// Daisy module attached
    pub daisy: bool,
    /// Radio commands always fail
    pub board_failure: bool,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl DeviceState {
    /// Initial state for a configuration, before the port opens.
    #[must_use]
    pub fn new(config: &SimulatorConfig) -> Self {
        Self {
            connected: false,
            streaming: false,
            sd_log: SdLogState::default(),
            channel_number: DEFAULT_RADIO_CHANNEL,
            sample_number: 0,
            samples_emitted: 0,
            firmware_version: config.firmware_version,
            daisy: config.daisy,
            board_failure: config.board_failure,
            sample_rate: config.sample_rate,
        }
    }

    /// Record one emitted frame.
    pub fn advance_sample(&mut self) {
        self.sample_number = self.sample_number.wrapping_add(1);
        self.samples_emitted += 1;
    }
}
