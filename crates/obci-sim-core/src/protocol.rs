//! Serial wire protocol of the OpenBCI V3 board
//!
//! This module defines:
//! - The ASCII command bytes the board accepts
//! - [`Command`] parsing from a written byte sequence
//! - The fixed response texts and the `$$$` terminator
//! - The 33-byte binary sample frame (encoder and decoder)
//!
//! Text responses always end with [`TERMINATOR`]. Sample frames are
//! delimited by [`START_BYTE`] and [`STOP_BYTE`] instead.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{SampleRecord, AUX_CHANNELS, BOARD_CHANNELS, DAISY_CHANNELS};

// ============================================================================
// Command Bytes
// ============================================================================

/// Command byte constants.
pub mod cmd {
    /// Start streaming samples
    pub const STREAM_START: u8 = b'b';
    /// Stop streaming samples
    pub const STREAM_STOP: u8 = b's';
    /// Soft reset (prints board identification)
    pub const SOFT_RESET: u8 = b'v';

    /// Log to SD card for 14 seconds
    pub const SD_LOG_SEC_14: u8 = b'a';
    /// Log to SD card for 5 minutes
    pub const SD_LOG_MIN_5: u8 = b'A';
    /// Log to SD card for 15 minutes
    pub const SD_LOG_MIN_15: u8 = b'S';
    /// Log to SD card for 30 minutes
    pub const SD_LOG_MIN_30: u8 = b'F';
    /// Log to SD card for 1 hour
    pub const SD_LOG_HOUR_1: u8 = b'G';
    /// Log to SD card for 2 hours
    pub const SD_LOG_HOUR_2: u8 = b'H';
    /// Log to SD card for 4 hours
    pub const SD_LOG_HOUR_4: u8 = b'J';
    /// Log to SD card for 12 hours
    pub const SD_LOG_HOUR_12: u8 = b'K';
    /// Log to SD card for 24 hours
    pub const SD_LOG_HOUR_24: u8 = b'L';
    /// Stop SD card logging
    pub const SD_LOG_STOP: u8 = b'j';

    /// Begin clock synchronization
    pub const SYNC_TIME_SET: u8 = b'<';
    /// Clock-sync reply carrying the peer's two timestamps
    pub const SYNC_CLOCK_SERVER_DATA: u8 = b'>';
    /// Token emitted once the sync request has gone out
    pub const SYNC_TIME_SENT: u8 = b',';

    /// Prefix of all radio (dongle) commands
    pub const RADIO_KEY: u8 = 0xF0;
    /// Radio: get current channel
    pub const RADIO_CHANNEL_GET: u8 = 0x00;
    /// Radio: set channel (followed by the channel byte)
    pub const RADIO_CHANNEL_SET: u8 = 0x01;
    /// Radio: set poll time (followed by the poll byte)
    pub const RADIO_POLL_TIME_SET: u8 = 0x04;
}

/// Text terminator ending every text response.
pub const TERMINATOR: &[u8; 3] = b"$$$";

/// Port identifier the simulator answers to.
pub const SIMULATOR_PORT_NAME: &str = "OpenBCISimulator";

// ============================================================================
// Response Texts
// ============================================================================

/// Fixed response texts (without terminator unless noted).
pub mod text {
    /// Channel get/set success prefix (followed by the channel byte)
    pub const CHANNEL_SUCCESS: &str = "Success: Channel changed to 0x";
    /// Channel get failure prefix (followed by the channel byte)
    pub const CHANNEL_GET_FAILURE: &str =
        "Failure: No Board communications; Dongle on channel number: 0x";
    /// Generic radio failure
    pub const RADIO_FAILURE: &str =
        "Failure: No communications from Board. Is your Board on the right channel? Is your Board powered up?";
    /// Poll time success
    pub const POLL_TIME_SUCCESS: &str = "Success: Poll time set";

    /// Soft reset banner
    pub const RESET_BANNER: &str = "OpenBCI V3 Simulator\nOn Board ADS1299 Device ID: 0x12345\n";
    /// Soft reset daisy line
    pub const RESET_DAISY: &str = "On Daisy ADS1299 Device ID: 0xFFFFF\n";
    /// Soft reset accelerometer line
    pub const RESET_ACCEL: &str = "LIS3DH Device ID: 0x38422\n";
    /// Soft reset firmware line (V2 only)
    pub const RESET_FIRMWARE_V2: &str = "Firmware: v2\n";

    /// SD logging started
    pub const SD_START: &str =
        "Wiring is correct and a card is present.\nCorresponding SD file OBCI_69.TXT\n";
    /// SD stop without an open file
    pub const SD_NO_FILE: &str = "No open file to close\n";

    /// Clock sync completed
    pub const SYNCED: &str = "Synced!";
}

// ============================================================================
// SD Log Duration
// ============================================================================

/// Requested SD logging duration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SdLogDuration {
    /// 14 seconds
    Sec14,
    /// 5 minutes
    Min5,
    /// 15 minutes
    Min15,
    /// 30 minutes
    Min30,
    /// 1 hour
    Hour1,
    /// 2 hours
    Hour2,
    /// 4 hours
    Hour4,
    /// 12 hours
    Hour12,
    /// 24 hours
    Hour24,
}

impl SdLogDuration {
    /// All durations in ascending order.
    pub const ALL: [Self; 9] = [
        Self::Sec14,
        Self::Min5,
        Self::Min15,
        Self::Min30,
        Self::Hour1,
        Self::Hour2,
        Self::Hour4,
        Self::Hour12,
        Self::Hour24,
    ];

    /// Try to convert a command byte to a duration.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            cmd::SD_LOG_SEC_14 => Some(Self::Sec14),
            cmd::SD_LOG_MIN_5 => Some(Self::Min5),
            cmd::SD_LOG_MIN_15 => Some(Self::Min15),
            cmd::SD_LOG_MIN_30 => Some(Self::Min30),
            cmd::SD_LOG_HOUR_1 => Some(Self::Hour1),
            cmd::SD_LOG_HOUR_2 => Some(Self::Hour2),
            cmd::SD_LOG_HOUR_4 => Some(Self::Hour4),
            cmd::SD_LOG_HOUR_12 => Some(Self::Hour12),
            cmd::SD_LOG_HOUR_24 => Some(Self::Hour24),
            _ => None,
        }
    }

    /// Command byte for this duration.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Sec14 => cmd::SD_LOG_SEC_14,
            Self::Min5 => cmd::SD_LOG_MIN_5,
            Self::Min15 => cmd::SD_LOG_MIN_15,
            Self::Min30 => cmd::SD_LOG_MIN_30,
            Self::Hour1 => cmd::SD_LOG_HOUR_1,
            Self::Hour2 => cmd::SD_LOG_HOUR_2,
            Self::Hour4 => cmd::SD_LOG_HOUR_4,
            Self::Hour12 => cmd::SD_LOG_HOUR_12,
            Self::Hour24 => cmd::SD_LOG_HOUR_24,
        }
    }

    /// Duration in seconds.
    #[must_use]
    pub const fn seconds(self) -> u32 {
        match self {
            Self::Sec14 => 14,
            Self::Min5 => 5 * 60,
            Self::Min15 => 15 * 60,
            Self::Min30 => 30 * 60,
            Self::Hour1 => 3600,
            Self::Hour2 => 2 * 3600,
            Self::Hour4 => 4 * 3600,
            Self::Hour12 => 12 * 3600,
            Self::Hour24 => 24 * 3600,
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A recognized host → board command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Radio: report the current channel (V2)
    ChannelGet,
    /// Radio: change channel (V2)
    ChannelSet {
        /// Requested channel number
        channel: u8,
    },
    /// Radio: set poll time (V2)
    PollTimeSet {
        /// Requested poll time
        poll_time: u8,
    },
    /// Start streaming
    StreamStart,
    /// Stop streaming
    StreamStop,
    /// Soft reset
    SoftReset,
    /// Start SD logging
    SdLogStart(SdLogDuration),
    /// Stop SD logging
    SdLogStop,
    /// Begin clock synchronization
    SyncTimeSet,
    /// Clock-sync reply with the peer timestamps
    SyncClockServerData {
        /// ASCII payload following the command byte
        payload: &'a [u8],
    },
}

impl<'a> Command<'a> {
    /// Parse a written byte sequence.
    ///
    /// Only the first command in `data` is considered. Returns `None` for
    /// empty, unrecognized or truncated input.
    #[must_use]
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let (&first, rest) = data.split_first()?;

        if let Some(duration) = SdLogDuration::from_byte(first) {
            return Some(Self::SdLogStart(duration));
        }

        match first {
            cmd::RADIO_KEY => Self::parse_radio(rest),
            cmd::STREAM_START => Some(Self::StreamStart),
            cmd::STREAM_STOP => Some(Self::StreamStop),
            cmd::SOFT_RESET => Some(Self::SoftReset),
            cmd::SD_LOG_STOP => Some(Self::SdLogStop),
            cmd::SYNC_TIME_SET => Some(Self::SyncTimeSet),
            cmd::SYNC_CLOCK_SERVER_DATA => Some(Self::SyncClockServerData { payload: rest }),
            _ => None,
        }
    }

    fn parse_radio(rest: &[u8]) -> Option<Self> {
        let (&code, args) = rest.split_first()?;
        match code {
            cmd::RADIO_CHANNEL_GET => Some(Self::ChannelGet),
            cmd::RADIO_CHANNEL_SET => args.first().map(|&channel| Self::ChannelSet { channel }),
            cmd::RADIO_POLL_TIME_SET => {
                args.first().map(|&poll_time| Self::PollTimeSet { poll_time })
            }
            _ => None,
        }
    }

    /// Whether the command is only understood by V2 firmware.
    #[must_use]
    pub const fn requires_v2(&self) -> bool {
        matches!(self, Self::ChannelGet | Self::ChannelSet { .. } | Self::PollTimeSet { .. })
    }
}

// ============================================================================
// Sample Frame
// ============================================================================

/// First byte of every sample frame.
pub const START_BYTE: u8 = 0xA0;

/// Last byte of every sample frame.
pub const STOP_BYTE: u8 = 0xC0;

/// Sample frame size in bytes.
///
/// Layout: start(1) + sample number(1) + 8 × 24-bit channels(24) +
/// 3 × 16-bit aux(6) + stop(1).
pub const PACKET_SIZE: usize = 33;

/// ADS1299 reference voltage in volts.
pub const ADS1299_VREF: f64 = 4.5;

/// ADS1299 programmable gain used by the board.
pub const ADS1299_GAIN: f64 = 24.0;

/// Volts per channel count.
pub const SCALE_VOLTS_PER_COUNT: f64 = ADS1299_VREF / ADS1299_GAIN / 8_388_607.0;

/// g per accelerometer count (LIS3DH at ±4 g).
pub const SCALE_G_PER_COUNT: f64 = 0.002 / 16.0;

const INT24_MAX: i32 = 8_388_607;
const INT24_MIN: i32 = -8_388_608;

/// Raw contents of a decoded sample frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    /// Sample number (wraps at 255)
    pub sample_number: u8,
    /// Channel counts (24-bit, sign extended)
    pub channels: [i32; BOARD_CHANNELS],
    /// Aux counts
    pub aux: [i16; AUX_CHANNELS],
}

impl RawSample {
    /// Channel value in volts.
    #[must_use]
    pub fn channel_volts(&self, index: usize) -> f64 {
        f64::from(self.channels[index]) * SCALE_VOLTS_PER_COUNT
    }

    /// Aux value in g.
    #[must_use]
    pub fn aux_g(&self, index: usize) -> f64 {
        f64::from(self.aux[index]) * SCALE_G_PER_COUNT
    }
}

/// Convert a value in volts to clamped 24-bit channel counts.
#[must_use]
pub fn volts_to_counts(volts: f64) -> i32 {
    let counts = libm::round(volts / SCALE_VOLTS_PER_COUNT);
    if counts >= f64::from(INT24_MAX) {
        INT24_MAX
    } else if counts <= f64::from(INT24_MIN) {
        INT24_MIN
    } else {
        counts as i32
    }
}

/// Convert a value in g to clamped 16-bit aux counts.
#[must_use]
pub fn g_to_counts(g: f64) -> i16 {
    let counts = libm::round(g / SCALE_G_PER_COUNT);
    if counts >= f64::from(i16::MAX) {
        i16::MAX
    } else if counts <= f64::from(i16::MIN) {
        i16::MIN
    } else {
        counts as i16
    }
}

fn write_int24(value: i32, out: &mut [u8]) {
    let bytes = value.to_be_bytes();
    out[..3].copy_from_slice(&bytes[1..]);
}

fn read_int24(bytes: &[u8]) -> i32 {
    // Shift into the top of an i32 and back to sign-extend
    (i32::from_be_bytes([bytes[0], bytes[1], bytes[2], 0])) >> 8
}

/// Serialize a sample record into a 33-byte frame.
///
/// Sixteen-channel (daisy) records are split across consecutive frames:
/// odd sample numbers carry channels 1-8, even sample numbers carry 9-16.
///
/// # Errors
///
/// Returns an error if the buffer is too small or the record has neither
/// 8 nor 16 channels.
pub fn encode_sample(
    record: &SampleRecord,
    sample_number: u8,
    buffer: &mut [u8],
) -> Result<usize, ProtocolError> {
    if buffer.len() < PACKET_SIZE {
        return Err(ProtocolError::BufferOverflow {
            required: PACKET_SIZE,
            available: buffer.len(),
        });
    }

    let bank = match record.channels.len() {
        BOARD_CHANNELS => &record.channels[..],
        DAISY_CHANNELS if sample_number % 2 == 1 => &record.channels[..BOARD_CHANNELS],
        DAISY_CHANNELS => &record.channels[BOARD_CHANNELS..],
        count => return Err(ProtocolError::InvalidChannelCount { count }),
    };

    let mut offset = 0;

    buffer[offset] = START_BYTE;
    offset += 1;

    buffer[offset] = sample_number;
    offset += 1;

    for &volts in bank {
        write_int24(volts_to_counts(volts), &mut buffer[offset..offset + 3]);
        offset += 3;
    }

    for &g in &record.aux {
        buffer[offset..offset + 2].copy_from_slice(&g_to_counts(g).to_be_bytes());
        offset += 2;
    }

    buffer[offset] = STOP_BYTE;
    offset += 1;

    Ok(offset)
}

/// Parse a 33-byte sample frame.
///
/// # Errors
///
/// Returns an error on short input or wrong start/stop bytes.
pub fn decode_sample_packet(data: &[u8]) -> Result<RawSample, ProtocolError> {
    if data.len() < PACKET_SIZE {
        return Err(ProtocolError::IncompletePacket {
            received: data.len(),
            expected: PACKET_SIZE,
        });
    }
    if data[0] != START_BYTE {
        return Err(ProtocolError::InvalidStartByte { got: data[0] });
    }
    if data[PACKET_SIZE - 1] != STOP_BYTE {
        return Err(ProtocolError::InvalidStopByte { got: data[PACKET_SIZE - 1] });
    }

    let sample_number = data[1];
    let mut offset = 2;

    let mut channels = [0i32; BOARD_CHANNELS];
    for ch in &mut channels {
        *ch = read_int24(&data[offset..offset + 3]);
        offset += 3;
    }

    let mut aux = [0i16; AUX_CHANNELS];
    for value in &mut aux {
        *value = i16::from_be_bytes([data[offset], data[offset + 1]]);
        offset += 2;
    }

    Ok(RawSample { sample_number, channels, aux })
}

/// Whether a byte sequence ends with the text terminator.
#[must_use]
pub fn is_terminated(data: &[u8]) -> bool {
    data.ends_with(TERMINATOR)
}

// ============================================================================
// Tests
// ============================================================================
