//! Error types for the simulator wire protocol
//!
//! These errors work in `no_std` environments and carry enough context to
//! diagnose a bad frame or payload without heap allocation.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors from encoding or decoding protocol frames and payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    /// Output buffer is too small
    BufferOverflow {
        /// Bytes needed
        required: usize,
        /// Bytes available
        available: usize,
    },
    /// Not enough bytes for a complete frame
    IncompletePacket {
        /// Bytes received
        received: usize,
        /// Bytes expected
        expected: usize,
    },
    /// Frame does not start with the start byte
    InvalidStartByte {
        /// The byte found
        got: u8,
    },
    /// Frame does not end with the stop byte
    InvalidStopByte {
        /// The byte found
        got: u8,
    },
    /// Record has an unsupported channel count
    InvalidChannelCount {
        /// Channels in the record
        count: usize,
    },
    /// Clock-sync payload is empty
    EmptySyncPayload,
    /// Clock-sync payload half is not a number
    InvalidTimestamp {
        /// Which half of the payload failed (0 or 1)
        half: u8,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferOverflow { required, available } => {
                write!(f, "Buffer overflow: need {required} bytes, have {available}")
            }
            Self::IncompletePacket { received, expected } => {
                write!(f, "Incomplete packet: got {received} bytes, expected {expected}")
            }
            Self::InvalidStartByte { got } => {
                write!(f, "Invalid start byte: 0x{got:02X}")
            }
            Self::InvalidStopByte { got } => {
                write!(f, "Invalid stop byte: 0x{got:02X}")
            }
            Self::InvalidChannelCount { count } => {
                write!(f, "Unsupported channel count: {count}")
            }
            Self::EmptySyncPayload => write!(f, "Clock sync payload is empty"),
            Self::InvalidTimestamp { half } => {
                write!(f, "Clock sync payload half {half} is not a timestamp")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}
