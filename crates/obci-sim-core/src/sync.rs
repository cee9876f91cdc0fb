//! Four-timestamp clock synchronization math
//!
//! The handshake collects:
//! - `t0`: emulator send time (at sync-time-set)
//! - `t1`: peer receive time
//! - `t2`: peer send time
//! - `t3`: emulator receive time (at clock-server-data)
//!
//! The estimate is a one-way-delay model, not the symmetric NTP offset:
//!
//! ```text
//! network  = t3 - t0 - (t2 - t1)
//! transfer = network / 2
//! true     = t2 + transfer
//! delta    = true - t3
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// The four timestamps of one completed handshake, in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncTimestamps {
    /// Emulator send time
    pub t0: f64,
    /// Peer receive time
    pub t1: f64,
    /// Peer send time
    pub t2: f64,
    /// Emulator receive time
    pub t3: f64,
}

/// Result of a clock synchronization.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Round trip time minus the peer's processing time
    pub time_spent_on_network: f64,
    /// Estimated one-way transfer time
    pub transfer_time: f64,
    /// Peer's clock at the moment of `t3`
    pub true_time: f64,
    /// Correction to add to the emulator clock origin
    pub delta: f64,
}

impl SyncTimestamps {
    /// Compute the clock correction.
    #[must_use]
    pub fn compute(&self) -> SyncOutcome {
        let time_spent_on_network = self.t3 - self.t0 - (self.t2 - self.t1);
        let transfer_time = time_spent_on_network / 2.0;
        let true_time = self.t2 + transfer_time;
        let delta = true_time - self.t3;

        SyncOutcome { time_spent_on_network, transfer_time, true_time, delta }
    }
}

/// Split a clock-server payload at its midpoint and parse `(t1, t2)`.
///
/// Each half is trimmed of whitespace, NUL, `,` and `;` before parsing.
///
/// # Errors
///
/// Returns an error if the payload is empty or either half is not a
/// finite number.
pub fn parse_server_timestamps(payload: &[u8]) -> Result<(f64, f64), ProtocolError> {
    if payload.is_empty() {
        return Err(ProtocolError::EmptySyncPayload);
    }

    let mid = payload.len() / 2;
    let t1 = parse_timestamp(&payload[..mid]).ok_or(ProtocolError::InvalidTimestamp { half: 0 })?;
    let t2 = parse_timestamp(&payload[mid..]).ok_or(ProtocolError::InvalidTimestamp { half: 1 })?;

    Ok((t1, t2))
}

fn parse_timestamp(bytes: &[u8]) -> Option<f64> {
    let text = core::str::from_utf8(bytes).ok()?;
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || matches!(c, '\0' | ',' | ';'));
    let value: f64 = trimmed.parse().ok()?;
    value.is_finite().then_some(value)
}
