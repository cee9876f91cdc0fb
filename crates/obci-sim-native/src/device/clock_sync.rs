//! Clock sync engine: handshake state and clock origin correction.
//!
//! The emulator's device time is `monotonic + origin`. A completed handshake
//! adds the estimated `delta` to the origin.

use obci_sim_core::sync::{parse_server_timestamps, SyncOutcome, SyncTimestamps};

use super::error::SyncError;

/// Handshake state and accumulated clock correction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClockSyncEngine {
    /// `t0` of the handshake in progress
    pending_t0: Option<f64>,
    /// Correction added to the monotonic clock (ms)
    origin_ms: f64,
    /// Timestamps of the last completed handshake
    last: Option<SyncTimestamps>,
}

impl ClockSyncEngine {
    /// Create an engine with zero correction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock origin correction in ms.
    #[must_use]
    pub fn origin_ms(&self) -> f64 {
        self.origin_ms
    }

    /// Device time for a monotonic reading.
    #[must_use]
    pub fn device_time_ms(&self, monotonic_ms: f64) -> f64 {
        monotonic_ms + self.origin_ms
    }

    /// Whether a handshake is waiting for server data.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending_t0.is_some()
    }

    /// Timestamps of the last completed handshake.
    #[must_use]
    pub fn last_exchange(&self) -> Option<&SyncTimestamps> {
        self.last.as_ref()
    }

    /// Start a handshake at device time `t0`, replacing any pending one.
    pub fn begin(&mut self, t0: f64) {
        self.pending_t0 = Some(t0);
    }

    /// Finish the handshake with the server payload received at `t3`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoPendingSync`] without a preceding [`begin`],
    /// or [`SyncError::Payload`] if the timestamps cannot be parsed. The
    /// origin is unchanged on error; a pending handshake survives a bad
    /// payload.
    ///
    /// [`begin`]: Self::begin
    pub fn complete(&mut self, t3: f64, payload: &[u8]) -> Result<SyncOutcome, SyncError> {
        let t0 = self.pending_t0.ok_or(SyncError::NoPendingSync)?;
        let (t1, t2) = parse_server_timestamps(payload)?;

        let timestamps = SyncTimestamps { t0, t1, t2, t3 };
        Ok(self.apply(timestamps))
    }

    /// Apply a full set of timestamps directly.
    pub fn apply(&mut self, timestamps: SyncTimestamps) -> SyncOutcome {
        let outcome = timestamps.compute();
        self.origin_ms += outcome.delta;
        self.pending_t0 = None;
        self.last = Some(timestamps);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obci_sim_core::ProtocolError;

    #[test]
    fn test_apply_reference_exchange() {
        let mut engine = ClockSyncEngine::new();
        let outcome = engine.apply(SyncTimestamps { t0: 0.0, t1: 100.0, t2: 150.0, t3: 300.0 });

        assert_eq!(outcome.delta, -25.0);
        assert_eq!(engine.origin_ms(), -25.0);
        assert_eq!(engine.device_time_ms(1000.0), 975.0);
    }

    #[test]
    fn test_complete_handshake() {
        let mut engine = ClockSyncEngine::new();
        engine.begin(0.0);
        assert!(engine.is_pending());

        let outcome = engine.complete(300.0, b"100.0,150.0,").unwrap();
        assert_eq!(outcome.true_time, 275.0);
        assert_eq!(engine.origin_ms(), -25.0);
        assert!(!engine.is_pending());
        assert_eq!(engine.last_exchange().map(|t| t.t3), Some(300.0));
    }

    #[test]
    fn test_corrections_accumulate() {
        let mut engine = ClockSyncEngine::new();
        engine.apply(SyncTimestamps { t0: 0.0, t1: 100.0, t2: 150.0, t3: 300.0 });
        engine.apply(SyncTimestamps { t0: 0.0, t1: 100.0, t2: 150.0, t3: 300.0 });
        assert_eq!(engine.origin_ms(), -50.0);
    }

    #[test]
    fn test_complete_without_begin_is_rejected() {
        let mut engine = ClockSyncEngine::new();
        assert_eq!(engine.complete(10.0, b"1.0,2.0,"), Err(SyncError::NoPendingSync));
        assert_eq!(engine.origin_ms(), 0.0);
    }

    #[test]
    fn test_bad_payload_keeps_handshake_pending() {
        let mut engine = ClockSyncEngine::new();
        engine.begin(5.0);
        assert_eq!(
            engine.complete(10.0, b""),
            Err(SyncError::Payload(ProtocolError::EmptySyncPayload))
        );
        assert!(engine.is_pending());
        assert_eq!(engine.origin_ms(), 0.0);
    }
}
