//! Clock sources for the emulator.
//!
//! The emulator reads time through the [`Clock`] trait so tests can drive
//! SD-log elapsed times and clock-sync timestamps explicitly.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::time::Instant;

/// A monotonic millisecond clock.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;
}

/// Monotonic clock backed by [`tokio::time::Instant`].
///
/// Follows Tokio's paused test time when the runtime is paused.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `ms`.
    #[must_use]
    pub fn at(ms: f64) -> Self {
        let clock = Self::default();
        clock.set_ms(ms);
        clock
    }

    /// Set the current reading.
    pub fn set_ms(&self, ms: f64) {
        self.bits.store(ms.to_bits(), Ordering::SeqCst);
    }

    /// Move the clock forward by `ms`.
    pub fn advance_ms(&self, ms: f64) {
        self.set_ms(self.now_ms() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::at(5.0);
        let other = clock.clone();
        other.advance_ms(2.5);
        assert_eq!(clock.now_ms(), 7.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_clock_follows_paused_time() {
        let clock = MonotonicClock::new();
        tokio::time::advance(Duration::from_millis(40)).await;
        assert!((clock.now_ms() - 40.0).abs() < 1e-6);
    }
}
