//! Device emulator: the serial-port-shaped surface of the simulated board.
//!
//! A [`Simulator`] accepts writes like a serial port and delivers responses
//! through an ordered event channel. Text responses, sample frames, and
//! lifecycle notifications all flow through [`SimulatorEvent`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use obci_sim_core::protocol::{cmd, encode_sample, PACKET_SIZE, SIMULATOR_PORT_NAME};
use obci_sim_core::sync::SyncTimestamps;
use obci_sim_core::synth::SampleSynthesizer;

use super::clock_sync::ClockSyncEngine;
use super::dispatcher::{dispatch, DispatchContext, StreamControl};
use super::error::{SimulatorError, SimulatorResult};
use super::scheduler::StreamScheduler;
use super::state::DeviceState;
use crate::clock::{Clock, MonotonicClock};
use crate::config::SimulatorConfig;

/// Delay between `open` and the open (or error) notification.
pub const OPEN_DELAY: Duration = Duration::from_millis(200);

/// Delay between a sync-time-set and the sync-sent token.
pub const SYNC_SENT_DELAY: Duration = Duration::from_millis(10);

// ============================================================================
// Events
// ============================================================================

/// Notification from the emulated board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimulatorEvent {
    /// Port opened; writes are now accepted
    Open,
    /// One complete response: a framed text reply, a sample frame, or the
    /// sync-sent token
    Data(Vec<u8>),
    /// Port closed
    Close,
    /// Port failed to open
    Error(SimulatorError),
}

// ============================================================================
// Shared State
// ============================================================================

#[derive(Debug)]
struct Inner {
    config: SimulatorConfig,
    state: DeviceState,
    sync: ClockSyncEngine,
    synth: SampleSynthesizer,
    rng: StdRng,
    clock: Arc<dyn Clock>,
    scheduler: StreamScheduler,
    events: mpsc::UnboundedSender<SimulatorEvent>,
    open_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl Inner {
    fn device_time_ms(&self) -> f64 {
        self.sync.device_time_ms(self.clock.now_ms())
    }

    fn emit(&self, event: SimulatorEvent) {
        // Receiver dropped means nobody is listening; nothing to do
        let _ = self.events.send(event);
    }

    /// Emit one sample frame for the timer of `generation`.
    fn emit_sample(&mut self, generation: u64) -> bool {
        if !self.scheduler.is_current(generation) || !self.state.streaming {
            return false;
        }

        let record = self.synth.synthesize(self.state.samples_emitted, &mut self.rng);
        let mut frame = [0u8; PACKET_SIZE];
        match encode_sample(&record, self.state.sample_number, &mut frame) {
            Ok(size) => self.emit(SimulatorEvent::Data(frame[..size].to_vec())),
            Err(e) => {
                warn!("Failed to encode sample {}: {}", self.state.samples_emitted, e);
                return false;
            }
        }

        self.state.advance_sample();
        true
    }

    fn stop_stream(&mut self) {
        if self.scheduler.is_running() {
            self.scheduler.stop();
            info!("Stream stopped after {} samples", self.state.samples_emitted);
        }
        self.state.streaming = false;
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Simulator
// ============================================================================

/// Emulated OpenBCI V3 board.
///
/// Must be created inside a Tokio runtime; timers run on that runtime.
#[derive(Debug)]
pub struct Simulator {
    port: String,
    inner: Arc<Mutex<Inner>>,
    events: mpsc::UnboundedReceiver<SimulatorEvent>,
    runtime: Handle,
}

impl Simulator {
    /// Open the simulator on `port` with the monotonic clock.
    ///
    /// Opening completes after [`OPEN_DELAY`] with [`SimulatorEvent::Open`],
    /// or [`SimulatorEvent::Error`] if `port` is not the simulator port or a
    /// serial port failure is configured.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn open(port: impl Into<String>, config: SimulatorConfig) -> Self {
        Self::with_clock(port, config, Arc::new(MonotonicClock::new()))
    }

    /// Open the simulator with an explicit clock source.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn with_clock(port: impl Into<String>, config: SimulatorConfig, clock: Arc<dyn Clock>) -> Self {
        let port = port.into();
        let runtime = Handle::current();
        let (tx, rx) = mpsc::unbounded_channel();

        let failure = if port != SIMULATOR_PORT_NAME {
            Some(SimulatorError::PortNotOpen { port: port.clone() })
        } else if config.serial_port_failure {
            Some(SimulatorError::SerialPortFailure)
        } else {
            None
        };

        let rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        let inner = Arc::new(Mutex::new(Inner {
            state: DeviceState::new(&config),
            sync: ClockSyncEngine::new(),
            synth: SampleSynthesizer::new(config.synth_config()),
            rng,
            clock,
            scheduler: StreamScheduler::new(config.tick_period()),
            events: tx,
            open_task: None,
            closed: false,
            config,
        }));

        debug!("Opening simulator on {}", port);

        let weak = Arc::downgrade(&inner);
        let task = runtime.spawn(async move {
            tokio::time::sleep(OPEN_DELAY).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut guard = lock(&inner);
            guard.open_task = None;
            if guard.closed {
                return;
            }
            match failure {
                Some(e) => {
                    warn!("Simulator failed to open: {}", e);
                    guard.emit(SimulatorEvent::Error(e));
                }
                None => {
                    guard.state.connected = true;
                    info!("Simulator connected");
                    guard.emit(SimulatorEvent::Open);
                }
            }
        });
        lock(&inner).open_task = Some(task);

        Self { port, inner, events: rx, runtime }
    }

    /// Port identifier this simulator was opened with.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Write a command to the board.
    ///
    /// Responses arrive as events. A simulated board failure is reported in
    /// the response text; the write itself still succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::NotConnected`] before the port has opened
    /// or after it has closed.
    pub fn write(&self, data: &[u8]) -> SimulatorResult<()> {
        let mut guard = lock(&self.inner);
        if !guard.state.connected {
            warn!("Write refused, simulator not connected: {:02X?}", data);
            return Err(SimulatorError::NotConnected);
        }

        let monotonic_ms = guard.clock.now_ms();
        let now_ms = guard.sync.device_time_ms(monotonic_ms);
        let inner = &mut *guard;
        let outcome = dispatch(
            DispatchContext {
                state: &mut inner.state,
                sync: &mut inner.sync,
                now_ms,
                monotonic_ms,
                rng: &mut inner.rng,
                verbose: inner.config.verbose,
            },
            data,
        );

        for response in outcome.responses {
            inner.emit(SimulatorEvent::Data(response));
        }

        match outcome.stream {
            Some(StreamControl::Start) => self.start_stream(inner),
            Some(StreamControl::Stop) => inner.stop_stream(),
            None => {}
        }

        if outcome.sync_sent {
            self.schedule_sync_sent();
        }

        Ok(())
    }

    fn start_stream(&self, inner: &mut Inner) {
        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        inner.scheduler.start(&self.runtime, move |generation| match weak.upgrade() {
            Some(inner) => {
                let mut guard = lock(&inner);
                guard.emit_sample(generation)
            }
            None => false,
        });
        info!(
            "Stream started at {} Hz ({:?} per sample)",
            inner.state.sample_rate,
            inner.scheduler.period()
        );
    }

    fn schedule_sync_sent(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.runtime.spawn(async move {
            tokio::time::sleep(SYNC_SENT_DELAY).await;
            if let Some(inner) = weak.upgrade() {
                let guard = lock(&inner);
                if guard.state.connected {
                    guard.emit(SimulatorEvent::Data(vec![cmd::SYNC_TIME_SENT]));
                }
            }
        });
    }

    /// Close the port.
    ///
    /// Stops streaming and cancels a pending open. Emits
    /// [`SimulatorEvent::Close`] if the port was open; no data follows.
    ///
    /// # Errors
    ///
    /// Currently infallible; the result mirrors a serial port's close.
    pub fn close(&self) -> SimulatorResult<()> {
        let mut guard = lock(&self.inner);
        if let Some(task) = guard.open_task.take() {
            task.abort();
        }
        guard.stop_stream();
        guard.closed = true;

        if guard.state.connected {
            guard.state.connected = false;
            info!("Simulator closed");
            guard.emit(SimulatorEvent::Close);
        }
        Ok(())
    }

    /// Accepted for serial port parity; writes are never buffered.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn flush(&self) -> SimulatorResult<()> {
        Ok(())
    }

    /// Accepted for serial port parity; writes are never buffered.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn drain(&self) -> SimulatorResult<()> {
        Ok(())
    }

    /// Wait for the next event. `None` once the simulator is gone.
    pub async fn next_event(&mut self) -> Option<SimulatorEvent> {
        self.events.recv().await
    }

    /// Take the next event if one is ready.
    pub fn try_next_event(&mut self) -> Option<SimulatorEvent> {
        self.events.try_recv().ok()
    }

    /// Snapshot of the board state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        lock(&self.inner).state.clone()
    }

    /// Current clock origin correction in ms.
    #[must_use]
    pub fn clock_origin_ms(&self) -> f64 {
        lock(&self.inner).sync.origin_ms()
    }

    /// Timestamps of the last completed clock sync.
    #[must_use]
    pub fn last_sync_exchange(&self) -> Option<SyncTimestamps> {
        lock(&self.inner).sync.last_exchange().copied()
    }

    /// Current device time in ms (monotonic clock plus origin).
    #[must_use]
    pub fn device_time_ms(&self) -> f64 {
        lock(&self.inner).device_time_ms()
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        let mut guard = lock(&self.inner);
        if let Some(task) = guard.open_task.take() {
            task.abort();
        }
        guard.stop_stream();
    }
}
