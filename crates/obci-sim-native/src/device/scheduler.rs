//! Stream scheduler: one cancellable repeating timer.
//!
//! At most one timer task exists at a time. Each start gets a new
//! generation number; a tick only runs while its generation is current,
//! so a stop followed by a start can never leave two timers emitting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Owner of the repeating sample timer.
#[derive(Debug)]
pub struct StreamScheduler {
    period: Duration,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl StreamScheduler {
    /// Create a stopped scheduler ticking every `period`.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self { period, generation: Arc::new(AtomicU64::new(0)), task: None }
    }

    /// Tick period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether a timer is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Whether `generation` belongs to the active timer.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Start the timer on `runtime`. No-op if already running.
    ///
    /// `tick` receives the timer's generation and returns `false` to end
    /// the timer from inside. The first tick fires one period after start.
    pub fn start<F>(&mut self, runtime: &Handle, mut tick: F)
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        if self.task.is_some() {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let period = self.period;

        debug!("Stream timer {} started ({:?})", generation, period);

        self.task = Some(runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if current.load(Ordering::SeqCst) != generation || !tick(generation) {
                    break;
                }
            }
        }));
    }

    /// Cancel the timer. No-op if not running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            // Invalidate first so a tick already past its await cannot pass the check
            let generation = self.generation.fetch_add(1, Ordering::SeqCst);
            task.abort();
            debug!("Stream timer {} stopped", generation);
        }
    }
}

impl Drop for StreamScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
