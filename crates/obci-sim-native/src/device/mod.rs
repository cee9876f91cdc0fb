//! The emulated board
//!
//! This module provides:
//! - [`emulator`]: The serial-port-shaped [`Simulator`] and its events
//! - [`dispatcher`]: Command dispatch against the board state
//! - [`scheduler`]: The cancellable sample timer
//! - [`clock_sync`]: Clock sync handshake and origin correction
//! - [`state`]: Board state
//! - [`error`]: Emulator errors
//!
//! # Example
//!
//! ```rust,no_run
//! use obci_sim_native::device::{Simulator, SimulatorEvent};
//! use obci_sim_native::SimulatorConfig;
//!
//! # async fn demo() -> Result<(), obci_sim_native::SimulatorError> {
//! let mut sim = Simulator::open("OpenBCISimulator", SimulatorConfig::default());
//! assert_eq!(sim.next_event().await, Some(SimulatorEvent::Open));
//!
//! sim.write(b"b")?;
//! while let Some(SimulatorEvent::Data(frame)) = sim.next_event().await {
//!     // 33-byte sample frames every 4 ms
//!     # let _ = frame;
//!     # break;
//! }
//! sim.close()?;
//! # Ok(())
//! # }
//! ```

pub mod clock_sync;
pub mod dispatcher;
pub mod emulator;
pub mod error;
pub mod scheduler;
pub mod state;

pub use clock_sync::ClockSyncEngine;
pub use dispatcher::{dispatch, DispatchContext, DispatchOutcome, StreamControl};
pub use emulator::{Simulator, SimulatorEvent, OPEN_DELAY, SYNC_SENT_DELAY};
pub use error::{SimulatorError, SimulatorResult, SyncError};
pub use scheduler::StreamScheduler;
pub use state::{DeviceState, SdLogState};
