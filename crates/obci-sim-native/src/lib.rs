//! OpenBCI Simulator Native - Host-side board emulator
//!
//! This crate runs the simulated OpenBCI V3 board on Tokio:
//! - Command dispatch with the board's text responses
//! - Timed sample streaming in the binary frame format
//! - Clock sync handshake with origin correction
//! - A serial-port-shaped surface with ordered events
//!
//! # Modules
//!
//! - [`device`]: The emulator, dispatcher, scheduler, and board state
//! - [`config`]: Options loading and resolution
//! - [`clock`]: Monotonic and manual clock sources

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod clock;
pub mod config;
pub mod device;

// Re-export key types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, ConfigResult, SimulatorConfig, SimulatorOptions};
pub use device::{DeviceState, Simulator, SimulatorError, SimulatorEvent, SimulatorResult};
