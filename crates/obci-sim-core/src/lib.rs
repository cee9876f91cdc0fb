//! OpenBCI Simulator Core - `no_std` compatible protocol and signal model
//!
//! This crate holds everything about the emulated board that needs no I/O
//! and no clock: command bytes, response texts, sample synthesis, the
//! binary sample frame, and the clock-sync estimate.
//!
//! # Modules
//!
//! - [`types`]: Board constants, firmware/line-noise enums, sample records
//! - [`error`]: Protocol errors
//! - [`protocol`]: Command parsing, response texts, sample frame codec
//! - [`synth`]: Stateless multichannel sample synthesizer
//! - [`sync`]: Four-timestamp clock offset estimate
//!
//! # Features
//!
//! - `std`: Enable standard library support (default)
//!
//! # Example
//!
//! ```rust
//! use obci_sim_core::protocol::{encode_sample, PACKET_SIZE};
//! use obci_sim_core::synth::SampleSynthesizer;
//! use obci_sim_core::types::SynthConfig;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let synth = SampleSynthesizer::new(SynthConfig::default());
//! let record = synth.synthesize(0, &mut StdRng::seed_from_u64(42));
//!
//! let mut frame = [0u8; PACKET_SIZE];
//! let size = encode_sample(&record, 0, &mut frame).unwrap();
//! assert_eq!(size, PACKET_SIZE);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod protocol;
pub mod sync;
pub mod synth;
pub mod types;

// Re-export commonly used types at crate root
pub use error::ProtocolError;
pub use protocol::{Command, RawSample, SdLogDuration, PACKET_SIZE, TERMINATOR};
pub use sync::{SyncOutcome, SyncTimestamps};
pub use synth::SampleSynthesizer;
pub use types::{FirmwareVersion, LineNoise, SampleRecord, SynthConfig};
