//! Emulator error types.

use thiserror::Error;

use obci_sim_core::ProtocolError;

/// Transport-level errors surfaced by the emulator.
///
/// A simulated board failure is not an error: it is delivered as ordinary
/// response data while the write itself succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatorError {
    /// Port identifier does not name the simulator
    #[error("Serialport not open: {port}")]
    PortNotOpen {
        /// Requested port identifier
        port: String,
    },

    /// Port open failure was configured
    #[error("Simulated serial port failure")]
    SerialPortFailure,

    /// Write attempted while not connected
    #[error("Simulator is not connected")]
    NotConnected,
}

/// Result type for emulator operations.
pub type SimulatorResult<T> = Result<T, SimulatorError>;

/// Reasons a clock-sync completion was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Server data arrived without a preceding sync-time-set
    #[error("No clock sync in progress")]
    NoPendingSync,

    /// Server payload could not be parsed
    #[error("Bad clock sync payload: {0}")]
    Payload(#[from] ProtocolError),
}
