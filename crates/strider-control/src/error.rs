//! Control-layer error types.

use strider_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the bus transport collaborator.
///
/// The core never retries a failed transmission; a frame either left
/// for the transport or it did not, and delivery is the transport's
/// problem from there.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Transmit queue of the underlying driver is full.
    #[error("Transmit queue full")]
    QueueFull,

    /// Bus is in an error state (bus-off, controller fault).
    #[error("Bus unavailable: {0}")]
    BusUnavailable(String),

    /// Transport-specific IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Control core error type.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Frame decode failure on the feedback path.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Rejected configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
