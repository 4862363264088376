//! Bus runtime error types.

use bus_envelope::EnvelopeError;
use bus_transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Bus runtime error type.
#[derive(Error, Debug)]
pub enum BusError {
    /// Envelope encode/decode error
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The I/O thread is gone and nothing drains the outbound queue
    #[error("Outbound queue closed")]
    QueueClosed,

    /// No terminal reply arrived in time
    #[error("Timed out after {timeout:?} waiting for reply to {correlation_id}")]
    Timeout {
        correlation_id: String,
        timeout: Duration,
    },

    /// The pending request was discarded before a reply arrived
    #[error("Reply channel closed for {0}")]
    ReplyDropped(String),

    /// The I/O thread could not be started
    #[error("Startup failed: {0}")]
    Startup(String),
}

/// Result type alias using BusError.
pub type BusResult<T> = Result<T, BusError>;
