//! Transport error types.

use thiserror::Error;

/// Transport error type.
#[derive(Error, Debug)]
pub enum TransportError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Inbound frame exceeded the size limit
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),
}

/// Result type alias using TransportError.
pub type TransportResult<T> = Result<T, TransportError>;
