//! Envelope error types.

use crate::{AckState, ReplyKind};
use thiserror::Error;

/// Envelope error type.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload decoded but carries no correlation id
    #[error("Missing correlation id")]
    MissingCorrelationId,

    /// Reply type tag not recognized
    #[error("Unknown reply type: {0}")]
    UnknownReplyKind(String),

    /// Reply not permitted in the current conversation state
    #[error("Reply {kind} not allowed after {from:?}")]
    InvalidTransition { from: AckState, kind: ReplyKind },
}

/// Result type alias using EnvelopeError.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;
