//! The transport seam.

use crate::TransportResult;
use async_trait::async_trait;
use std::time::Duration;

/// Recommended bound on a single `receive` call.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// One subscribe endpoint and one publish endpoint of the relay.
///
/// Implementations do no filtering and no decoding: payloads are opaque strings.
#[async_trait]
pub trait Transport: Send {
    /// Wait at most `timeout` for one payload.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Must never block past
    /// the timeout and must be safe to cancel.
    async fn receive(&mut self, timeout: Duration) -> TransportResult<Option<String>>;

    /// Publish one payload. Fire-and-forget: relay receipt is not confirmed.
    async fn send(&mut self, payload: &str) -> TransportResult<()>;

    /// Release the endpoints. Called once, after the poll loop has exited.
    async fn close(&mut self) -> TransportResult<()> {
        Ok(())
    }
}
