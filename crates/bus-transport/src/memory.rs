//! In-process star relay.
//!
//! Every payload published by any attached transport is delivered to every
//! attached transport, including the publisher, exactly like the TCP relay.

use crate::{Transport, TransportResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;

/// Default number of payloads buffered per subscriber.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process relay handle. Cheap to clone.
#[derive(Clone)]
pub struct MemoryRelay {
    tx: broadcast::Sender<String>,
}

impl MemoryRelay {
    /// Create a relay with the default per-subscriber buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a relay buffering up to `capacity` payloads per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attach a new transport.
    pub fn connect(&self) -> MemoryTransport {
        MemoryTransport {
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }

    /// Publish a raw payload as an anonymous sender.
    pub fn publish(&self, payload: &str) {
        // No subscribers is not an error for a relay.
        let _ = self.tx.send(payload.to_string());
    }

    /// Observe all traffic without publishing.
    pub fn tap(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport attached to a `MemoryRelay`.
pub struct MemoryTransport {
    tx: broadcast::Sender<String>,
    rx: broadcast::Receiver<String>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn receive(&mut self, timeout: Duration) -> TransportResult<Option<String>> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Err(_) => Ok(None),
            Ok(Ok(payload)) => Ok(Some(payload)),
            Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                warn!(skipped, "Memory relay subscriber lagged, payloads dropped");
                Ok(None)
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn send(&mut self, payload: &str) -> TransportResult<()> {
        let _ = self.tx.send(payload.to_string());
        Ok(())
    }
}
