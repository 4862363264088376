//! Outbound queue.

use crate::{BusError, BusResult};
use bus_envelope::Envelope;
use tokio::sync::mpsc;

/// Producer side of the outbound queue. Cheap to clone; usable from any thread.
#[derive(Clone)]
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<Envelope>,
}

/// Consumer side of the outbound queue, owned by the I/O thread.
pub struct OutboundDrain {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl OutboundQueue {
    /// Create a queue and its single consumer.
    pub fn new() -> (Self, OutboundDrain) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, OutboundDrain { rx })
    }

    /// Append an envelope. Never blocks.
    pub fn enqueue(&self, envelope: Envelope) -> BusResult<()> {
        self.tx.send(envelope).map_err(|_| BusError::QueueClosed)
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl OutboundDrain {
    /// Take everything queued right now, oldest first.
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut batch = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            batch.push(envelope);
        }
        batch
    }

    /// Take the next queued envelope, if any.
    pub fn try_next(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}
