//! Outstanding requests awaiting a terminal reply.

use bus_envelope::Envelope;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::debug;

struct Pending {
    issued_at: Instant,
    waiter: oneshot::Sender<Envelope>,
}

/// Correlation id to waiter. Cheap to clone.
#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<HashMap<String, Pending>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start waiting for the terminal reply to `correlation_id`.
    pub fn register(&self, correlation_id: &str) -> oneshot::Receiver<Envelope> {
        let (waiter, rx) = oneshot::channel();
        self.lock().insert(
            correlation_id.to_string(),
            Pending {
                issued_at: Instant::now(),
                waiter,
            },
        );
        rx
    }

    /// Hand a terminal reply to its waiter. Returns false if nobody was waiting
    /// or the reply is not terminal.
    pub fn complete(&self, reply: &Envelope) -> bool {
        if !reply.is_terminal() {
            return false;
        }
        let Some(pending) = self.lock().remove(reply.correlation_id()) else {
            return false;
        };

        debug!(
            correlation_id = %reply.correlation_id(),
            elapsed_ms = pending.issued_at.elapsed().as_millis() as u64,
            "Request completed"
        );
        pending.waiter.send(reply.clone()).is_ok()
    }

    /// Stop waiting for `correlation_id`.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        self.lock().remove(correlation_id).is_some()
    }

    /// Drop waiters older than `max_age`. Returns how many were dropped.
    pub fn expire(&self, max_age: Duration) -> usize {
        let mut pending = self.lock();
        let before = pending.len();
        pending.retain(|_, entry| entry.issued_at.elapsed() < max_age);
        before - pending.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
