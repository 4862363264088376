//! Context-bound executor.
//!
//! Owner-bound requests cross from the I/O thread to the owner thread over an
//! unbounded channel. The owner thread drains it from its own loop and runs each
//! handler with exclusive access to the context.

use crate::{CommandError, CommandRegistry, Invocation, Responder};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// I/O-thread side of the handoff.
#[derive(Clone)]
pub(crate) struct OwnerHandoff {
    tx: mpsc::UnboundedSender<Responder>,
}

impl OwnerHandoff {
    /// Queue a request for the owner thread. Returns the responder if the
    /// owner side is gone.
    pub(crate) fn hand_off(&self, responder: Responder) -> Result<(), Responder> {
        self.tx.send(responder).map_err(|e| e.0)
    }
}

/// Owner-thread side of the handoff.
pub struct OwnerInbox<C> {
    rx: mpsc::UnboundedReceiver<Responder>,
    registry: Arc<CommandRegistry<C>>,
    disconnected: bool,
}

impl<C> OwnerInbox<C> {
    pub(crate) fn new(registry: Arc<CommandRegistry<C>>) -> (OwnerHandoff, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            OwnerHandoff { tx },
            Self {
                rx,
                registry,
                disconnected: false,
            },
        )
    }

    /// Run every queued request against `context`, in arrival order.
    ///
    /// Returns the number of requests executed. Never blocks.
    pub fn drain(&mut self, context: &mut C) -> usize {
        let mut executed = 0;
        loop {
            match self.rx.try_recv() {
                Ok(mut responder) => {
                    let result = {
                        let mut invocation = Invocation::live(&mut responder);
                        self.registry.execute_owner(context, &mut invocation)
                    };
                    debug!(
                        command = %responder.request().command(),
                        ok = result.is_ok(),
                        "Owner command executed"
                    );
                    responder.finish(result);
                    executed += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        executed
    }

    /// Whether the I/O thread has stopped handing off work.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl<C> Drop for OwnerInbox<C> {
    fn drop(&mut self) {
        self.rx.close();
        let mut abandoned = 0;
        while let Ok(mut responder) = self.rx.try_recv() {
            responder.fail(&CommandError::Failed("Owner thread stopped".to_string()));
            abandoned += 1;
        }
        if abandoned > 0 {
            warn!(abandoned, "Owner inbox dropped with queued commands");
        }
    }
}
