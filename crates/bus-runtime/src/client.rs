//! Component client.
//!
//! Owns the I/O thread: a dedicated OS thread running a single-threaded tokio
//! runtime that polls the transport, dispatches inbound payloads and drains
//! the outbound queue. Everything else talks to it through channels.

use crate::dispatcher::Dispatcher;
use crate::{
    BusError, BusResult, CommandRegistry, DeliveryHook, OutboundDrain, OutboundQueue, OwnerInbox,
    PendingRequests,
};
use bus_envelope::{Envelope, Identity};
use bus_transport::{Transport, TransportResult, DEFAULT_POLL_TIMEOUT};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Configures and starts a `ComponentClient`.
pub struct ClientBuilder {
    identity: Identity,
    poll_timeout: Duration,
    send_received: bool,
    hook: Option<DeliveryHook>,
}

impl ClientBuilder {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            send_received: true,
            hook: None,
        }
    }

    /// Upper bound on one transport receive, and so on shutdown latency.
    pub fn poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Whether accepted requests get an immediate `RECEIVED` reply.
    pub fn send_received(mut self, send_received: bool) -> Self {
        self.send_received = send_received;
        self
    }

    /// Observe replies that no pending request claimed. Runs on the I/O thread.
    pub fn on_deliver<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Spawn the I/O thread, connect the transport on it, and start polling.
    ///
    /// `connect` runs inside the I/O thread's runtime so the transport's
    /// sockets belong to it. Returns once connected, or with the connect error.
    pub fn start<C, T, F, Fut>(
        self,
        registry: CommandRegistry<C>,
        connect: F,
    ) -> BusResult<(ComponentClient, OwnerInbox<C>)>
    where
        C: 'static,
        T: Transport + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = TransportResult<T>>,
    {
        let identity = Arc::new(self.identity);
        let registry = Arc::new(registry);
        let (outbound, drain) = OutboundQueue::new();
        let (handoff, inbox) = OwnerInbox::new(registry.clone());
        let pending = PendingRequests::new();

        let dispatcher = Dispatcher::new(
            identity.clone(),
            registry,
            outbound.clone(),
            Some(handoff),
            pending.clone(),
        )
        .with_hook(self.hook)
        .with_send_received(self.send_received);

        let running = Arc::new(AtomicBool::new(true));
        let loop_running = running.clone();
        let poll_timeout = self.poll_timeout;
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<BusResult<()>>(1);

        let io_thread = thread::Builder::new()
            .name("bus-io".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(BusError::Io(e)));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let transport = match connect().await {
                        Ok(transport) => transport,
                        Err(e) => {
                            let _ = ready_tx.send(Err(BusError::Transport(e)));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    poll_loop(transport, dispatcher, drain, loop_running, poll_timeout).await;
                });
            })?;

        let started = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(BusError::Startup("I/O thread exited".to_string())));
        if let Err(e) = started {
            running.store(false, Ordering::Release);
            let _ = io_thread.join();
            return Err(e);
        }

        info!(
            component = %identity.logical_address,
            instance = %identity.physical_address,
            "Component client started"
        );

        Ok((
            ComponentClient {
                identity,
                outbound,
                pending,
                running,
                sequence: AtomicI64::new(0),
                io_thread: Some(io_thread),
            },
            inbox,
        ))
    }
}

/// Handle on a running component.
pub struct ComponentClient {
    identity: Arc<Identity>,
    outbound: OutboundQueue,
    pending: PendingRequests,
    running: Arc<AtomicBool>,
    sequence: AtomicI64,
    io_thread: Option<JoinHandle<()>>,
}

impl ComponentClient {
    pub fn builder(identity: Identity) -> ClientBuilder {
        ClientBuilder::new(identity)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Producer handle for code that publishes without going through the client.
    pub fn outbound(&self) -> OutboundQueue {
        self.outbound.clone()
    }

    /// Whether the I/O thread is still polling.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self
                .io_thread
                .as_ref()
                .map(|handle| !handle.is_finished())
                .unwrap_or(false)
    }

    /// Build a request stamped with this component's sender, type and next sequence number.
    pub fn request(&self, logical_address: &str, physical_address: &str, command: &str) -> Envelope {
        Envelope::request(logical_address, physical_address, command)
            .with_sender(&self.identity.physical_address)
            .with_component_type(&self.identity.component_type)
            .with_sequence(self.sequence.fetch_add(1, Ordering::Relaxed))
    }

    /// Queue an envelope for publishing. Fire-and-forget.
    pub fn send(&self, envelope: Envelope) -> BusResult<()> {
        let envelope = if envelope.sender().is_empty() {
            envelope.with_sender(&self.identity.physical_address)
        } else {
            envelope
        };
        self.outbound.enqueue(envelope)
    }

    /// Publish a request and wait for its terminal reply.
    ///
    /// Must be awaited inside a tokio runtime. On timeout the request stops
    /// being tracked; a late reply goes to the delivery hook.
    pub async fn call(&self, envelope: Envelope, timeout: Duration) -> BusResult<Envelope> {
        let correlation_id = envelope.correlation_id().to_string();
        let rx = self.pending.register(&correlation_id);

        if let Err(e) = self.send(envelope) {
            self.pending.cancel(&correlation_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BusError::ReplyDropped(correlation_id)),
            Err(_) => {
                self.pending.cancel(&correlation_id);
                warn!(correlation_id = %correlation_id, ?timeout, "Request timed out");
                Err(BusError::Timeout {
                    correlation_id,
                    timeout,
                })
            }
        }
    }

    /// Stop the I/O thread. It drains the outbound queue once more, closes the
    /// transport and exits within one poll interval.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.io_thread.take() {
            if handle.join().is_err() {
                error!("I/O thread panicked");
            }
            info!(
                instance = %self.identity.physical_address,
                "Component client stopped"
            );
        }
    }
}

impl Drop for ComponentClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn poll_loop<C, T: Transport>(
    mut transport: T,
    dispatcher: Dispatcher<C>,
    mut drain: OutboundDrain,
    running: Arc<AtomicBool>,
    poll_timeout: Duration,
) {
    debug!("I/O loop started");

    while running.load(Ordering::Acquire) {
        match transport.receive(poll_timeout).await {
            Ok(Some(payload)) => {
                dispatcher.dispatch(&payload);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Receive failed");
                tokio::time::sleep(poll_timeout).await;
            }
        }
        flush(&mut transport, &mut drain).await;
    }

    let flushed = flush(&mut transport, &mut drain).await;
    debug!(flushed, "Final outbound drain");

    if let Err(e) = transport.close().await {
        warn!(error = %e, "Transport close failed");
    }
    debug!("I/O loop stopped");
}

/// Publish everything queued. Failures are logged and the envelope is dropped.
async fn flush<T: Transport>(transport: &mut T, drain: &mut OutboundDrain) -> usize {
    let mut sent = 0;
    for envelope in drain.drain() {
        let payload = match envelope.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, command = %envelope.command(), "Encode failed");
                continue;
            }
        };
        match transport.send(&payload).await {
            Ok(()) => sent += 1,
            Err(e) => warn!(error = %e, command = %envelope.command(), "Send failed"),
        }
    }
    sent
}
