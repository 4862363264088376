//! Development relay.
//!
//! Publishers connect to the inbound port and write NDJSON lines; every line is
//! rebroadcast verbatim to every connection on the outbound port. No filtering,
//! no buffering for late joiners.

use crate::TransportResult;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Lines buffered per subscriber before it is considered lagging.
const BROADCAST_CAPACITY: usize = 1024;

/// Dumb star-topology relay over TCP.
pub struct TcpRelay {
    inbound: TcpListener,
    outbound: TcpListener,
    frames_tx: broadcast::Sender<String>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TcpRelay {
    /// Bind both listeners. Port 0 picks an ephemeral port.
    pub async fn bind(inbound_addr: &str, outbound_addr: &str) -> TransportResult<Self> {
        let inbound = TcpListener::bind(inbound_addr).await?;
        let outbound = TcpListener::bind(outbound_addr).await?;
        let (frames_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            inbound,
            outbound,
            frames_tx,
            shutdown_tx,
        })
    }

    /// Address publishers connect to.
    pub fn inbound_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.inbound.local_addr()?)
    }

    /// Address subscribers connect to.
    pub fn outbound_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.outbound.local_addr()?)
    }

    /// Get a shutdown sender.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Accept publishers and subscribers until shutdown.
    pub async fn run(&self) -> TransportResult<()> {
        info!(
            inbound = %self.inbound_addr()?,
            outbound = %self.outbound_addr()?,
            "Relay listening"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accepted = self.inbound.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "Publisher connected");
                            let frames_tx = self.frames_tx.clone();
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            tokio::spawn(pump_publisher(stream, frames_tx, shutdown_rx));
                        }
                        Err(e) => error!(error = %e, "Inbound accept error"),
                    }
                }
                accepted = self.outbound.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "Subscriber connected");
                            let frames_rx = self.frames_tx.subscribe();
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            tokio::spawn(feed_subscriber(stream, frames_rx, shutdown_rx));
                        }
                        Err(e) => error!(error = %e, "Outbound accept error"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Relay shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Read lines from one publisher and hand them to the broadcast channel.
async fn pump_publisher(
    stream: TcpStream,
    frames_tx: broadcast::Sender<String>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut lines = BufReader::new(stream).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            let _ = frames_tx.send(trimmed.to_string());
                        }
                    }
                    Ok(None) => {
                        debug!("Publisher disconnected");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Publisher read error");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

/// Write every broadcast line to one subscriber.
async fn feed_subscriber(
    mut stream: TcpStream,
    mut frames_rx: broadcast::Receiver<String>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let _ = stream.set_nodelay(true);

    loop {
        tokio::select! {
            frame = frames_rx.recv() => {
                match frame {
                    Ok(line) => {
                        let mut framed = line.into_bytes();
                        framed.push(b'\n');
                        if stream.write_all(&framed).await.is_err() {
                            debug!("Subscriber disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Subscriber lagged, frames dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TcpEndpoints, TcpTransport, Transport};
    use std::sync::Arc;
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(50);

    async fn start_relay() -> (Arc<TcpRelay>, TcpEndpoints) {
        let relay = Arc::new(TcpRelay::bind("127.0.0.1:0", "127.0.0.1:0").await.unwrap());
        let endpoints = TcpEndpoints::new(
            "127.0.0.1",
            relay.outbound_addr().unwrap().port(),
            relay.inbound_addr().unwrap().port(),
        );
        let runner = relay.clone();
        tokio::spawn(async move { runner.run().await });
        (relay, endpoints)
    }

    /// Publish until the line comes back; the relay only forwards to
    /// subscribers it has already accepted.
    async fn publish_until_seen(
        publisher: &mut TcpTransport,
        observer: &mut TcpTransport,
        payload: &str,
    ) -> bool {
        for _ in 0..40 {
            publisher.send(payload).await.unwrap();
            while let Some(line) = observer.receive(TICK).await.unwrap() {
                if line == payload {
                    return true;
                }
            }
        }
        false
    }

    #[tokio::test]
    async fn test_relay_rebroadcasts_to_all_subscribers() {
        let (relay, endpoints) = start_relay().await;
        let mut a = TcpTransport::connect(&endpoints).await.unwrap();
        let mut b = TcpTransport::connect(&endpoints).await.unwrap();

        assert!(publish_until_seen(&mut a, &mut b, r#"{"command":"ping"}"#).await);

        // The publisher hears its own message too.
        a.send("echo").await.unwrap();
        let mut heard = false;
        for _ in 0..40 {
            match a.receive(TICK).await.unwrap() {
                Some(line) if line == "echo" => {
                    heard = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(heard);

        relay.shutdown();
    }

    #[tokio::test]
    async fn test_relay_shutdown_stops_run() {
        let relay = TcpRelay::bind("127.0.0.1:0", "127.0.0.1:0").await.unwrap();
        let shutdown = relay.shutdown_sender();

        let handle = tokio::spawn(async move { relay.run().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = shutdown.send(());

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok());
    }
}
