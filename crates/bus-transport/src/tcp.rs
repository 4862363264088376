//! TCP transport: one subscribe connection, one publish connection.

use crate::frames::LineBuffer;
use crate::{Transport, TransportError, TransportResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Relay endpoints a component connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpEndpoints {
    /// Relay host.
    pub host: String,
    /// Relay broadcast-out port (we subscribe here).
    pub subscribe_port: u16,
    /// Relay broadcast-in port (we publish here).
    pub publish_port: u16,
}

impl TcpEndpoints {
    pub fn new(host: &str, subscribe_port: u16, publish_port: u16) -> Self {
        Self {
            host: host.to_string(),
            subscribe_port,
            publish_port,
        }
    }

    pub fn subscribe_addr(&self) -> String {
        format!("{}:{}", self.host, self.subscribe_port)
    }

    pub fn publish_addr(&self) -> String {
        format!("{}:{}", self.host, self.publish_port)
    }
}

/// Newline-delimited JSON over TCP.
pub struct TcpTransport {
    subscriber: TcpStream,
    publisher: TcpStream,
    frames: LineBuffer,
    subscribe_closed: bool,
}

impl TcpTransport {
    /// Connect both endpoints.
    pub async fn connect(endpoints: &TcpEndpoints) -> TransportResult<Self> {
        let subscriber = TcpStream::connect(endpoints.subscribe_addr())
            .await
            .map_err(|e| {
                TransportError::Connection(format!(
                    "Failed to connect subscribe endpoint {}: {}",
                    endpoints.subscribe_addr(),
                    e
                ))
            })?;
        let publisher = TcpStream::connect(endpoints.publish_addr())
            .await
            .map_err(|e| {
                TransportError::Connection(format!(
                    "Failed to connect publish endpoint {}: {}",
                    endpoints.publish_addr(),
                    e
                ))
            })?;
        publisher.set_nodelay(true)?;

        info!(
            subscribe = %endpoints.subscribe_addr(),
            publish = %endpoints.publish_addr(),
            "Connected to relay"
        );

        Ok(Self {
            subscriber,
            publisher,
            frames: LineBuffer::default(),
            subscribe_closed: false,
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn receive(&mut self, timeout: Duration) -> TransportResult<Option<String>> {
        if let Some(line) = self.frames.next_line() {
            return Ok(Some(line));
        }

        // No reconnect: a dead subscription just idles for the poll interval.
        if self.subscribe_closed {
            tokio::time::sleep(timeout).await;
            return Ok(None);
        }

        let mut chunk = [0u8; 8192];
        match tokio::time::timeout(timeout, self.subscriber.read(&mut chunk)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => {
                warn!("Relay closed the subscribe stream");
                self.subscribe_closed = true;
                Ok(None)
            }
            Ok(Ok(n)) => {
                self.frames.extend(&chunk[..n])?;
                Ok(self.frames.next_line())
            }
            Ok(Err(e)) => {
                self.subscribe_closed = true;
                Err(e.into())
            }
        }
    }

    async fn send(&mut self, payload: &str) -> TransportResult<()> {
        self.publisher.write_all(payload.as_bytes()).await?;
        self.publisher.write_all(b"\n").await?;
        self.publisher.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> TransportResult<()> {
        let _ = self.publisher.shutdown().await;
        let _ = self.subscriber.shutdown().await;
        debug!("Relay connections closed");
        Ok(())
    }
}
