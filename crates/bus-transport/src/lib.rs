//! Transport adapters for the viewer command bus.
//!
//! This crate provides:
//! - `Transport`: the receive/send seam the poll loop drives
//! - `TcpTransport`: newline-delimited JSON over one subscribe and one publish connection
//! - `MemoryRelay`: an in-process star relay for tests and embedded setups
//! - `TcpRelay`: a dumb rebroadcasting relay for local development

mod error;
mod frames;
mod memory;
mod relay;
mod tcp;
mod transport;

pub use error::{TransportError, TransportResult};
pub use memory::{MemoryRelay, MemoryTransport};
pub use relay::TcpRelay;
pub use tcp::{TcpEndpoints, TcpTransport};
pub use transport::{Transport, DEFAULT_POLL_TIMEOUT};
