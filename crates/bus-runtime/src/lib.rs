//! Dispatch runtime for the viewer command bus.
//!
//! This crate provides:
//! - `OutboundQueue`: multi-producer FIFO drained by the I/O thread
//! - `CommandRegistry`: command name to handler, inline or owner-bound
//! - `Dispatcher`: filters and routes inbound payloads
//! - `OwnerInbox`: the owner-thread side of the context-bound executor
//! - `ComponentClient`: composition root owning the I/O thread

mod client;
mod command;
mod dispatcher;
mod error;
mod executor;
mod outbound;
pub mod params;
mod pending;
mod registry;
mod responder;

pub use bus_envelope::{AckState, Addressing, Envelope, Identity, ReplyKind};
pub use client::{ClientBuilder, ComponentClient};
pub use command::{CommandError, CommandOutcome, CommandResult};
pub use dispatcher::{DeliveryHook, Disposition};
pub use error::{BusError, BusResult};
pub use executor::OwnerInbox;
pub use outbound::{OutboundDrain, OutboundQueue};
pub use pending::PendingRequests;
pub use registry::{Binding, CommandRegistry, Invocation};
pub use responder::Responder;
