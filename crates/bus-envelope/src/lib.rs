//! Wire data model for the viewer command bus.
//!
//! This crate provides:
//! - `Envelope`: one message unit (request or reply) with addressing and correlation
//! - `ReplyKind` / `AckState`: reply kinds and the per-conversation acknowledgment state machine
//! - `Identity`: the logical/physical address pair a component answers to

mod addressing;
mod envelope;
mod error;
mod reply;

pub use addressing::{Addressing, Identity};
pub use envelope::{Envelope, DEFAULT_COMPONENT_TYPE};
pub use error::{EnvelopeError, EnvelopeResult};
pub use reply::{AckState, ReplyKind};
