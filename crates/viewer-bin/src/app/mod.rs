//! Subcommand implementations.

mod relay;
mod send;
mod serve;

pub use relay::relay;
pub use send::{send, SendRequest};
pub use serve::serve;
