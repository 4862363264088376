//! Configuration, paths and logging for viewer bus components.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_LOG_LEVEL, DEFAULT_PUBLISH_PORT, DEFAULT_SUBSCRIBE_PORT};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
