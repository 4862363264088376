//! Handler results.

use thiserror::Error;

/// Why a command ended in a terminal `ERROR`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// No handler registered under this name
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A required argument was empty
    #[error("Missing {name}")]
    MissingArgument { name: &'static str },

    /// An argument could not be converted
    #[error("Invalid {name}: '{value}' (expected {expected})")]
    InvalidArgument {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    /// An enum-like argument named no known option
    #[error("Unknown {name}: '{value}'. Valid: {}", .valid.join(", "))]
    InvalidChoice {
        name: &'static str,
        value: String,
        valid: Vec<&'static str>,
    },

    /// The handler ran and failed
    #[error("{0}")]
    Failed(String),

    /// The handler panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Successful handler outcome, carried by the terminal `ACK`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// Human-readable description of what was applied.
    pub message: String,
    /// Optional structured payload.
    pub data: Option<serde_json::Value>,
}

impl CommandOutcome {
    /// Outcome with a message only.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    /// Attach a structured payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// What every handler returns.
pub type CommandResult = Result<CommandOutcome, CommandError>;
