//! Command registry.
//!
//! Built once at startup, then shared read-only between the I/O thread and the
//! owner thread.

use crate::{CommandError, CommandResult, Responder};
use bus_envelope::Envelope;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Handler that runs on the I/O thread and touches no owner state.
pub type InlineHandler = Box<dyn Fn(&mut Invocation<'_>) -> CommandResult + Send + Sync>;

/// Handler that runs on the owner thread with exclusive access to `C`.
pub type OwnerHandler<C> = Box<dyn Fn(&mut C, &mut Invocation<'_>) -> CommandResult + Send + Sync>;

/// Where a command executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// On the I/O thread, immediately.
    Inline,
    /// Handed off to the owner thread.
    Owner,
}

enum Handler<C> {
    Inline(InlineHandler),
    Owner(OwnerHandler<C>),
}

/// The request a handler is working on.
pub struct Invocation<'a> {
    target: Target<'a>,
}

enum Target<'a> {
    Detached(&'a Envelope),
    Live(&'a mut Responder),
}

impl<'a> Invocation<'a> {
    /// Invocation that publishes progress through `responder`.
    pub fn live(responder: &'a mut Responder) -> Self {
        Self {
            target: Target::Live(responder),
        }
    }

    /// Invocation with nowhere to publish; progress is discarded.
    pub fn detached(envelope: &'a Envelope) -> Self {
        Self {
            target: Target::Detached(envelope),
        }
    }

    /// The request envelope.
    pub fn envelope(&self) -> &Envelope {
        match &self.target {
            Target::Detached(envelope) => envelope,
            Target::Live(responder) => responder.request(),
        }
    }

    pub fn command(&self) -> &str {
        self.envelope().command()
    }

    pub fn arg1(&self) -> &str {
        self.envelope().arg1()
    }

    pub fn arg2(&self) -> &str {
        self.envelope().arg2()
    }

    /// Publish a non-terminal `PROGRESS` reply.
    pub fn progress(&mut self, text: &str) {
        match &mut self.target {
            Target::Live(responder) => responder.progress(text),
            Target::Detached(envelope) => {
                debug!(command = %envelope.command(), text, "Progress without responder");
            }
        }
    }
}

/// Maps command names to handlers.
pub struct CommandRegistry<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> CommandRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler that runs on the I/O thread.
    pub fn register_inline<F>(&mut self, command: &str, handler: F)
    where
        F: Fn(&mut Invocation<'_>) -> CommandResult + Send + Sync + 'static,
    {
        self.insert(command, Handler::Inline(Box::new(handler)));
    }

    /// Register a handler that runs on the owner thread.
    pub fn register_owner<F>(&mut self, command: &str, handler: F)
    where
        F: Fn(&mut C, &mut Invocation<'_>) -> CommandResult + Send + Sync + 'static,
    {
        self.insert(command, Handler::Owner(Box::new(handler)));
    }

    fn insert(&mut self, command: &str, handler: Handler<C>) {
        if self.handlers.insert(command.to_string(), handler).is_some() {
            warn!(command, "Handler replaced");
        }
    }

    /// Where `command` runs, if registered.
    pub fn binding(&self, command: &str) -> Option<Binding> {
        self.handlers.get(command).map(|handler| match handler {
            Handler::Inline(_) => Binding::Inline,
            Handler::Owner(_) => Binding::Owner,
        })
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run an inline handler. Owner-bound commands are refused.
    pub fn execute_inline(&self, invocation: &mut Invocation<'_>) -> CommandResult {
        let command = invocation.command().to_string();
        match self.handlers.get(&command) {
            Some(Handler::Inline(handler)) => guarded(&command, || handler(invocation)),
            Some(Handler::Owner(_)) => Err(CommandError::Failed(format!(
                "{} must run on the owner thread",
                command
            ))),
            None => Err(CommandError::UnknownCommand(command)),
        }
    }

    /// Run an owner-bound handler against `context`. Inline commands also run here.
    pub fn execute_owner(&self, context: &mut C, invocation: &mut Invocation<'_>) -> CommandResult {
        let command = invocation.command().to_string();
        match self.handlers.get(&command) {
            Some(Handler::Owner(handler)) => guarded(&command, || handler(context, invocation)),
            Some(Handler::Inline(handler)) => guarded(&command, || handler(invocation)),
            None => Err(CommandError::UnknownCommand(command)),
        }
    }
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a handler panic into an `ERROR` outcome.
fn guarded<F>(command: &str, run: F) -> CommandResult
where
    F: FnOnce() -> CommandResult,
{
    match catch_unwind(AssertUnwindSafe(run)) {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_reason(payload.as_ref());
            error!(command, reason = %reason, "Handler panicked");
            Err(CommandError::Panicked(reason))
        }
    }
}

/// Message carried by a caught panic.
pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
