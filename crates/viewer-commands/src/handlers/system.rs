//! Liveness and introspection.

use crate::ViewerState;
use bus_runtime::{CommandOutcome, CommandRegistry, Invocation};
use serde_json::json;

const LIST_COMMANDS: &str = "list_commands";

pub fn register(registry: &mut CommandRegistry<ViewerState>) {
    registry.register_inline("ping", |_inv: &mut Invocation<'_>| {
        Ok(CommandOutcome::message("pong").with_data(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })))
    });

    let mut names = registry.commands();
    names.push(LIST_COMMANDS.to_string());
    names.sort();
    names.dedup();

    registry.register_inline(LIST_COMMANDS, move |_inv: &mut Invocation<'_>| {
        Ok(CommandOutcome::message(format!("{} commands", names.len())).with_data(json!(names)))
    });
}
