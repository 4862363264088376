//! Dataset loading and status.

use crate::ViewerState;
use bus_runtime::{CommandError, CommandOutcome, CommandRegistry, Invocation};
use std::path::Path;
use tracing::warn;

pub fn register(registry: &mut CommandRegistry<ViewerState>) {
    registry.register_owner("load_data", load_data);
    registry.register_owner("get_status", |state: &mut ViewerState, _inv: &mut Invocation<'_>| {
        Ok(CommandOutcome::message("Status retrieved").with_data(state.status()))
    });
}

fn load_data(state: &mut ViewerState, inv: &mut Invocation<'_>) -> bus_runtime::CommandResult {
    let path = inv.arg1().trim().to_string();
    if path.is_empty() {
        return Err(CommandError::MissingArgument { name: "path" });
    }

    inv.progress(&format!("Loading dataset from: {}", path));
    let loaded = state
        .loader()
        .load(Path::new(&path), &mut |message: &str| inv.progress(message));

    match loaded {
        Ok(info) => {
            let [x, y, z] = info.extent;
            state.set_volume(info);
            Ok(CommandOutcome::message(format!(
                "Loaded dataset from: {} ({}x{}x{})",
                path, x, y, z
            )))
        }
        Err(e) => {
            warn!(path = %path, error = %e, "Dataset load failed");
            Err(CommandError::Failed(format!(
                "Failed to load dataset from: {}: {}",
                path, e
            )))
        }
    }
}
