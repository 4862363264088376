//! Viewer command handlers.

mod camera;
mod data;
mod rendering;
mod shading;
mod slicing;
mod system;

use crate::ViewerState;
use bus_runtime::CommandRegistry;
use tracing::info;

/// Register every viewer command.
pub fn register(registry: &mut CommandRegistry<ViewerState>) {
    data::register(registry);
    rendering::register(registry);
    camera::register(registry);
    slicing::register(registry);
    shading::register(registry);
    // Last, so the command list it reports is complete.
    system::register(registry);

    info!(commands = registry.len(), "Registered viewer commands");
}
