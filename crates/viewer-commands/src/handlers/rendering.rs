//! Per-layer rendering parameters and sampling quality.

use crate::{RenderMode, Slot, TransferFunction, ViewerState};
use bus_runtime::params::{choice_name, clamp, parse_choice, parse_f64};
use bus_runtime::{CommandOutcome, CommandRegistry, CommandResult, Invocation};

pub fn register(registry: &mut CommandRegistry<ViewerState>) {
    registry.register_owner("set_rendering_mode", set_rendering_mode);
    registry.register_owner("set_transfer_function", set_transfer_function);
    registry.register_owner("set_threshold", set_threshold);
    registry.register_owner("set_density", set_density);
    registry.register_owner("set_quality", set_quality);
}

fn set_rendering_mode(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let mode: RenderMode = parse_choice(inv.arg1())?;
    let slot = Slot::parse(inv.arg2())?;

    state.layer_mut(slot).rendering_mode = mode;
    Ok(CommandOutcome::message(format!(
        "{} rendering mode set to {}",
        slot.label(),
        choice_name(mode).to_uppercase()
    )))
}

fn set_transfer_function(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let tf: TransferFunction = parse_choice(inv.arg1())?;
    let slot = Slot::parse(inv.arg2())?;

    state.layer_mut(slot).transfer_function = tf;
    Ok(CommandOutcome::message(format!(
        "{} transfer function set to {}",
        slot.label(),
        choice_name(tf)
    )))
}

fn set_threshold(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let value = clamp(parse_f64("threshold", inv.arg1())?, 0.0, 1.0);
    let slot = Slot::parse(inv.arg2())?;

    state.layer_mut(slot).threshold = value;
    Ok(CommandOutcome::message(format!(
        "{} threshold set to {:.2}",
        slot.label(),
        value
    )))
}

fn set_density(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let value = clamp(parse_f64("density", inv.arg1())?, 0.1, 500.0);
    let slot = Slot::parse(inv.arg2())?;

    state.layer_mut(slot).density = value;
    Ok(CommandOutcome::message(format!(
        "{} density set to {:.1}",
        slot.label(),
        value
    )))
}

fn set_quality(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    state.quality = clamp(parse_f64("quality", inv.arg1())?, 0.1, 5.0);
    Ok(CommandOutcome::message(format!("Quality set to {}x", state.quality)))
}
