//! Camera commands.

use crate::ViewerState;
use bus_runtime::params::{clamp, parse_choice, parse_f64, Choice};
use bus_runtime::{CommandError, CommandOutcome, CommandRegistry, CommandResult, Invocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotationAxis {
    X,
    Y,
}

impl Choice for RotationAxis {
    const LABEL: &'static str = "rotation axis";

    fn choices() -> &'static [(&'static str, Self)] {
        &[("x", RotationAxis::X), ("y", RotationAxis::Y)]
    }
}

pub fn register(registry: &mut CommandRegistry<ViewerState>) {
    registry.register_owner("rotate", rotate);
    registry.register_owner("zoom", zoom);
    registry.register_owner("set_fov", set_fov);
    registry.register_owner("reset_camera", |state: &mut ViewerState, _inv: &mut Invocation<'_>| {
        state.reset_camera();
        Ok(CommandOutcome::message("Camera reset to default"))
    });
}

/// `rotate <axis> <degrees>`, or `rotate <degrees>` around Y.
fn rotate(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let (axis, degrees) = if inv.arg2().trim().is_empty() {
        match parse_f64("degrees", inv.arg1()) {
            Ok(degrees) => (RotationAxis::Y, degrees),
            Err(CommandError::MissingArgument { .. }) => {
                return Err(CommandError::MissingArgument { name: "degrees" })
            }
            Err(_) => {
                // Not a number: must be an axis with the degrees missing.
                parse_choice::<RotationAxis>(inv.arg1())?;
                return Err(CommandError::MissingArgument { name: "degrees" });
            }
        }
    } else {
        let axis = if inv.arg1().trim().is_empty() {
            RotationAxis::Y
        } else {
            parse_choice(inv.arg1())?
        };
        (axis, parse_f64("degrees", inv.arg2())?)
    };

    let label = match axis {
        RotationAxis::X => {
            state.camera.rotate_pitch(degrees);
            "X"
        }
        RotationAxis::Y => {
            state.camera.rotate_yaw(degrees);
            "Y"
        }
    };
    Ok(CommandOutcome::message(format!(
        "Rotated {} by {} degrees",
        label, degrees
    )))
}

fn zoom(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let steps = parse_f64("zoom", inv.arg1())?;
    state.camera.zoom(steps);
    Ok(CommandOutcome::message(format!(
        "Zoomed by {} (radius {:.2})",
        steps, state.camera.radius
    )))
}

fn set_fov(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    state.camera.fov = clamp(parse_f64("fov", inv.arg1())?, 1.0, 160.0);
    Ok(CommandOutcome::message(format!(
        "FOV set to {:.1} degrees",
        state.camera.fov
    )))
}
