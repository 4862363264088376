//! Lighting and surface shading.

use crate::{LightingMode, ViewerState};
use bus_runtime::params::{choice_name, clamp, parse_choice, parse_f64};
use bus_runtime::{CommandOutcome, CommandRegistry, CommandResult, Invocation};

pub fn register(registry: &mut CommandRegistry<ViewerState>) {
    registry.register_owner("set_lighting", set_lighting);
    registry.register_owner("set_specular", set_specular);
    registry.register_owner("set_shininess", set_shininess);
    registry.register_owner("set_gradient_weight", set_gradient_weight);
}

fn set_lighting(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let mode: LightingMode = parse_choice(inv.arg1())?;
    state.lighting = mode;
    Ok(CommandOutcome::message(format!(
        "Lighting set to {}",
        choice_name(mode)
    )))
}

fn set_specular(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    state.specular = clamp(parse_f64("specular", inv.arg1())?, 0.0, 2.0);
    Ok(CommandOutcome::message(format!(
        "Specular set to {:.2}",
        state.specular
    )))
}

fn set_shininess(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    state.shininess = clamp(parse_f64("shininess", inv.arg1())?, 1.0, 128.0);
    Ok(CommandOutcome::message(format!(
        "Shininess set to {:.1}",
        state.shininess
    )))
}

fn set_gradient_weight(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    state.gradient_weight = clamp(parse_f64("gradient weight", inv.arg1())?, 0.0, 50.0);
    Ok(CommandOutcome::message(format!(
        "Gradient weight set to {:.1}",
        state.gradient_weight
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_runtime::{CommandError, Envelope};

    fn run(
        state: &mut ViewerState,
        handler: fn(&mut ViewerState, &mut Invocation<'_>) -> CommandResult,
        arg1: &str,
    ) -> CommandResult {
        let request = Envelope::request("3dviewer", "", "test").with_args(arg1, "");
        handler(state, &mut Invocation::detached(&request))
    }

    #[test]
    fn test_lighting() {
        let mut state = ViewerState::default();
        let outcome = run(&mut state, set_lighting, "HEADLAMP").unwrap();
        assert_eq!(outcome.message, "Lighting set to headlamp");
        assert_eq!(state.lighting, LightingMode::Headlamp);

        let err = run(&mut state, set_lighting, "sun").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown lighting mode: 'sun'. Valid: fixed, headlamp"
        );
    }

    #[test]
    fn test_shading_clamps() {
        let mut state = ViewerState::default();
        assert_eq!(
            run(&mut state, set_specular, "3").unwrap().message,
            "Specular set to 2.00"
        );
        assert_eq!(
            run(&mut state, set_shininess, "0").unwrap().message,
            "Shininess set to 1.0"
        );
        assert_eq!(
            run(&mut state, set_gradient_weight, "75").unwrap().message,
            "Gradient weight set to 50.0"
        );
    }

    #[test]
    fn test_shading_requires_value() {
        let mut state = ViewerState::default();
        assert_eq!(
            run(&mut state, set_specular, "").unwrap_err(),
            CommandError::MissingArgument { name: "specular" }
        );
        assert_eq!(state.specular, 0.5);
    }
}
