//! Slice planes and the crop box.

use crate::{SliceAxis, ViewerState};
use bus_runtime::params::{clamp, parse_choice, parse_f64, parse_index, parse_range_pair};
use bus_runtime::{CommandError, CommandOutcome, CommandRegistry, CommandResult, Invocation};

const DEFAULT_SLICE: &str = "50%";

pub fn register(registry: &mut CommandRegistry<ViewerState>) {
    registry.register_owner("set_slice", set_slice);
    registry.register_owner("crop", crop);
}

fn axis_or(raw: &str, default: SliceAxis) -> Result<SliceAxis, CommandError> {
    if raw.trim().is_empty() {
        Ok(default)
    } else {
        parse_choice(raw)
    }
}

/// `set_slice <axis> <index | N%>`. Percentages resolve against the extent.
fn set_slice(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let axis = axis_or(inv.arg1(), SliceAxis::Z)?;
    let extent = state
        .volume
        .as_ref()
        .map(|volume| volume.extent)
        .ok_or_else(|| CommandError::Failed("No volume loaded".to_string()))?;
    let last = extent[axis.index()] as i64 - 1;

    let raw = match inv.arg2().trim() {
        "" => DEFAULT_SLICE,
        raw => raw,
    };
    let requested = match raw.strip_suffix('%') {
        Some(percent) => {
            let percent = parse_f64("slice percentage", percent)?;
            (percent / 100.0 * last as f64) as i64
        }
        None => parse_index("slice", raw)?,
    };

    let index = requested.clamp(0, last) as usize;
    state.slices[axis.index()] = index;
    Ok(CommandOutcome::message(format!(
        "{} slice set to {}",
        axis.label(),
        index
    )))
}

/// `crop <axis> "min,max"`, both bounds normalized to `[0, 1]`.
fn crop(state: &mut ViewerState, inv: &mut Invocation<'_>) -> CommandResult {
    let axis = axis_or(inv.arg1(), SliceAxis::X)?;
    let raw = match inv.arg2().trim() {
        "" => "0.0,1.0",
        raw => raw,
    };

    let (min, max) = parse_range_pair("crop range", raw, 1.0).map_err(|_| {
        CommandError::InvalidArgument {
            name: "crop range",
            value: raw.to_string(),
            expected: "'min,max'",
        }
    })?;
    let (mut min, mut max) = (clamp(min, 0.0, 1.0), clamp(max, 0.0, 1.0));
    if min > max {
        std::mem::swap(&mut min, &mut max);
    }

    state.crop.min[axis.index()] = min;
    state.crop.max[axis.index()] = max;
    Ok(CommandOutcome::message(format!(
        "Crop {} set to [{:.2}, {:.2}]",
        axis.label(),
        min,
        max
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VolumeInfo;
    use bus_runtime::Envelope;
    use std::path::PathBuf;

    fn run(
        state: &mut ViewerState,
        handler: fn(&mut ViewerState, &mut Invocation<'_>) -> CommandResult,
        arg1: &str,
        arg2: &str,
    ) -> CommandResult {
        let request = Envelope::request("3dviewer", "", "test").with_args(arg1, arg2);
        handler(state, &mut Invocation::detached(&request))
    }

    fn loaded() -> ViewerState {
        let mut state = ViewerState::default();
        state.set_volume(VolumeInfo {
            path: PathBuf::from("/data/head"),
            name: "head".to_string(),
            extent: [64, 32, 101],
        });
        state
    }

    #[test]
    fn test_slice_percentage() {
        let mut state = loaded();
        let outcome = run(&mut state, set_slice, "z", "50%").unwrap();
        assert_eq!(outcome.message, "Z slice set to 50");
        assert_eq!(state.slices[2], 50);

        run(&mut state, set_slice, "x", "100%").unwrap();
        assert_eq!(state.slices[0], 63);
    }

    #[test]
    fn test_slice_index_clamped() {
        let mut state = loaded();
        run(&mut state, set_slice, "y", "500").unwrap();
        assert_eq!(state.slices[1], 31);
        run(&mut state, set_slice, "y", "-4").unwrap();
        assert_eq!(state.slices[1], 0);
        run(&mut state, set_slice, "y", "7.9").unwrap();
        assert_eq!(state.slices[1], 7);
    }

    #[test]
    fn test_slice_defaults_to_middle_of_z() {
        let mut state = loaded();
        state.slices[2] = 0;
        let outcome = run(&mut state, set_slice, "", "").unwrap();
        assert_eq!(outcome.message, "Z slice set to 50");
    }

    #[test]
    fn test_slice_errors() {
        let mut state = ViewerState::default();
        assert_eq!(
            run(&mut state, set_slice, "z", "10").unwrap_err(),
            CommandError::Failed("No volume loaded".to_string())
        );

        let mut state = loaded();
        assert!(matches!(
            run(&mut state, set_slice, "w", "10").unwrap_err(),
            CommandError::InvalidChoice { .. }
        ));
        assert!(run(&mut state, set_slice, "z", "half").is_err());
        assert!(run(&mut state, set_slice, "z", "abc%").is_err());
    }

    #[test]
    fn test_crop() {
        let mut state = ViewerState::default();
        let outcome = run(&mut state, crop, "y", "0.2,0.8").unwrap();
        assert_eq!(outcome.message, "Crop Y set to [0.20, 0.80]");
        assert_eq!(state.crop.min[1], 0.2);
        assert_eq!(state.crop.max[1], 0.8);
    }

    #[test]
    fn test_crop_single_value_and_clamping() {
        let mut state = ViewerState::default();
        let outcome = run(&mut state, crop, "z", "0.3").unwrap();
        assert_eq!(outcome.message, "Crop Z set to [0.30, 1.00]");

        let outcome = run(&mut state, crop, "x", "1.5,-2").unwrap();
        assert_eq!(outcome.message, "Crop X set to [0.00, 1.00]");
    }

    #[test]
    fn test_crop_rejects_garbage() {
        let mut state = ViewerState::default();
        let err = run(&mut state, crop, "z", "abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid crop range: 'abc' (expected 'min,max')"
        );
        assert_eq!(state.crop.min[2], 0.0);
        assert_eq!(state.crop.max[2], 1.0);
    }
}
