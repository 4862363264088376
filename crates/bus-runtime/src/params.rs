//! Argument parsing helpers shared by handlers.
//!
//! Positional arguments travel as strings; an empty string means "absent".

use crate::CommandError;

/// An enum-like argument with a fixed set of wire names.
pub trait Choice: Sized + Copy + 'static {
    /// Used in error messages, e.g. "rendering mode".
    const LABEL: &'static str;

    /// Every option with its wire name, in display order.
    fn choices() -> &'static [(&'static str, Self)];

    /// The wire names, in display order.
    fn names() -> Vec<&'static str> {
        Self::choices().iter().map(|(name, _)| *name).collect()
    }
}

/// Parse a required floating point argument.
pub fn parse_f64(name: &'static str, raw: &str) -> Result<f64, CommandError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CommandError::MissingArgument { name });
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CommandError::InvalidArgument {
            name,
            value: raw.to_string(),
            expected: "a number",
        }),
    }
}

/// Parse an optional floating point argument, falling back to `default` when empty.
pub fn parse_f64_or(name: &'static str, raw: &str, default: f64) -> Result<f64, CommandError> {
    if raw.trim().is_empty() {
        Ok(default)
    } else {
        parse_f64(name, raw)
    }
}

/// Parse a required index. Fractional values truncate toward zero; negative
/// values are kept so callers can clamp them.
pub fn parse_index(name: &'static str, raw: &str) -> Result<i64, CommandError> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    parse_f64(name, raw).map(|value| value.trunc() as i64)
}

/// Match a case-insensitive choice.
pub fn parse_choice<T: Choice>(raw: &str) -> Result<T, CommandError> {
    let wanted = raw.trim().to_ascii_lowercase();
    T::choices()
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, value)| *value)
        .ok_or_else(|| CommandError::InvalidChoice {
            name: T::LABEL,
            value: raw.to_string(),
            valid: T::names(),
        })
}

/// Wire name of a choice value.
pub fn choice_name<T: Choice + PartialEq>(value: T) -> &'static str {
    T::choices()
        .iter()
        .find(|(_, candidate)| *candidate == value)
        .map(|(name, _)| *name)
        .unwrap_or("unknown")
}

/// Parse `"min,max"`. A lone value is the minimum and `default_max` fills in.
pub fn parse_range_pair(
    name: &'static str,
    raw: &str,
    default_max: f64,
) -> Result<(f64, f64), CommandError> {
    let mut parts = raw.splitn(2, ',');
    let min = parse_f64(name, parts.next().unwrap_or_default())?;
    let max = match parts.next() {
        Some(part) => parse_f64(name, part)?,
        None => default_max,
    };
    Ok((min, max))
}

/// Clamp `value` into `[min, max]`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}
