//! Numeric command parameter extraction

use serde_json::Value;

/// Read an integer parameter leniently
///
/// Accepts native integers, native floats and numeric strings. Floats and
/// numeric strings are truncated toward zero. Anything else (including a
/// missing parameter) yields 0.
pub fn int_param(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(truncate))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(truncate).unwrap_or(0),
        _ => 0,
    }
}

fn truncate(f: f64) -> i64 {
    if f.is_finite() {
        f.trunc() as i64
    } else {
        0
    }
}

/// Convert a color temperature in kelvin to mireds, rounded half away from zero
///
/// Returns `None` for non-positive temperatures.
pub fn kelvin_to_mired(kelvin: i64) -> Option<i64> {
    if kelvin <= 0 {
        return None;
    }
    Some((1_000_000.0 / kelvin as f64).round() as i64)
}
