//! Helpers for loosely typed JSON values
//!
//! Events arrive as free-form JSON, so presence and truthiness are decided on
//! `serde_json::Value` directly.

use serde_json::Value;

/// Largest integer an `f64` represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Check whether a value counts as "set"
///
/// `null` and the empty string are unset. Zero, `false` and empty
/// collections are set.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Check whether a value is truthy
///
/// Falsy values are `null`, `false`, `0`, NaN and the empty string.
/// Arrays and objects are always truthy, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a value as plain text
///
/// Strings are returned without quotes and integral floats lose their
/// fractional part (`1.0` renders as `1`). Arrays and objects render as JSON.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                (f as i64).to_string()
            },
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
