//! Scalar values flowing into the write path.
//!
//! Variables are always stored as strings. Typed writes (integers from
//! `increment`, booleans from `toggle`) are stringified on the way in and
//! parsed again by whoever reads them.

use serde_json::Value;
use std::fmt;

/// A value handed to the write path
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
}

impl fmt::Display for WriteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteValue::Text(text) => f.write_str(text),
            WriteValue::Integer(n) => write!(f, "{n}"),
            WriteValue::Decimal(n) if n.is_nan() => f.write_str("NaN"),
            WriteValue::Decimal(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            WriteValue::Decimal(n) => f.write_str(&format_decimal(*n)),
            WriteValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for WriteValue {
    fn from(text: &str) -> Self {
        WriteValue::Text(text.to_string())
    }
}

impl From<String> for WriteValue {
    fn from(text: String) -> Self {
        WriteValue::Text(text)
    }
}

impl From<&String> for WriteValue {
    fn from(text: &String) -> Self {
        WriteValue::Text(text.clone())
    }
}

impl From<i64> for WriteValue {
    fn from(n: i64) -> Self {
        WriteValue::Integer(n)
    }
}

impl From<f64> for WriteValue {
    fn from(n: f64) -> Self {
        WriteValue::Decimal(n)
    }
}

impl From<bool> for WriteValue {
    fn from(b: bool) -> Self {
        WriteValue::Boolean(b)
    }
}

/// Parse the leading integer of `text`, ignoring surrounding whitespace and
/// any trailing non-digit characters (`"12px"` parses to `12`).
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a finite decimal or a spelled-out `Infinity`.
///
/// Rust's `inf`, `infinity` and `nan` spellings are rejected.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned == "Infinity" {
        return Some(if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse().ok()
}

/// Number-to-string the way page scripts print numbers: `-0` is `0`, and
/// magnitudes from `1e21` up or below `1e-6` use a signed exponent.
fn format_decimal(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
            _ => formatted,
        };
    }
    n.to_string()
}

/// Whether `text` is a complete JSON document
pub fn is_json(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

/// Text form of a resolved JSON value: strings verbatim, everything else as
/// compact JSON, `null` as the empty string.
pub fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Apply `by` to `value` with wrap-around clamping.
///
/// With a max only, the lower bound is an implicit `0`. Going past the max
/// wraps to the min and falling below the min wraps to the max.
pub fn wrap_step(value: i64, by: i64, min: Option<i64>, max: Option<i64>) -> i64 {
    let mut next = value.saturating_add(by);
    if let Some(max) = max {
        let min = min.unwrap_or(0);
        if next > max {
            next = min;
        } else if next < min {
            next = max;
        }
    }
    next
}
