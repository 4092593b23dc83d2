//! Scalar readings used by the built-in types, promotions and checks.
//!
//! Payload values arrive from loosely typed transports (query strings, form
//! bodies), so promotions follow lenient conversion rules: a string reads as
//! the longest numeric prefix it starts with, booleans read as 0/1 and null
//! reads as zero or the empty string.

use serde_json::{Number, Value};

pub(crate) fn is_bool(v: &Value) -> bool {
    v.is_boolean()
}

pub(crate) fn is_string(v: &Value) -> bool {
    v.is_string()
}

pub(crate) fn is_integer(v: &Value) -> bool {
    matches!(v, Value::Number(n) if n.is_i64() || n.is_u64())
}

pub(crate) fn is_float(v: &Value) -> bool {
    matches!(v, Value::Number(n) if n.is_f64())
}

/// Boolean reading: `false`, `0`, `0.0`, `""`, `"0"`, null and empty
/// collections are false.
pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// String reading: `true` is `"1"`, `false` and null are empty, floats use
/// their shortest decimal form (`1.0` is `"1"`).
pub(crate) fn stringify(v: &Value) -> String {
    match v {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Length of the numeric prefix of `s` (after leading whitespace), or `None`
/// when `s` does not start with a number.
fn numeric_prefix(s: &str) -> Option<&str> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    Some(&s[..end])
}

/// Integer reading; floats truncate toward zero and saturate.
pub(crate) fn to_integer(v: &Value) -> i64 {
    match v {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .unwrap_or_else(|| n.as_f64().map_or(0, |f| f as i64)),
        Value::String(s) => numeric_prefix(s).map_or(0, |prefix| {
            prefix
                .parse::<i64>()
                .unwrap_or_else(|_| prefix.parse::<f64>().map_or(0, |f| f as i64))
        }),
        Value::Array(items) => i64::from(!items.is_empty()),
        Value::Object(map) => i64::from(!map.is_empty()),
    }
}

/// Float reading.
pub(crate) fn to_float(v: &Value) -> f64 {
    match v {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => numeric_prefix(s)
            .and_then(|prefix| prefix.parse::<f64>().ok())
            .unwrap_or(0.0),
        Value::Array(items) => f64::from(u8::from(!items.is_empty())),
        Value::Object(map) => f64::from(u8::from(!map.is_empty())),
    }
}

/// Float as a JSON value; non-finite results become null.
pub(crate) fn float_value(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

/// Numeric reading used by the sign checks. Only whole numeric strings count;
/// collections and non-numeric strings have no numeric reading.
pub(crate) fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
