//! Coercion of owserver payloads into typed values.
//!
//! owserver encodes every property as ASCII text, padded with spaces and
//! sometimes trailing NULs. [`coerce`] trims the text and picks the
//! narrowest matching representation:
//!
//! | Text | Value |
//! |------|-------|
//! | optional sign + digits | [`Value::Integer`] |
//! | optional sign + digits? + `.` + digits? | [`Value::Float`] |
//! | anything else | [`Value::Text`] |
//!
//! # Example
//!
//! ```
//! use ownet::{coerce, Value};
//!
//! assert_eq!(coerce(b"  23.500  \0\0"), Value::Float(23.5));
//! assert_eq!(coerce(b"042"), Value::Integer(42));
//! assert_eq!(coerce(b"DS2409"), Value::Text("DS2409".to_string()));
//! ```

use std::fmt;

/// A property value read from an owserver.
///
/// Numbers compare by value, so `Integer(20)` equals `Float(20.0)`; owserver
/// prints whole-valued floats without a decimal point.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Whole number.
    Integer(i64),
    /// Decimal number.
    Float(f64),
    /// Anything that is not a number.
    Text(String),
}

impl Value {
    /// Returns the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(_) => None,
        }
    }

    /// Returns the value as an integer if it is a whole number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text if the value is not numeric.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Text(_), _) | (_, Self::Text(_)) => false,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Text is coerced, so `Value::from("10")` equals a property read back as `10`.
impl From<&str> for Value {
    fn from(text: &str) -> Self {
        coerce(text.as_bytes())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        coerce(text.as_bytes())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(value.into())
    }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(&['-', '+'][..]).unwrap_or(s)
}

fn is_integer(s: &str) -> bool {
    let digits = strip_sign(s);
    !digits.is_empty() && is_digits(digits)
}

fn is_decimal(s: &str) -> bool {
    let body = strip_sign(s);
    match body.split_once('.') {
        Some((whole, fraction)) => {
            !(whole.is_empty() && fraction.is_empty()) && is_digits(whole) && is_digits(fraction)
        }
        None => false,
    }
}

/// Trims surrounding whitespace and NUL padding from a payload.
pub fn trim_payload(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Converts a raw owserver payload into a [`Value`].
pub fn coerce(raw: &[u8]) -> Value {
    let text = trim_payload(raw);

    if is_integer(&text) {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Integer(i);
        }
    }
    if is_integer(&text) || is_decimal(&text) {
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::Text(text)
}
