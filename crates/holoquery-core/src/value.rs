//! Record and key value types

use serde_json::Value;

/// A dataset record: field name to JSON value, in insertion order
pub type Record = serde_json::Map<String, Value>;

/// Hashable form of a scalar key value
///
/// Only strings, booleans and numbers can act as keys. Numbers compare by
/// value: a float with no fractional part that fits an integer becomes that
/// integer, so `1` and `1.0` are the same key. Other floats are compared by
/// their canonical text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(String),
    Str(String),
}

impl Key {
    /// Convert a JSON value into a key, `None` for null, arrays and objects
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::UInt(u))
                } else {
                    let normalized = n.as_f64().and_then(integral);
                    Some(normalized.unwrap_or_else(|| Self::Float(n.to_string())))
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Read the key stored in `field` of a record
    pub fn from_field(record: &Record, field: &str) -> Option<Self> {
        record.get(field).and_then(Self::from_value)
    }
}

/// Integer key for a float with no fractional part, if one fits
fn integral(f: f64) -> Option<Key> {
    if f.fract() != 0.0 {
        return None;
    }
    // i64::MAX and u64::MAX round up to 2^63 and 2^64 as f64
    if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Key::Int(f as i64))
    } else if f >= 0.0 && f < u64::MAX as f64 {
        Some(Key::UInt(f as u64))
    } else {
        None
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::UInt(u) => write!(f, "{}", u),
            Self::Float(s) => f.write_str(s),
            Self::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Whether a value is a scalar (string, number or boolean)
pub fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}
