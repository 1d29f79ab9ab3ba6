//! Closed property value type.

use crate::error::{CodecError, CodecResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A property value.
///
/// This is the complete set of kinds a record property can hold. Floats are
/// intentionally absent so that equality is total and documents encode
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Null value. Reads of a null property yield the type's default.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Point in time, UTC.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the name of this value's kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a timestamp, if it is one.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Timestamp(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// Conversion from a stored [`Value`] into a concrete Rust type.
///
/// Implementations return [`CodecError::TypeMismatch`] when the value holds
/// another kind.
pub trait FromValue: Sized {
    /// Converts the value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value's kind does not match `Self`.
    fn from_value(value: &Value) -> CodecResult<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> CodecResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> CodecResult<Self> {
        value
            .as_bool()
            .ok_or_else(|| CodecError::type_mismatch("bool", value.kind()))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> CodecResult<Self> {
        value
            .as_integer()
            .ok_or_else(|| CodecError::type_mismatch("integer", value.kind()))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> CodecResult<Self> {
        let n = i64::from_value(value)?;
        i32::try_from(n).map_err(|_| CodecError::IntegerOutOfRange {
            value: n,
            target: "i32",
        })
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> CodecResult<Self> {
        let n = i64::from_value(value)?;
        u32::try_from(n).map_err(|_| CodecError::IntegerOutOfRange {
            value: n,
            target: "u32",
        })
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> CodecResult<Self> {
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| CodecError::type_mismatch("text", value.kind()))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> CodecResult<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| CodecError::type_mismatch("bytes", value.kind()))
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> CodecResult<Self> {
        value
            .as_timestamp()
            .ok_or_else(|| CodecError::type_mismatch("timestamp", value.kind()))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> CodecResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}
