// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Runtime value type for decoded messages.
//!
//! Decoded CDR/ROS1 payloads become a field-name -> [`Value`] mapping. All
//! variants are serde-serializable so the CLI can dump decoded messages as
//! JSON.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Type alias for a decoded message as field name -> value mapping.
pub type DecodedMessage = HashMap<String, Value>;

/// Unified value type for decoded robotics data.
///
/// Mirrors the type grammar of the schema model: primitives, strings,
/// byte blobs, temporal types, arrays and nested structs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 8-bit unsigned integer
    UInt8(u8),
    /// 16-bit unsigned integer
    UInt16(u16),
    /// 32-bit unsigned integer
    UInt32(u32),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// Binary data (byte arrays decode to this, not to `Array`)
    Bytes(Vec<u8>),
    /// ROS time as nanoseconds since the Unix epoch
    Time(i64),
    /// ROS duration as nanoseconds (may be negative)
    Duration(i64),
    /// Array of values
    Array(Vec<Value>),
    /// Nested message
    Struct(DecodedMessage),
}

impl Value {
    /// Check if this value is an integer type (signed or unsigned).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Value::Int8(_)
                | Value::Int16(_)
                | Value::Int32(_)
                | Value::Int64(_)
                | Value::UInt8(_)
                | Value::UInt16(_)
                | Value::UInt32(_)
                | Value::UInt64(_)
        )
    }

    /// Try to convert this value to i128 (integers and booleans).
    ///
    /// Used by encoders to range-check a value against its declared width.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Bool(v) => Some(*v as i128),
            Value::Int8(v) => Some(*v as i128),
            Value::Int16(v) => Some(*v as i128),
            Value::Int32(v) => Some(*v as i128),
            Value::Int64(v) => Some(*v as i128),
            Value::UInt8(v) => Some(*v as i128),
            Value::UInt16(v) => Some(*v as i128),
            Value::UInt32(v) => Some(*v as i128),
            Value::UInt64(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Try to convert this value to f64 (numeric values only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Try to get the inner string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the inner bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get the inner array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to get the inner struct.
    pub fn as_struct(&self) -> Option<&DecodedMessage> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Get the time value as nanoseconds.
    pub fn as_time_nanos(&self) -> Option<i64> {
        match self {
            Value::Time(nanos) => Some(*nanos),
            _ => None,
        }
    }

    /// Create a time value from ROS1 time (secs: u32, nsecs: u32).
    pub fn from_ros1_time(secs: u32, nsecs: u32) -> Self {
        Value::Time((secs as i64) * 1_000_000_000 + (nsecs as i64))
    }

    /// Create a duration from ROS1 duration (secs: i32, nsecs: i32).
    pub fn from_ros1_duration(secs: i32, nsecs: i32) -> Self {
        Value::Duration((secs as i64) * 1_000_000_000 + (nsecs as i64))
    }

    /// Get the type name of this value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Time(v) => write!(f, "Time({v}ns)"),
            Value::Duration(v) => write!(f, "Duration({v}ns)"),
            Value::Array(v) => write!(f, "[{} elements]", v.len()),
            Value::Struct(v) => write!(f, "{{{} fields}}", v.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_i128() {
        assert_eq!(Value::Int32(-7).as_i128(), Some(-7));
        assert_eq!(Value::UInt64(u64::MAX).as_i128(), Some(u64::MAX as i128));
        assert_eq!(Value::Float64(1.5).as_i128(), None);
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(Value::Int32(42).as_f64(), Some(42.0));
        assert_eq!(Value::Float32(2.5).as_f64(), Some(2.5f32 as f64));
        assert_eq!(Value::String("x".into()).as_f64(), None);
    }

    #[test]
    fn test_ros1_time_constructors() {
        let ts = Value::from_ros1_time(1, 500_000_000);
        assert_eq!(ts.as_time_nanos(), Some(1_500_000_000));

        let dur = Value::from_ros1_duration(-1, 0);
        assert_eq!(dur, Value::Duration(-1_000_000_000));
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut fields = DecodedMessage::new();
        fields.insert("x".to_string(), Value::Float64(1.0));
        fields.insert("name".to_string(), Value::String("base".to_string()));
        let value = Value::Struct(fields);
        let json = serde_json::to_string(&value).unwrap();
        let decoded: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Bytes(vec![1, 2, 3])), "<3 bytes>");
        assert_eq!(format!("{}", Value::Time(123)), "Time(123ns)");
    }
}
