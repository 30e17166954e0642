//! Scan targets: typed slots that accept raw column values.
//!
//! [`FromValue`] converts a [`Value`] into a concrete Rust type. Every such
//! type is automatically a [`Scan`] target, which is what the mapper hands to
//! a cursor: one `&mut dyn Scan` per column.

use crate::db::Value;
use crate::error::DecodeError;
use chrono::{DateTime, NaiveDateTime, Utc};

/// A type that can be built from a single raw column value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, DecodeError>;
}

/// A mutable slot a cursor can write one column value into.
pub trait Scan {
    fn scan(&mut self, value: &Value) -> Result<(), DecodeError>;
}

impl<T: FromValue> Scan for T {
    fn scan(&mut self, value: &Value) -> Result<(), DecodeError> {
        *self = T::from_value(value)?;
        Ok(())
    }
}

/// Placeholder target for a column that no field claimed.
///
/// The value is read from the cursor and dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Discard;

impl FromValue for Discard {
    fn from_value(_value: &Value) -> Result<Self, DecodeError> {
        Ok(Discard)
    }
}

fn mismatch(expected: &'static str, found: &Value) -> DecodeError {
    if found.is_null() {
        DecodeError::UnexpectedNull { expected }
    } else {
        DecodeError::Mismatch {
            expected,
            found: found.kind(),
        }
    }
}

macro_rules! impl_from_value_for_int {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self, DecodeError> {
                    match value {
                        Value::Int(i) => <$t>::try_from(*i).map_err(|_| DecodeError::OutOfRange {
                            expected: stringify!($t),
                            value: i.to_string(),
                        }),
                        Value::String(s) => s.trim().parse::<$t>().map_err(|_| DecodeError::Parse {
                            expected: stringify!($t),
                            input: s.clone(),
                        }),
                        other => Err(mismatch(stringify!($t), other)),
                    }
                }
            }
        )+
    };
}

impl_from_value_for_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::String(s) => s.trim().parse().map_err(|_| DecodeError::Parse {
                expected: "f64",
                input: s.clone(),
            }),
            other => Err(mismatch("f64", other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::String(s) => s.trim().parse().map_err(|_| DecodeError::Parse {
                expected: "f32",
                input: s.clone(),
            }),
            other => f64::from_value(other)
                .map(|f| f as f32)
                .map_err(|_| mismatch("f32", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(DecodeError::Parse {
                    expected: "bool",
                    input: s.clone(),
                }),
            },
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Err(mismatch("String", value)),
            Value::Bytes(b) => String::from_utf8(b.clone()).map_err(|_| DecodeError::Parse {
                expected: "String",
                input: format!("<{} bytes>", b.len()),
            }),
            other => Ok(other.to_display_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            other => Err(mismatch("bytes", other)),
        }
    }
}

/// Text layouts accepted for timestamps stored as strings (SQLite).
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_naive(input: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Timestamp(t) => Ok(*t),
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_naive(s.trim()).map(|n| n.and_utc()))
                .ok_or_else(|| DecodeError::Parse {
                    expected: "timestamp",
                    input: s.clone(),
                }),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        DateTime::<Utc>::from_value(value).map(|t| t.naive_utc())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
