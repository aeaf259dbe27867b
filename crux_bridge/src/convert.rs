//! Conversion from bridge values to native types.
//!
//! Numbers coming from the scripting layer are usually doubles, so integer targets accept
//! integral floats. Everything else is strict: a string is never parsed as a number and a number
//! is never read as a boolean.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Utc};
use compact_str::{CompactString, format_compact};

use crate::BridgeValue;

/// An error when a bridge value can't be converted to the requested type.
#[derive(Clone, Debug, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConvertError {
    #[display("Expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[display("{value} is out of range for {target}")]
    OutOfRange {
        value: CompactString,
        target: &'static str,
    },
    #[display("Invalid date: {input}")]
    InvalidDate { input: CompactString },
    #[display("{reason}")]
    Decode { reason: CompactString },
    /// An error inside an array or a map. `path` is like `[2].name`.
    #[display("At {path}: {inner}")]
    At {
        path: CompactString,
        inner: Box<ConvertError>,
    },
}

impl ConvertError {
    pub(crate) fn decode(e: impl Display) -> Self {
        Self::Decode {
            reason: format_compact!("{e}"),
        }
    }

    fn mismatch(expected: &'static str, found: &BridgeValue) -> Self {
        Self::Mismatch {
            expected,
            found: found.kind(),
        }
    }

    /// Prefix the location of this error with a path segment.
    pub fn at(self, segment: impl Display) -> Self {
        match self {
            Self::At { path, inner } => Self::At {
                path: format_compact!("{segment}{path}"),
                inner,
            },
            other => Self::At {
                path: format_compact!("{segment}"),
                inner: Box::new(other),
            },
        }
    }
}

/// Types which can be read from a bridge value.
pub trait FromBridge: Sized {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError>;
}

impl FromBridge for BridgeValue {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        Ok(value.clone())
    }
}

impl FromBridge for bool {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        match value {
            BridgeValue::Bool(b) => Ok(*b),
            other => Err(ConvertError::mismatch("boolean", other)),
        }
    }
}

/// Read an integer, accepting floats without a fractional part.
fn integral(value: &BridgeValue, target: &'static str) -> Result<i64, ConvertError> {
    match value {
        BridgeValue::Int(i) => Ok(*i),
        // 2^63 is exactly representable, so `<` excludes everything above `i64::MAX`.
        BridgeValue::Float(f)
            if f.is_finite() && f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
        {
            Ok(*f as i64)
        }
        BridgeValue::Float(f) => Err(ConvertError::OutOfRange {
            value: format_compact!("{f}"),
            target,
        }),
        other => Err(ConvertError::mismatch("integer", other)),
    }
}

macro_rules! impl_from_bridge_int {
    ($($ty:ty),*) => {
        $(
            impl FromBridge for $ty {
                fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
                    let i = integral(value, stringify!($ty))?;
                    <$ty>::try_from(i).map_err(|_| ConvertError::OutOfRange {
                        value: format_compact!("{i}"),
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

impl_from_bridge_int!(i32, u32, u64, usize);

impl FromBridge for i64 {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        integral(value, "i64")
    }
}

impl FromBridge for f64 {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        match value {
            BridgeValue::Int(i) => Ok(*i as f64),
            BridgeValue::Float(f) => Ok(*f),
            other => Err(ConvertError::mismatch("number", other)),
        }
    }
}

impl FromBridge for f32 {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        let f = f64::from_bridge(value)?;
        let narrowed = f as f32;
        if f.is_finite() && !narrowed.is_finite() {
            return Err(ConvertError::OutOfRange {
                value: format_compact!("{f}"),
                target: "f32",
            });
        }
        Ok(narrowed)
    }
}

impl FromBridge for CompactString {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        match value {
            BridgeValue::String(s) => Ok(s.clone()),
            other => Err(ConvertError::mismatch("string", other)),
        }
    }
}

impl FromBridge for String {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        CompactString::from_bridge(value).map(String::from)
    }
}

impl<T: FromBridge> FromBridge for Option<T> {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        match value {
            BridgeValue::Null => Ok(None),
            other => T::from_bridge(other).map(Some),
        }
    }
}

impl<T: FromBridge> FromBridge for Vec<T> {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        match value {
            BridgeValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_bridge(item).map_err(|e| e.at(format_args!("[{i}]"))))
                .collect(),
            other => Err(ConvertError::mismatch("array", other)),
        }
    }
}

impl<T: FromBridge> FromBridge for BTreeMap<CompactString, T> {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        match value {
            BridgeValue::Map(map) => map
                .iter()
                .map(|(k, v)| {
                    T::from_bridge(v)
                        .map(|v| (k.clone(), v))
                        .map_err(|e| e.at(format_args!(".{k}")))
                })
                .collect(),
            other => Err(ConvertError::mismatch("map", other)),
        }
    }
}

/// Dates are milliseconds since the Unix epoch or RFC 3339 strings.
impl FromBridge for DateTime<Utc> {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        let invalid = || ConvertError::InvalidDate {
            input: format_compact!("{value:?}"),
        };
        match value {
            BridgeValue::Int(_) | BridgeValue::Float(_) => {
                let millis = f64::from_bridge(value)?;
                if !millis.is_finite() {
                    return Err(invalid());
                }
                DateTime::from_timestamp_millis(millis as i64).ok_or_else(invalid)
            }
            BridgeValue::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|date| date.with_timezone(&Utc))
                .map_err(|_| invalid()),
            other => Err(ConvertError::mismatch("date", other)),
        }
    }
}

/// Durations are a non-negative number of milliseconds.
impl FromBridge for Duration {
    fn from_bridge(value: &BridgeValue) -> Result<Self, ConvertError> {
        match value {
            BridgeValue::Int(ms) => u64::try_from(*ms)
                .map(Duration::from_millis)
                .map_err(|_| ConvertError::OutOfRange {
                    value: format_compact!("{ms}"),
                    target: "duration",
                }),
            BridgeValue::Float(ms) => Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| {
                ConvertError::OutOfRange {
                    value: format_compact!("{ms}"),
                    target: "duration",
                }
            }),
            other => Err(ConvertError::mismatch("duration", other)),
        }
    }
}
