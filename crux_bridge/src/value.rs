//! The dynamic value type passed between the core and the scripting layer.

use std::collections::BTreeMap;

use compact_str::CompactString;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::ConvertError;

/// A value of unspecified shape crossing the boundary.
///
/// This is what the scripting layer sends as method arguments and what a resolved promise carries
/// back. The core never inspects a resolved value, it only moves it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum BridgeValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(CompactString),
    Array(Vec<BridgeValue>),
    /// A map with keys in sorted order.
    Map(BTreeMap<CompactString, BridgeValue>),
}

impl BridgeValue {
    /// Build a map from key-value pairs.
    pub fn map<K: Into<CompactString>>(
        entries: impl IntoIterator<Item = (K, BridgeValue)>,
    ) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A short name of the kind of this value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a field of a map. Returns `None` for missing keys and for values which aren't maps.
    pub fn get(&self, key: &str) -> Option<&BridgeValue> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Convert into a JSON value. Non-finite floats become `null` as JSON can't represent them.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.to_string()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Convert from a JSON value.
    ///
    /// Numbers which fit in an `i64` become `Int`, all other numbers become `Float`.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s.into()),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k.into(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Encode any serializable type as a bridge value.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, ConvertError> {
        serde_json::to_value(value)
            .map(Self::from_json)
            .map_err(ConvertError::decode)
    }

    /// Decode a structured type from this value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ConvertError> {
        serde_json::from_value(self.to_json()).map_err(ConvertError::decode)
    }
}

impl From<bool> for BridgeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for BridgeValue {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<i64> for BridgeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u32> for BridgeValue {
    fn from(i: u32) -> Self {
        Self::Int(i.into())
    }
}

impl From<u64> for BridgeValue {
    fn from(i: u64) -> Self {
        i64::try_from(i).map_or(Self::Float(i as f64), Self::Int)
    }
}

impl From<usize> for BridgeValue {
    fn from(i: usize) -> Self {
        (i as u64).into()
    }
}

impl From<f64> for BridgeValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for BridgeValue {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for BridgeValue {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<CompactString> for BridgeValue {
    fn from(s: CompactString) -> Self {
        Self::String(s)
    }
}

impl<T: Into<BridgeValue>> From<Option<T>> for BridgeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<BridgeValue>> From<Vec<T>> for BridgeValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<BridgeValue>> From<BTreeMap<CompactString, T>> for BridgeValue {
    fn from(map: BTreeMap<CompactString, T>) -> Self {
        Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_numbers_keep_integers_exact() {
        let value = BridgeValue::from_json(json!([1, -7, 2.5, 18446744073709551615u64]));
        assert_eq!(
            value,
            BridgeValue::Array(vec![
                BridgeValue::Int(1),
                BridgeValue::Int(-7),
                BridgeValue::Float(2.5),
                BridgeValue::Float(18446744073709551615u64 as f64),
            ])
        );
    }

    #[test]
    fn non_finite_floats_become_json_null() {
        assert_eq!(BridgeValue::Float(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(
            BridgeValue::Float(f64::INFINITY).to_json(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn nested_payload_survives_json() {
        let payload = json!({
            "jobs": [{"name": "Office", "radius": 120.5, "active": true}],
            "note": null,
        });
        let value = BridgeValue::from_json(payload.clone());
        assert_eq!(value.to_json(), payload);
        assert_eq!(
            value.get("jobs").map(BridgeValue::kind),
            Some("array")
        );
        assert!(value.get("note").is_some_and(BridgeValue::is_null));
    }

    #[test]
    fn decode_structured_type() {
        #[derive(Debug, PartialEq, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Job {
            job_name: String,
            elapsed_seconds: u32,
        }

        let value = BridgeValue::map([
            ("jobName", BridgeValue::from("Office")),
            ("elapsedSeconds", BridgeValue::Int(42)),
        ]);
        assert_eq!(
            value.decode::<Job>().unwrap(),
            Job {
                job_name: "Office".into(),
                elapsed_seconds: 42
            }
        );
        assert!(BridgeValue::Int(3).decode::<Job>().is_err());
    }

    #[test]
    fn large_unsigned_falls_back_to_float() {
        assert_eq!(BridgeValue::from(u64::MAX), BridgeValue::Float(u64::MAX as f64));
        assert_eq!(BridgeValue::from(7u64), BridgeValue::Int(7));
    }
}
