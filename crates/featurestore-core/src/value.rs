//! Feature values decoded from a tier's textual representation.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A feature value, decoded once when it leaves the remote or offline tier.
///
/// Absence is not a variant: a [`FeatureSet`](crate::FeatureSet) slot holds
/// `None` for a feature no tier could answer, while `Null` is a stored JSON
/// `null`. Serializes as the plain JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Boolean(bool),
    Number(Number),
    String(String),
    /// Arrays and objects.
    Structured(Value),
}

impl FeatureValue {
    /// Decode a stored value.
    ///
    /// Well-formed JSON is decoded structurally (`31` is a number, `"\"US\""`
    /// the string `US`); anything else is kept verbatim as a string.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_json(value),
            Err(_) => Self::String(raw.to_owned()),
        }
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            other @ (Value::Array(_) | Value::Object(_)) => Self::Structured(other),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<FeatureValue> for Value {
    fn from(value: FeatureValue) -> Self {
        match value {
            FeatureValue::Null => Value::Null,
            FeatureValue::Boolean(b) => Value::Bool(b),
            FeatureValue::Number(n) => Value::Number(n),
            FeatureValue::String(s) => Value::String(s),
            FeatureValue::Structured(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numbers() {
        assert_eq!(FeatureValue::parse("31").as_f64(), Some(31.0));
        assert_eq!(FeatureValue::parse(" 0.25 ").as_f64(), Some(0.25));
    }

    #[test]
    fn parses_quoted_string_as_string() {
        assert_eq!(FeatureValue::parse("\"US\""), FeatureValue::String("US".into()));
    }

    #[test]
    fn falls_back_to_raw_string() {
        assert_eq!(FeatureValue::parse("US"), FeatureValue::String("US".into()));
        assert_eq!(FeatureValue::parse("{broken"), FeatureValue::String("{broken".into()));
        assert_eq!(FeatureValue::parse(""), FeatureValue::String(String::new()));
    }

    #[test]
    fn parses_booleans_null_and_structures() {
        assert_eq!(FeatureValue::parse("true").as_bool(), Some(true));
        assert!(FeatureValue::parse("null").is_null());
        assert_eq!(
            FeatureValue::parse(r#"{"views": 3, "tags": ["a"]}"#),
            FeatureValue::Structured(json!({"views": 3, "tags": ["a"]}))
        );
        assert_eq!(
            FeatureValue::parse("[1,2]"),
            FeatureValue::Structured(json!([1, 2]))
        );
    }

    #[test]
    fn serializes_as_plain_json() {
        let encoded = serde_json::to_value([
            FeatureValue::parse("31"),
            FeatureValue::parse("\"US\""),
            FeatureValue::parse("false"),
            FeatureValue::Null,
        ])
        .unwrap();
        assert_eq!(encoded, json!([31, "US", false, null]));
    }
}
