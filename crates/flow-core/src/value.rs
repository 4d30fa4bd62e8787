//! Sensor and actuator payloads

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sensor reading or an actuator setting
///
/// Payloads are a closed set of kinds. Comparisons look at the variant tag
/// and never coerce one kind into another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
}

/// The kind of a [`Value`], used in type errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Number,
    String,
}

impl Value {
    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
        }
    }

    /// Get the numeric payload, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean payload, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the string payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "boolean",
            ValueKind::Number => "numeric",
            ValueKind::String => "string",
        };
        f.write_str(name)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Inclusive numeric range a device accepts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Build a range from optional bounds, missing bounds are open
    pub fn from_bounds(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        if min.is_none() && max.is_none() {
            return None;
        }
        Some(Self {
            min: min.unwrap_or(f64::MIN),
            max: max.unwrap_or(f64::MAX),
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_deserialize_kinds() {
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));

        let v: Value = serde_json::from_str("42").unwrap();
        assert_eq!(v, Value::Number(42.0));

        let v: Value = serde_json::from_str("-1.5").unwrap();
        assert_eq!(v, Value::Number(-1.5));

        let v: Value = serde_json::from_str(r#""open""#).unwrap();
        assert_eq!(v, Value::String("open".to_string()));
    }

    #[test]
    fn test_value_rejects_other_shapes() {
        assert!(serde_json::from_str::<Value>("null").is_err());
        assert!(serde_json::from_str::<Value>("[1, 2]").is_err());
        assert!(serde_json::from_str::<Value>(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn test_value_kind_and_accessors() {
        assert_eq!(Value::from(3).kind(), ValueKind::Number);
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
        assert_eq!(Value::from("x").kind(), ValueKind::String);

        assert_eq!(Value::from(2.5).as_number(), Some(2.5));
        assert_eq!(Value::from("x").as_number(), None);
        assert_eq!(Value::from(false).as_bool(), Some(false));
        assert_eq!(Value::from("on").as_str(), Some("on"));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from(5).to_string(), "5");
        assert_eq!(Value::from(5.25).to_string(), "5.25");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from("on").to_string(), "\"on\"");
    }

    #[test]
    fn test_range() {
        let range = ValueRange::new(0.0, 100.0);
        assert!(range.contains(0.0));
        assert!(range.contains(100.0));
        assert!(!range.contains(100.5));
        assert!(!range.contains(-1.0));

        assert!(ValueRange::from_bounds(None, None).is_none());
        let half_open = ValueRange::from_bounds(Some(10.0), None).unwrap();
        assert!(half_open.contains(1e9));
        assert!(!half_open.contains(9.0));
    }
}
