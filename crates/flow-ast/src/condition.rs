//! Condition types
//!
//! Conditions are boolean tests over a sensor snapshot, used by WAIT and IF.

use flow_core::{SensorId, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "conditionType")]
pub enum Condition {
    /// Compare one sensor with a reference value
    #[serde(rename = "BASE")]
    Base(BaseCondition),

    /// All conditions must be true (AND)
    #[serde(rename = "SET_ALL")]
    All(ConditionSet),

    /// Any condition must be true (OR)
    #[serde(rename = "SET_ANY")]
    Any(ConditionSet),
}

impl Condition {
    /// Create a sensor comparison
    pub fn base(
        sensor: impl Into<SensorId>,
        comparison: Comparator,
        value: impl Into<Value>,
    ) -> Self {
        Condition::Base(BaseCondition {
            sensor: sensor.into(),
            comparison,
            value: value.into(),
        })
    }

    /// Create an ALL condition
    pub fn all(conditions: Vec<Condition>) -> Self {
        Condition::All(ConditionSet { conditions })
    }

    /// Create an ANY condition
    pub fn any(conditions: Vec<Condition>) -> Self {
        Condition::Any(ConditionSet { conditions })
    }

    /// Visit every sensor comparison in this tree, depth-first
    pub fn for_each_base<'a>(&'a self, visit: &mut dyn FnMut(&'a BaseCondition)) {
        match self {
            Condition::Base(base) => visit(base),
            Condition::All(set) | Condition::Any(set) => {
                for condition in &set.conditions {
                    condition.for_each_base(visit);
                }
            }
        }
    }

    /// Sensors referenced anywhere in this tree
    pub fn sensors(&self) -> Vec<&str> {
        let mut sensors = Vec::new();
        self.for_each_base(&mut |base| sensors.push(base.sensor.as_str()));
        sensors
    }
}

/// Sensor comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseCondition {
    /// Sensor to read
    pub sensor: SensorId,

    /// How to compare the reading with `value`
    pub comparison: Comparator,

    /// Reference value
    pub value: Value,
}

/// Ordered list of sub-conditions for SET_ALL / SET_ANY
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
}

impl Comparator {
    /// Operator symbol as written in programs
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Le => "<=",
            Comparator::Ge => ">=",
        }
    }

    /// Whether this comparator needs numeric operands
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparator::Eq)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_condition_deserialize() {
        let json = r#"{
            "conditionType": "BASE",
            "sensor": "soil_moisture",
            "comparison": "<=",
            "value": 30
        }"#;

        let condition: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(
            condition,
            Condition::base("soil_moisture", Comparator::Le, 30)
        );
    }

    #[test]
    fn test_nested_sets() {
        let json = r#"{
            "conditionType": "SET_ANY",
            "conditions": [
                {"conditionType": "BASE", "sensor": "door", "comparison": "=", "value": true},
                {
                    "conditionType": "SET_ALL",
                    "conditions": [
                        {"conditionType": "BASE", "sensor": "temp", "comparison": ">", "value": 30},
                        {"conditionType": "BASE", "sensor": "mode", "comparison": "=", "value": "auto"}
                    ]
                }
            ]
        }"#;

        let condition: Condition = serde_json::from_str(json).unwrap();
        if let Condition::Any(set) = &condition {
            assert_eq!(set.conditions.len(), 2);
            assert!(matches!(set.conditions[1], Condition::All(_)));
        } else {
            panic!("Expected SET_ANY condition");
        }

        assert_eq!(condition.sensors(), vec!["door", "temp", "mode"]);
    }

    #[test]
    fn test_unknown_comparator_rejected() {
        let json = r#"{"conditionType": "BASE", "sensor": "x", "comparison": "!=", "value": 1}"#;
        assert!(serde_json::from_str::<Condition>(json).is_err());
    }

    #[test]
    fn test_comparator_symbols() {
        for (comparator, symbol) in [
            (Comparator::Eq, "="),
            (Comparator::Lt, "<"),
            (Comparator::Gt, ">"),
            (Comparator::Le, "<="),
            (Comparator::Ge, ">="),
        ] {
            assert_eq!(comparator.to_string(), symbol);
            let parsed: Comparator = serde_json::from_str(&format!("\"{}\"", symbol)).unwrap();
            assert_eq!(parsed, comparator);
        }

        assert!(!Comparator::Eq.is_ordering());
        assert!(Comparator::Ge.is_ordering());
    }
}
