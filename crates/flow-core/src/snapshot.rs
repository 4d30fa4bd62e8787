//! Versioned view of all sensor values

use std::collections::HashMap;
use std::sync::Arc;

use crate::{SensorId, Value};

/// A momentary, total view of sensor values
///
/// Snapshots are cheap to clone (the value map is shared) and carry a
/// version that increases with every update published by a sensor source.
/// Updates produce a new snapshot; an existing snapshot never changes.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    version: u64,
    values: Arc<HashMap<SensorId, Value>>,
}

impl Snapshot {
    /// Create a snapshot with an explicit version
    pub fn new(version: u64, values: HashMap<SensorId, Value>) -> Self {
        Self {
            version,
            values: Arc::new(values),
        }
    }

    /// Version of this snapshot (0 for a fresh one)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the current value of a sensor
    pub fn get(&self, sensor: &str) -> Option<&Value> {
        self.values.get(sensor)
    }

    /// Check whether a sensor has a value
    pub fn contains(&self, sensor: &str) -> bool {
        self.values.contains_key(sensor)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all (sensor, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&SensorId, &Value)> {
        self.values.iter()
    }

    /// Next version with one sensor updated
    pub fn with(&self, sensor: impl Into<SensorId>, value: impl Into<Value>) -> Self {
        self.with_many([(sensor.into(), value.into())])
    }

    /// Next version with several sensors updated at once
    pub fn with_many<I>(&self, updates: I) -> Self
    where
        I: IntoIterator<Item = (SensorId, Value)>,
    {
        let mut values = Arc::clone(&self.values);
        let map = Arc::make_mut(&mut values);
        for (sensor, value) in updates {
            map.insert(sensor, value);
        }
        Self {
            version: self.version + 1,
            values,
        }
    }

    /// Next version with a sensor removed
    pub fn without(&self, sensor: &str) -> Self {
        let mut values = Arc::clone(&self.values);
        Arc::make_mut(&mut values).remove(sensor);
        Self {
            version: self.version + 1,
            values,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Snapshot
where
    K: Into<SensorId>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(0, values)
    }
}
