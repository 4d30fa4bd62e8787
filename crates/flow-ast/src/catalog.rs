//! Known devices a program may reference

use std::collections::{HashMap, HashSet};

use flow_core::{ActuatorId, SensorId, ValueRange};

/// Sensors and actuators available to a deployment
///
/// Actuators may carry a numeric range; SET values outside it are rejected
/// by [`Ast::validate_against`](crate::Ast::validate_against).
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    sensors: HashSet<SensorId>,
    actuators: HashMap<ActuatorId, Option<ValueRange>>,
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a sensor
    pub fn with_sensor(mut self, sensor: impl Into<SensorId>) -> Self {
        self.add_sensor(sensor);
        self
    }

    /// Declare an actuator with an optional accepted range
    pub fn with_actuator(
        mut self,
        actuator: impl Into<ActuatorId>,
        range: Option<ValueRange>,
    ) -> Self {
        self.add_actuator(actuator, range);
        self
    }

    pub fn add_sensor(&mut self, sensor: impl Into<SensorId>) {
        self.sensors.insert(sensor.into());
    }

    pub fn add_actuator(&mut self, actuator: impl Into<ActuatorId>, range: Option<ValueRange>) {
        self.actuators.insert(actuator.into(), range);
    }

    pub fn has_sensor(&self, sensor: &str) -> bool {
        self.sensors.contains(sensor)
    }

    pub fn has_actuator(&self, actuator: &str) -> bool {
        self.actuators.contains_key(actuator)
    }

    /// Range for an actuator, `None` when undeclared or unbounded
    pub fn actuator_range(&self, actuator: &str) -> Option<ValueRange> {
        self.actuators.get(actuator).copied().flatten()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn actuator_count(&self) -> usize {
        self.actuators.len()
    }
}
