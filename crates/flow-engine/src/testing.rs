//! Test doubles

use std::sync::Mutex;

use flow_core::{ActuatorError, ActuatorId, ActuatorResult, ActuatorSink, Value};

/// Actuator sink that records every write
pub struct RecordingActuators {
    writes: Mutex<Vec<(ActuatorId, Value)>>,
    failing: Option<ActuatorId>,
}

impl RecordingActuators {
    pub fn new() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            failing: None,
        }
    }

    /// Reject every write to `actuator`
    pub fn failing(actuator: &str) -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            failing: Some(actuator.to_string()),
        }
    }

    pub fn writes(&self) -> Vec<(ActuatorId, Value)> {
        self.writes.lock().unwrap().clone()
    }
}

impl ActuatorSink for RecordingActuators {
    fn set(&self, actuator: &str, value: &Value) -> ActuatorResult<()> {
        if self.failing.as_deref() == Some(actuator) {
            return Err(ActuatorError::WriteFailed {
                actuator: actuator.to_string(),
                reason: "test failure".to_string(),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((actuator.to_string(), value.clone()));
        Ok(())
    }
}
