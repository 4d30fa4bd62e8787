//! Interfaces the flow engine consumes from the sensor and actuator subsystems

use thiserror::Error;
use tokio::sync::broadcast;

use crate::{ActuatorId, Snapshot, Value};

/// Errors reported by an actuator subsystem
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActuatorError {
    #[error("actuator not found: {0}")]
    NotFound(ActuatorId),

    #[error("value {value} is outside [{min}, {max}] for actuator {actuator}")]
    OutOfRange {
        actuator: ActuatorId,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("write to actuator {actuator} failed: {reason}")]
    WriteFailed { actuator: ActuatorId, reason: String },
}

/// Result type for actuator writes
pub type ActuatorResult<T> = Result<T, ActuatorError>;

/// Source of sensor snapshots
///
/// Implementations publish a new [`Snapshot`] on every update, in version
/// order, to all subscribers.
pub trait SensorSource: Send + Sync {
    /// The current snapshot
    fn snapshot(&self) -> Snapshot;

    /// Subscribe to snapshot updates
    fn subscribe(&self) -> broadcast::Receiver<Snapshot>;
}

/// Sink for actuator set-commands
///
/// Writes are fire-and-forget: the call returns once the command has been
/// handed to the actuator, without waiting for the device to acknowledge it.
pub trait ActuatorSink: Send + Sync {
    fn set(&self, actuator: &str, value: &Value) -> ActuatorResult<()>;
}
