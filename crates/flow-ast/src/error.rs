//! Load-time errors

use flow_core::{ActuatorId, BlockId, SensorId};
use thiserror::Error;

/// Reasons a flow program is rejected before it runs
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("init block {0} is not defined")]
    UnknownInitBlock(BlockId),

    #[error("block {block} jumps to undefined block {target}")]
    DanglingGoto { block: BlockId, target: BlockId },

    #[error("block {block} sets unknown actuator {actuator}")]
    UnknownActuator { block: BlockId, actuator: ActuatorId },

    #[error("block {block} reads unknown sensor {sensor}")]
    UnknownSensor { block: BlockId, sensor: SensorId },

    #[error("block {block} sets {actuator} to {value}, outside [{min}, {max}]")]
    ValueOutOfRange {
        block: BlockId,
        actuator: ActuatorId,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid JSON program: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML program: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for program loading
pub type LoadResult<T> = Result<T, LoadError>;
