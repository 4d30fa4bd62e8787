//! Runtime errors

use flow_ast::Comparator;
use flow_core::{ActuatorError, BlockId, SensorId, ValueKind};
use thiserror::Error;

/// Condition evaluation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("sensor {0} has no value")]
    MissingSensor(SensorId),

    #[error("cannot compare {found} sensor {sensor} with {comparator} against a {reference} value")]
    TypeMismatch {
        sensor: SensorId,
        comparator: Comparator,
        found: ValueKind,
        reference: ValueKind,
    },
}

/// Errors that end a flow as failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("jump to undefined block {0}")]
    UnknownBlock(BlockId),

    #[error(transparent)]
    ActuatorWrite(#[from] ActuatorError),
}

/// Result type for condition evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Result type for flow stepping
pub type FlowResult<T> = Result<T, FlowError>;
