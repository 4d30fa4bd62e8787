//! Core types for flow automation
//!
//! This crate provides the fundamental types shared by every flow crate:
//! sensor and actuator payloads, sensor snapshots, and the traits the flow
//! engine uses to talk to the sensor and actuator subsystems.

mod collaborator;
mod snapshot;
mod value;

pub use collaborator::{ActuatorError, ActuatorResult, ActuatorSink, SensorSource};
pub use snapshot::Snapshot;
pub use value::{Value, ValueKind, ValueRange};

/// Identifier of a sensor (e.g., "greenhouse_temp")
pub type SensorId = String;

/// Identifier of an actuator (e.g., "vent_motor")
pub type ActuatorId = String;

/// Identifier of a block within a flow program
pub type BlockId = String;
