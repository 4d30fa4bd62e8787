//! Flow interpreter
//!
//! Runs flow programs against a sensor source and an actuator sink. Each
//! started flow is an independent tokio task that steps instructions,
//! suspends on WAIT until a newer sensor snapshot satisfies the condition,
//! and ends as halted, cancelled or failed.
//!
//! # Architecture
//!
//! ```text
//! FlowEngine ──spawn──> FlowTask ──> BlockRunner ──> InstructionExecutor
//!                                         │                 │
//!                                         │                 ├──> evaluator (read-only)
//!                                         └─ frame stack    └──> ActuatorSink (write-only)
//! ```

mod config;
mod engine;
mod error;
pub mod evaluator;
mod executor;
mod flow;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ActuatorErrorPolicy, EngineConfig};
pub use engine::FlowEngine;
pub use error::{EvalError, EvalResult, FlowError, FlowResult};
pub use executor::{Directive, InstructionExecutor};
pub use flow::{FlowHandle, FlowId, FlowStatus};
pub use runner::{BlockRunner, Progress};
