//! Engine configuration

use serde::{Deserialize, Serialize};

/// What a flow does when an actuator rejects a SET
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorErrorPolicy {
    /// Log the error and continue with the next instruction
    #[default]
    Log,
    /// Fail the flow
    Fail,
}

/// Settings shared by every flow an engine runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub actuator_errors: ActuatorErrorPolicy,

    /// Yield to the scheduler after this many GOTO jumps (0 never yields)
    pub jump_yield_interval: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actuator_errors: ActuatorErrorPolicy::Log,
            jump_yield_interval: 1,
        }
    }
}
