//! Instruction types
//!
//! Instructions are the building blocks of a flow block. IF carries its two
//! branches inline; they are nested sequences, not block references, and
//! cannot be jumped to.

use flow_core::{ActuatorId, BlockId, Value};
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Flow instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "opcode", content = "arguments")]
pub enum Instruction {
    /// Write a value to an actuator
    #[serde(rename = "SET")]
    Set(SetInstruction),

    /// Pause until a condition holds
    #[serde(rename = "WAIT")]
    Wait(WaitInstruction),

    /// Run one of two nested sequences
    #[serde(rename = "IF")]
    If(IfInstruction),

    /// Continue in another block
    #[serde(rename = "GOTO")]
    Goto(GotoInstruction),
}

impl Instruction {
    pub fn set(actuator: impl Into<ActuatorId>, value: impl Into<Value>) -> Self {
        Instruction::Set(SetInstruction {
            actuator: actuator.into(),
            value: value.into(),
        })
    }

    pub fn wait(condition: Condition) -> Self {
        Instruction::Wait(WaitInstruction { condition })
    }

    pub fn if_else(
        condition: Condition,
        true_case: Vec<Instruction>,
        false_case: Vec<Instruction>,
    ) -> Self {
        Instruction::If(IfInstruction {
            condition,
            true_case,
            false_case,
        })
    }

    pub fn goto(block: impl Into<BlockId>) -> Self {
        Instruction::Goto(GotoInstruction {
            block: block.into(),
        })
    }

    /// Opcode name as written in programs
    pub fn opcode(&self) -> &'static str {
        match self {
            Instruction::Set(_) => "SET",
            Instruction::Wait(_) => "WAIT",
            Instruction::If(_) => "IF",
            Instruction::Goto(_) => "GOTO",
        }
    }
}

/// SET arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetInstruction {
    pub actuator: ActuatorId,
    pub value: Value,
}

/// WAIT arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitInstruction {
    pub condition: Condition,
}

/// IF arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfInstruction {
    pub condition: Condition,

    /// Runs when the condition holds
    #[serde(rename = "instructions_true_case", default)]
    pub true_case: Vec<Instruction>,

    /// Runs otherwise
    #[serde(rename = "instructions_false_case", default)]
    pub false_case: Vec<Instruction>,
}

/// GOTO arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotoInstruction {
    pub block: BlockId,
}
