//! Single-instruction execution

use flow_ast::{Condition, Instruction, SetInstruction};
use flow_core::{ActuatorSink, Snapshot};
use tracing::{debug, trace, warn};

use crate::config::ActuatorErrorPolicy;
use crate::error::FlowResult;
use crate::evaluator::evaluate;

/// What the caller should do after an instruction ran
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive<'a> {
    /// Advance to the next instruction in the current sequence
    Continue,
    /// WAIT condition is not yet true
    Suspend(&'a Condition),
    /// Run this nested sequence before continuing past the IF
    EnterBranch(&'a [Instruction]),
    /// Abandon the current block and continue at the start of another
    Jump(&'a str),
}

/// Executes one instruction at a time
///
/// SET is the only instruction with an external effect. Writes are
/// fire-and-forget; a rejected write is logged or returned according to the
/// configured policy.
pub struct InstructionExecutor<'s> {
    actuators: &'s dyn ActuatorSink,
    policy: ActuatorErrorPolicy,
}

impl<'s> InstructionExecutor<'s> {
    pub fn new(actuators: &'s dyn ActuatorSink, policy: ActuatorErrorPolicy) -> Self {
        Self { actuators, policy }
    }

    /// Execute `instruction` against `snapshot`
    pub fn execute<'a>(
        &self,
        instruction: &'a Instruction,
        snapshot: &Snapshot,
    ) -> FlowResult<Directive<'a>> {
        match instruction {
            Instruction::Set(set) => {
                self.write(set)?;
                Ok(Directive::Continue)
            }
            Instruction::Wait(wait) => {
                if evaluate(&wait.condition, snapshot)? {
                    trace!("WAIT condition already true");
                    Ok(Directive::Continue)
                } else {
                    Ok(Directive::Suspend(&wait.condition))
                }
            }
            Instruction::If(branch) => {
                let taken = evaluate(&branch.condition, snapshot)?;
                debug!(taken, "IF branch");
                Ok(Directive::EnterBranch(if taken {
                    &branch.true_case
                } else {
                    &branch.false_case
                }))
            }
            Instruction::Goto(goto) => Ok(Directive::Jump(&goto.block)),
        }
    }

    fn write(&self, set: &SetInstruction) -> FlowResult<()> {
        debug!(actuator = %set.actuator, value = %set.value, "SET");

        match self.actuators.set(&set.actuator, &set.value) {
            Ok(()) => Ok(()),
            Err(err) => match self.policy {
                ActuatorErrorPolicy::Log => {
                    warn!(
                        actuator = %set.actuator,
                        error = %err,
                        "Actuator write failed, continuing"
                    );
                    Ok(())
                }
                ActuatorErrorPolicy::Fail => Err(err.into()),
            },
        }
    }
}
