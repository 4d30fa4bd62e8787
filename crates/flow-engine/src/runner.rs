//! Block stepping with an explicit cursor
//!
//! The cursor is a stack of frames. The bottom frame is the active block's
//! top-level sequence; each IF branch being executed pushes one frame on top.
//! A frame's `next` index already points past the instruction that produced
//! it, so popping a finished branch resumes right after its IF and resuming
//! a WAIT continues right after the WAIT.

use flow_ast::{Ast, Condition, Instruction};
use flow_core::Snapshot;
use tracing::{debug, trace};

use crate::error::{FlowError, FlowResult};
use crate::evaluator::evaluate;
use crate::executor::{Directive, InstructionExecutor};

/// Outcome of one [`BlockRunner::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// An instruction ran, or a branch was entered or left
    Advanced,
    /// Paused on a WAIT, see [`BlockRunner::pending`]
    Suspended,
    /// Moved to the start of another block
    Jumped,
    /// The active block ran out of instructions
    Exhausted,
}

#[derive(Debug)]
struct Frame<'a> {
    sequence: &'a [Instruction],
    next: usize,
}

/// Runtime state of one flow: active block, cursor, pending wait
#[derive(Debug)]
pub struct BlockRunner<'a> {
    ast: &'a Ast,
    block: &'a str,
    frames: Vec<Frame<'a>>,
    pending: Option<&'a Condition>,
}

impl<'a> BlockRunner<'a> {
    /// Position a runner at the first instruction of the init block
    pub fn new(ast: &'a Ast) -> FlowResult<Self> {
        let mut runner = Self {
            ast,
            block: &ast.init_block_id,
            frames: Vec::new(),
            pending: None,
        };
        runner.enter_block(&ast.init_block_id)?;
        Ok(runner)
    }

    /// Discard the cursor and start over at the top of `block`
    pub fn enter_block(&mut self, block: &str) -> FlowResult<()> {
        let (id, sequence) = self
            .ast
            .blocks
            .get_key_value(block)
            .ok_or_else(|| FlowError::UnknownBlock(block.to_string()))?;

        self.block = id;
        self.frames.clear();
        self.frames.push(Frame {
            sequence,
            next: 0,
        });
        self.pending = None;
        Ok(())
    }

    /// Run the next instruction
    ///
    /// Finished branch frames are popped without running anything. While a
    /// wait is pending this returns [`Progress::Suspended`] and does nothing.
    pub fn step(
        &mut self,
        executor: &InstructionExecutor<'_>,
        snapshot: &Snapshot,
    ) -> FlowResult<Progress> {
        if self.pending.is_some() {
            return Ok(Progress::Suspended);
        }

        let Some(frame) = self.frames.last_mut() else {
            return Ok(Progress::Exhausted);
        };
        let sequence = frame.sequence;
        let Some(instruction) = sequence.get(frame.next) else {
            self.frames.pop();
            trace!(depth = self.frames.len(), "Sequence finished");
            return Ok(if self.frames.is_empty() {
                Progress::Exhausted
            } else {
                Progress::Advanced
            });
        };
        frame.next += 1;

        trace!(block = %self.block, opcode = instruction.opcode(), "Step");

        match executor.execute(instruction, snapshot)? {
            Directive::Continue => Ok(Progress::Advanced),
            Directive::Suspend(condition) => {
                debug!(block = %self.block, "Suspended on WAIT");
                self.pending = Some(condition);
                Ok(Progress::Suspended)
            }
            Directive::EnterBranch(sequence) => {
                self.frames.push(Frame { sequence, next: 0 });
                Ok(Progress::Advanced)
            }
            Directive::Jump(target) => {
                self.enter_block(target)?;
                debug!(block = %self.block, "Jumped");
                Ok(Progress::Jumped)
            }
        }
    }

    /// Re-check the pending wait against `snapshot`
    ///
    /// Returns true and clears the wait when its condition holds. A cleared
    /// wait is never re-checked, so each wait resumes at most once. Returns
    /// true when nothing is pending.
    pub fn try_resume(&mut self, snapshot: &Snapshot) -> FlowResult<bool> {
        let Some(condition) = self.pending else {
            return Ok(true);
        };

        if evaluate(condition, snapshot)? {
            debug!(block = %self.block, version = snapshot.version(), "WAIT satisfied");
            self.pending = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Condition of the pending wait, if suspended
    pub fn pending(&self) -> Option<&'a Condition> {
        self.pending
    }

    /// Active block id
    pub fn block(&self) -> &'a str {
        self.block
    }

    /// Number of frames on the cursor stack (1 = top-level of the block)
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActuatorErrorPolicy;
    use crate::testing::RecordingActuators;
    use flow_ast::Comparator;
    use flow_core::Value;

    /// Step until something other than `Advanced` happens
    fn run_until_pause(
        runner: &mut BlockRunner<'_>,
        executor: &InstructionExecutor<'_>,
        snapshot: &Snapshot,
    ) -> Progress {
        loop {
            match runner.step(executor, snapshot).unwrap() {
                Progress::Advanced => continue,
                other => return other,
            }
        }
    }

    fn values(actuators: &RecordingActuators) -> Vec<Value> {
        actuators.writes().into_iter().map(|(_, v)| v).collect()
    }

    #[test]
    fn test_sequential_sets_then_exhausted() {
        let ast = Ast::new(
            "main",
            [("main", vec![Instruction::set("a", 1), Instruction::set("a", 2)])],
        );
        let actuators = RecordingActuators::new();
        let executor = InstructionExecutor::new(&actuators, ActuatorErrorPolicy::Log);
        let mut runner = BlockRunner::new(&ast).unwrap();
        let snapshot = Snapshot::default();

        assert_eq!(run_until_pause(&mut runner, &executor, &snapshot), Progress::Exhausted);
        assert_eq!(values(&actuators), vec![Value::from(1), Value::from(2)]);

        // Stays exhausted
        assert_eq!(runner.step(&executor, &snapshot).unwrap(), Progress::Exhausted);
        assert_eq!(actuators.writes().len(), 2);
    }

    #[test]
    fn test_false_branch_then_continue_after_if() {
        let ast = Ast::new(
            "main",
            [(
                "main",
                vec![
                    Instruction::if_else(
                        Condition::base("cond", Comparator::Eq, true),
                        vec![Instruction::set("a", 1)],
                        vec![Instruction::set("a", 2)],
                    ),
                    Instruction::set("b", 3),
                ],
            )],
        );
        let actuators = RecordingActuators::new();
        let executor = InstructionExecutor::new(&actuators, ActuatorErrorPolicy::Log);
        let mut runner = BlockRunner::new(&ast).unwrap();
        let snapshot: Snapshot = [("cond", false)].into_iter().collect();

        assert_eq!(run_until_pause(&mut runner, &executor, &snapshot), Progress::Exhausted);
        assert_eq!(
            actuators.writes(),
            vec![
                ("a".to_string(), Value::from(2)),
                ("b".to_string(), Value::from(3)),
            ]
        );
    }

    #[test]
    fn test_wait_inside_branch_resumes_in_place() {
        let ast = Ast::new(
            "main",
            [(
                "main",
                vec![
                    Instruction::if_else(
                        Condition::all(vec![]),
                        vec![
                            Instruction::set("a", 1),
                            Instruction::wait(Condition::base("s", Comparator::Gt, 5)),
                            Instruction::set("a", 2),
                        ],
                        vec![],
                    ),
                    Instruction::set("a", 3),
                ],
            )],
        );
        let actuators = RecordingActuators::new();
        let executor = InstructionExecutor::new(&actuators, ActuatorErrorPolicy::Log);
        let mut runner = BlockRunner::new(&ast).unwrap();

        let low: Snapshot = [("s", 3)].into_iter().collect();
        assert_eq!(run_until_pause(&mut runner, &executor, &low), Progress::Suspended);
        assert_eq!(runner.depth(), 2);
        assert!(runner.pending().is_some());

        // Stepping while suspended does nothing
        assert_eq!(runner.step(&executor, &low).unwrap(), Progress::Suspended);
        assert!(!runner.try_resume(&low).unwrap());

        let high = low.with("s", 6);
        assert!(runner.try_resume(&high).unwrap());
        assert!(runner.pending().is_none());

        assert_eq!(run_until_pause(&mut runner, &executor, &high), Progress::Exhausted);
        assert_eq!(
            values(&actuators),
            vec![Value::from(1), Value::from(2), Value::from(3)]
        );
    }

    #[test]
    fn test_goto_self_keeps_constant_state() {
        let ast = Ast::new(
            "loop",
            [(
                "loop",
                vec![
                    Instruction::if_else(Condition::any(vec![]), vec![], vec![]),
                    Instruction::goto("loop"),
                ],
            )],
        );
        let actuators = RecordingActuators::new();
        let executor = InstructionExecutor::new(&actuators, ActuatorErrorPolicy::Log);
        let mut runner = BlockRunner::new(&ast).unwrap();
        let snapshot = Snapshot::default();

        for _ in 0..10_000 {
            assert_eq!(run_until_pause(&mut runner, &executor, &snapshot), Progress::Jumped);
            assert_eq!(runner.depth(), 1);
            assert_eq!(runner.block(), "loop");
        }
    }

    #[test]
    fn test_goto_abandons_rest_of_block() {
        let ast = Ast::new(
            "first",
            [
                (
                    "first",
                    vec![Instruction::goto("second"), Instruction::set("never", 0)],
                ),
                ("second", vec![Instruction::set("reached", true)]),
            ],
        );
        let actuators = RecordingActuators::new();
        let executor = InstructionExecutor::new(&actuators, ActuatorErrorPolicy::Log);
        let mut runner = BlockRunner::new(&ast).unwrap();
        let snapshot = Snapshot::default();

        assert_eq!(runner.step(&executor, &snapshot).unwrap(), Progress::Jumped);
        assert_eq!(runner.block(), "second");
        assert_eq!(run_until_pause(&mut runner, &executor, &snapshot), Progress::Exhausted);
        assert_eq!(
            actuators.writes(),
            vec![("reached".to_string(), Value::Bool(true))]
        );
    }

    #[test]
    fn test_jump_to_unknown_block_fails() {
        // Built without validation
        let ast = Ast::new("main", [("main", vec![Instruction::goto("missing")])]);
        let actuators = RecordingActuators::new();
        let executor = InstructionExecutor::new(&actuators, ActuatorErrorPolicy::Log);
        let mut runner = BlockRunner::new(&ast).unwrap();

        let err = runner.step(&executor, &Snapshot::default()).unwrap_err();
        assert_eq!(err, FlowError::UnknownBlock("missing".to_string()));
    }

    #[test]
    fn test_unknown_init_block() {
        let ast = Ast::new("nowhere", [("main", vec![])]);
        assert!(matches!(
            BlockRunner::new(&ast),
            Err(FlowError::UnknownBlock(ref id)) if id == "nowhere"
        ));
    }
}
