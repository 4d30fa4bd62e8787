//! Flow program schema
//!
//! A flow program is a set of named blocks. Each block is an ordered list of
//! instructions that set actuators, wait for conditions over sensor values,
//! branch, or jump to another block.
//!
//! # Key Types
//!
//! - [`Ast`] - A complete program: blocks plus the block to start in
//! - [`Instruction`] - SET, WAIT, IF or GOTO
//! - [`Condition`] - A comparison on one sensor, or an ALL/ANY set of conditions
//! - [`DeviceCatalog`] - Known sensors and actuators for stricter validation
//!
//! The serde representation follows the JSON shape used by flow authoring
//! tools:
//!
//! ```json
//! {
//!   "initBlockID": "main",
//!   "blocks": {
//!     "main": [
//!       {"opcode": "SET", "arguments": {"actuator": "fan", "value": 1}},
//!       {"opcode": "GOTO", "arguments": {"block": "main"}}
//!     ]
//!   }
//! }
//! ```

mod catalog;
mod condition;
mod error;
mod instruction;
mod program;

pub use catalog::DeviceCatalog;
pub use condition::{BaseCondition, Comparator, Condition, ConditionSet};
pub use error::{LoadError, LoadResult};
pub use instruction::{GotoInstruction, IfInstruction, Instruction, SetInstruction, WaitInstruction};
pub use program::{Ast, Block};
