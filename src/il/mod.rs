//! CIL-flavored instruction streams: model, scanning and evaluation.
//!
//! This module provides the substrate the patch engine works on. It includes the
//! instruction model, method bodies with label-based branch targets, the cursor
//! used to locate instruction patterns, and the stack-machine evaluator the host
//! runs its (possibly patched) bodies on.
//!
//! # Key Types
//! - [`Instruction`] - A single instruction with its operand
//! - [`MethodBody`] - One compiled method: instructions, labels, state-machine shape
//! - [`Cursor`] - Pattern scanning and instruction insertion
//! - [`Value`] - A value on the evaluation stack
//!
//! # Main Functions
//! - [`eval::run`] - Execute a body against the host world
//! - [`ldstr`] / [`callvirt`] / [`ldloc`] - Pattern predicate constructors

mod body;
mod cursor;
pub mod eval;
mod instruction;

pub use body::{BodyFlags, MethodBody, StateMachine};
pub use cursor::{callvirt, ldloc, ldstr, Cursor, MoveType, Predicate};
pub use eval::Value;
pub use instruction::{HookToken, Instruction, Label};
