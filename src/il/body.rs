//! Method bodies: owned instruction streams with labels and version identity.
//!
//! A [`MethodBody`] is one compiled method of the closed host: an ordered instruction
//! sequence, a label table for branch targets, and - for generated step-bodies - a
//! [`StateMachine`] descriptor recording the synthesized fields of the enclosing
//! generated type. Bodies are mutable only during a one-time patch pass; the host
//! treats them as immutable while executing.
//!
//! # Identity
//!
//! A body's identity is `(full name, version)`. Every committed patch pass bumps the
//! version, so a cached reference to a pristine body can always be distinguished from
//! its patched successor.
//!
//! # Labels
//!
//! Branch operands are [`Label`]s resolved through the body's label table. Inserting
//! an instruction shifts every label at or after the insertion point, which keeps
//! branches pointing at the instruction they targeted before the insert - the same
//! guarantee an IL cursor gives.

use bitflags::bitflags;

use crate::il::{Instruction, Label};

bitflags! {
    /// Attribute flags of a method body.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BodyFlags: u32 {
        /// The body is a compiler-generated step-body of a restartable computation.
        const STATE_MACHINE = 0x0001;
        /// At least one patch pass has been committed against this body.
        const PATCHED = 0x0002;
    }
}

/// Shape descriptor of the generated type enclosing a step-body.
///
/// When the host turns a method into a restartable multi-step computation, the
/// compiler emits a state-holder type whose `MoveNext`-style body carries the step
/// logic. The descriptor records the original (kick-off) method name and the
/// synthesized field names of that type, among which the hidden back-reference to
/// the original instance is found by convention.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMachine {
    /// Name of the original method the state machine was generated from.
    pub kick_off: String,
    /// Field names synthesized onto the generated state-holder type.
    pub fields: Vec<String>,
}

/// One compiled method body of the closed host.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    name: String,
    declaring_type: String,
    version: u32,
    flags: BodyFlags,
    instructions: Vec<Instruction>,
    labels: Vec<usize>,
    state_machine: Option<StateMachine>,
}

impl MethodBody {
    /// Creates an empty body for `declaring_type::name`.
    pub fn new(declaring_type: &str, name: &str) -> Self {
        MethodBody {
            name: name.to_string(),
            declaring_type: declaring_type.to_string(),
            version: 0,
            flags: BodyFlags::empty(),
            instructions: Vec::new(),
            labels: Vec::new(),
            state_machine: None,
        }
    }

    /// Creates an empty generated step-body with the given state-machine descriptor.
    pub fn new_state_machine(
        declaring_type: &str,
        name: &str,
        state_machine: StateMachine,
    ) -> Self {
        let mut body = MethodBody::new(declaring_type, name);
        body.flags |= BodyFlags::STATE_MACHINE;
        body.state_machine = Some(state_machine);
        body
    }

    /// The method name (without the declaring type).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully qualified `DeclaringType::Name` of this method.
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.declaring_type, self.name)
    }

    /// The body's version; bumped by every committed patch pass.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The body's attribute flags.
    pub fn flags(&self) -> BodyFlags {
        self.flags
    }

    /// Marks the body as patched and bumps its version.
    pub fn mark_patched(&mut self) {
        self.flags |= BodyFlags::PATCHED;
        self.version += 1;
    }

    /// Whether this body is a generated step-body.
    ///
    /// Detection is by shape (the [`BodyFlags::STATE_MACHINE`] flag) or by the
    /// compiler's naming convention for step methods.
    pub fn is_state_machine(&self) -> bool {
        self.flags.contains(BodyFlags::STATE_MACHINE) || self.name.contains("MoveNext")
    }

    /// The state-machine descriptor, if this is a generated step-body.
    pub fn state_machine(&self) -> Option<&StateMachine> {
        self.state_machine.as_ref()
    }

    /// Number of instructions in the body.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the body contains no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds; callers iterate within `0..len()`.
    pub fn instruction(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }

    /// All instructions, in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Appends an instruction at the end of the body.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Inserts an instruction at `index`, shifting labels at or after it.
    pub fn insert(&mut self, index: usize, instruction: Instruction) {
        self.instructions.insert(index, instruction);
        for target in &mut self.labels {
            if *target >= index {
                *target += 1;
            }
        }
    }

    /// Allocates a new, unplaced label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(usize::MAX);
        Label(self.labels.len() - 1)
    }

    /// Places `label` at the next instruction to be pushed.
    pub fn place_label(&mut self, label: Label) {
        self.labels[label.0] = self.instructions.len();
    }

    /// Resolves a label to its instruction index.
    pub fn label_target(&self, label: Label) -> crate::Result<usize> {
        match self.labels.get(label.0) {
            Some(&target) if target != usize::MAX => Ok(target),
            _ => Err(eval_error!(
                "branch to unplaced label {} in {}",
                label.0,
                self.full_name()
            )),
        }
    }
}
