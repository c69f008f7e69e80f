//! CIL-flavored instruction model.
//!
//! This module defines the [`Instruction`] enum that method bodies are made of, plus
//! the operand newtypes ([`Label`], [`HookToken`]) and the match helpers used by the
//! instruction scanner. The set is the minimal CIL subset the closed host emits at
//! the seams this crate patches: literal loads, locals, fields, virtual calls into
//! host services, and conditional branches.
//!
//! # Key Types
//! - [`Instruction`] - A single decoded instruction with its operand
//! - [`Label`] - A branch target, resolved through the owning body's label table
//! - [`HookToken`] - Reference to an injected substitution callback
//!
//! Branch operands are labels rather than raw indices so that inserting
//! instructions during a patch pass cannot silently retarget a branch.

use std::sync::Arc;

/// A branch target within one method body.
///
/// Labels index into the owning [`crate::il::MethodBody`]'s label table, which maps
/// each label to an instruction index. Keeping branches symbolic means a patch pass
/// that inserts instructions only has to shift the label table, never rewrite
/// branch operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub usize);

/// Reference to a substitution callback registered in a [`crate::patch::HookTable`].
///
/// `Hook` instructions are never present in pristine host bodies; they are emitted
/// by the injection engine and resolved against the hook table at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookToken(pub u32);

/// A single instruction of a compiled method body.
///
/// The stack discipline mirrors CIL: loads push one value, `Callvirt` pops its
/// arguments in reverse push order, branches pop their operands. [`Instruction::Hook`]
/// pops `(instance, original)` and pushes the callback's replacement value, so the
/// net stack effect of an injected `Ldarg0`/`Ldfld`/`Hook` sequence after a literal
/// load is zero - the surrounding code is undisturbed.
#[derive(Debug, Clone, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Instruction {
    /// No operation.
    Nop,
    /// Push a literal string constant.
    Ldstr(Arc<str>),
    /// Push a 32-bit integer constant.
    LdcI4(i32),
    /// Push the `this` reference (the entity, or the state-machine frame in a
    /// generated step-body).
    Ldarg0,
    /// Push the value of a local variable slot.
    Ldloc(u16),
    /// Pop into a local variable slot.
    Stloc(u16),
    /// Pop an object reference and push the named field's value.
    Ldfld(String),
    /// Pop a value and an object reference and store the value into the named field.
    Stfld(String),
    /// Invoke a host service by name, popping its arguments from the stack.
    Callvirt(String),
    /// Unconditional branch.
    Br(Label),
    /// Pop one value; branch if it is truthy.
    Brtrue(Label),
    /// Pop two values; branch if they are equal.
    Beq(Label),
    /// Invoke an injected substitution callback: pops `(instance, original)`,
    /// pushes the replacement value.
    Hook(HookToken),
    /// Return, leaving at most one value on the stack as the result.
    Ret,
}

impl Instruction {
    /// Returns true if this is a load of the given literal string constant.
    pub fn match_ldstr(&self, literal: &str) -> bool {
        matches!(self, Instruction::Ldstr(s) if &**s == literal)
    }

    /// Returns true if this is a virtual call to the named host method.
    pub fn match_callvirt(&self, name: &str) -> bool {
        matches!(self, Instruction::Callvirt(n) if n == name)
    }

    /// Returns true if this loads the given local variable slot.
    pub fn match_ldloc(&self, slot: u16) -> bool {
        matches!(self, Instruction::Ldloc(n) if *n == slot)
    }
}
