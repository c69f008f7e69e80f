//! Instruction scanner: cursor positioning and pattern matching over method bodies.
//!
//! The [`Cursor`] walks a method body looking for sub-sequences matching a declared
//! pattern - a slice of per-instruction predicates - and supports inserting new
//! instructions at the match point. The API mirrors an IL cursor: `try_goto_next`
//! either repositions the cursor and returns `true`, or leaves it unchanged and
//! returns `false`. No match is not an error; a host method that never references a
//! given resource is valid.
//!
//! # Enumeration
//!
//! With [`MoveType::After`], the cursor lands past the matched window, so repeated
//! `try_goto_next` calls enumerate all non-overlapping matches. [`Cursor::set_index`]
//! resets the scan so each distinct literal target is searched across the whole
//! stream, not just after the prior match point.
//!
//! # Example
//!
//! ```rust
//! use ilweave::il::{Cursor, Instruction, MethodBody, MoveType};
//!
//! let mut body = MethodBody::new("Collectible", "OnPlayer");
//! body.push(Instruction::Ldstr("event:/collect/touch".into()));
//! body.push(Instruction::Ret);
//!
//! let mut cursor = Cursor::new(&mut body);
//! let pattern = ilweave::il::ldstr("event:/collect/touch");
//! assert!(cursor.try_goto_next(MoveType::After, &[&pattern]));
//! assert_eq!(cursor.index(), 1);
//! ```

use crate::il::{Instruction, MethodBody};

/// Where the cursor lands relative to a matched window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    /// Position the cursor on the first instruction of the match.
    Before,
    /// Position the cursor immediately past the last instruction of the match.
    After,
}

/// A per-instruction predicate; a pattern is an ordered slice of these.
pub type Predicate<'p> = &'p dyn Fn(&Instruction) -> bool;

/// Builds a predicate matching a load of the given literal string constant.
pub fn ldstr(literal: &str) -> impl Fn(&Instruction) -> bool + '_ {
    move |instr| instr.match_ldstr(literal)
}

/// Builds a predicate matching a virtual call to the named host method.
pub fn callvirt(name: &str) -> impl Fn(&Instruction) -> bool + '_ {
    move |instr| instr.match_callvirt(name)
}

/// Builds a predicate matching a load of the given local variable slot.
pub fn ldloc(slot: u16) -> impl Fn(&Instruction) -> bool {
    move |instr| instr.match_ldloc(slot)
}

/// A position within a method body's instruction stream, with the ability to
/// resume scanning and to insert instructions at the current position.
pub struct Cursor<'a> {
    body: &'a mut MethodBody,
    index: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `body`.
    pub fn new(body: &'a mut MethodBody) -> Self {
        Cursor { body, index: 0 }
    }

    /// The current instruction index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Repositions the cursor; `set_index(0)` restarts the scan.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Scans forward from the current position for the next window matching
    /// `pattern`, positioning the cursor per `move_type`.
    ///
    /// Returns `false` without moving the cursor when no further match exists.
    pub fn try_goto_next(&mut self, move_type: MoveType, pattern: &[Predicate<'_>]) -> bool {
        if pattern.is_empty() {
            return false;
        }

        let len = self.body.len();
        let mut start = self.index;
        while start + pattern.len() <= len {
            let matched = pattern
                .iter()
                .enumerate()
                .all(|(offset, pred)| pred(self.body.instruction(start + offset)));
            if matched {
                self.index = match move_type {
                    MoveType::Before => start,
                    MoveType::After => start + pattern.len(),
                };
                return true;
            }
            start += 1;
        }

        false
    }

    /// Inserts `instruction` at the cursor and advances past it.
    ///
    /// Subsequent scanning resumes after the emitted instruction, so injected code
    /// is never re-matched within the same pass.
    pub fn emit(&mut self, instruction: Instruction) {
        self.body.insert(self.index, instruction);
        self.index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn body_with_literals(literals: &[&str]) -> MethodBody {
        let mut body = MethodBody::new("Collectible", "OnPlayer");
        for literal in literals {
            body.push(Instruction::Ldstr(Arc::from(*literal)));
            body.push(Instruction::Callvirt("Audio::Play".to_string()));
        }
        body.push(Instruction::Ret);
        body
    }

    #[test]
    fn test_goto_next_after_positions_past_match() {
        let mut body = body_with_literals(&["a", "b"]);
        let mut cursor = Cursor::new(&mut body);
        let pattern = ldstr("b");
        assert!(cursor.try_goto_next(MoveType::After, &[&pattern]));
        assert_eq!(cursor.index(), 3);
    }

    #[test]
    fn test_goto_next_before_positions_on_match() {
        let mut body = body_with_literals(&["a", "b"]);
        let mut cursor = Cursor::new(&mut body);
        let pattern = ldstr("b");
        assert!(cursor.try_goto_next(MoveType::Before, &[&pattern]));
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn test_enumerates_all_non_overlapping_matches() {
        let mut body = body_with_literals(&["x", "x", "x"]);
        let mut cursor = Cursor::new(&mut body);
        let pattern = ldstr("x");
        let mut hits = 0;
        while cursor.try_goto_next(MoveType::After, &[&pattern]) {
            hits += 1;
        }
        assert_eq!(hits, 3);
    }

    #[test]
    fn test_no_match_leaves_cursor_unchanged() {
        let mut body = body_with_literals(&["a"]);
        let mut cursor = Cursor::new(&mut body);
        let pattern = ldstr("missing");
        assert!(!cursor.try_goto_next(MoveType::After, &[&pattern]));
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_structural_two_instruction_pattern() {
        let mut body = MethodBody::new("Collectible", "OnAnimate");
        body.push(Instruction::Ldarg0);
        body.push(Instruction::Callvirt(
            "Sprite::get_CurrentAnimationFrame".to_string(),
        ));
        body.push(Instruction::Ldloc(0));
        body.push(Instruction::Ret);

        let mut cursor = Cursor::new(&mut body);
        let call = callvirt("Sprite::get_CurrentAnimationFrame");
        let load = ldloc(0);
        assert!(cursor.try_goto_next(MoveType::After, &[&call, &load]));
        assert_eq!(cursor.index(), 3);

        // Only one occurrence; the scan does not find another.
        assert!(!cursor.try_goto_next(MoveType::After, &[&call, &load]));
    }

    #[test]
    fn test_set_index_restarts_the_scan() {
        let mut body = body_with_literals(&["a", "b"]);
        let mut cursor = Cursor::new(&mut body);
        let first = ldstr("b");
        assert!(cursor.try_goto_next(MoveType::After, &[&first]));

        cursor.set_index(0);
        let second = ldstr("a");
        assert!(cursor.try_goto_next(MoveType::After, &[&second]));
        assert_eq!(cursor.index(), 1);
    }

    #[test]
    fn test_emit_inserts_and_advances() {
        let mut body = body_with_literals(&["a"]);
        let mut cursor = Cursor::new(&mut body);
        let pattern = ldstr("a");
        assert!(cursor.try_goto_next(MoveType::After, &[&pattern]));
        cursor.emit(Instruction::Ldarg0);
        cursor.emit(Instruction::Hook(crate::il::HookToken(0)));

        assert_eq!(*body.instruction(1), Instruction::Ldarg0);
        assert_eq!(
            *body.instruction(2),
            Instruction::Hook(crate::il::HookToken(0))
        );
        assert_eq!(
            *body.instruction(3),
            Instruction::Callvirt("Audio::Play".to_string())
        );
    }
}
