//! Instruction injection passes over method bodies.
//!
//! Both passes here follow the same discipline: clone the target body, scan and
//! rewrite the clone, and commit it back in one assignment. The commit bumps the
//! body's version and sets [`crate::il::BodyFlags::PATCHED`], so a failed pass is
//! indistinguishable from no pass at all.
//!
//! The trampoline shape is fixed: the value the original instruction produced is
//! already on the stack, the injected code loads the instance (through the
//! back-reference field inside generated step-bodies) and dispatches through a
//! [`HookToken`]. The callback's return value replaces the original on the stack,
//! which is what makes substitution per-instance: the callback inspects the
//! instance it was handed and decides.

use std::sync::Arc;

use crate::il::{callvirt, ldloc, ldstr, Cursor, HookToken, Instruction, MethodBody, MoveType};
use crate::patch::{back_ref_field, HookFn, HookTable};
use crate::{Error, Result};

/// One injected trampoline: where, and what was matched there.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSite {
    /// Fully qualified name of the patched method.
    pub method: String,
    /// Instruction index of the match within the rewritten stream.
    pub index: usize,
    /// The literal or call name the site matched.
    pub matched: String,
}

/// Record of a committed patch pass.
pub struct PatchPass {
    /// Every site the pass injected, in stream order per literal.
    pub sites: Vec<PatchSite>,
    /// Tokens the pass registered; releasing them disables the injected callbacks.
    pub tokens: Vec<HookToken>,
}

/// Literal-to-callback map for [`replace_literals`].
///
/// Insertion order is scan order. Duplicate literals are rejected at build time;
/// two callbacks behind one literal would make the committed body depend on table
/// iteration order.
#[derive(Default)]
pub struct SubstitutionTable {
    entries: Vec<(Arc<str>, HookFn)>,
}

impl SubstitutionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        SubstitutionTable::default()
    }

    /// Adds a callback for `literal`.
    pub fn insert(&mut self, literal: &str, hook: HookFn) -> Result<()> {
        if self.entries.iter().any(|(known, _)| known.as_ref() == literal) {
            return Err(Error::DuplicateLiteral(literal.to_string()));
        }
        self.entries.push((Arc::from(literal), hook));
        Ok(())
    }

    /// Number of literals in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Injects a callback trampoline behind every load of each literal in `table`.
///
/// Each literal is scanned for across the whole stream, every occurrence gets the
/// trampoline, and a literal with no occurrences is skipped without error. A pass
/// that matches no site at all commits nothing and leaves the body's version
/// untouched. Inside
/// a generated step-body the instance is loaded through the synthesized
/// back-reference field, which is resolved up front; a step-body without one
/// fails the pass before any site is touched.
pub fn replace_literals(
    body: &mut MethodBody,
    table: &SubstitutionTable,
    hooks: &mut HookTable,
) -> Result<PatchPass> {
    let mut working = body.clone();
    let back_ref = if working.is_state_machine() {
        Some(back_ref_field(&working)?)
    } else {
        None
    };

    let full_name = working.full_name();
    let mut sites = Vec::new();
    let mut tokens = Vec::new();
    let mut cursor = Cursor::new(&mut working);

    for (literal, hook) in &table.entries {
        cursor.set_index(0);
        let pattern = ldstr(literal);
        let mut token = None;

        while cursor.try_goto_next(MoveType::After, &[&pattern]) {
            let token = *token.get_or_insert_with(|| {
                let token = hooks.register(hook.clone());
                tokens.push(token);
                token
            });

            log::debug!(
                "injecting literal trampoline for {:?} at {} in {}",
                literal,
                cursor.index() - 1,
                full_name
            );
            sites.push(PatchSite {
                method: full_name.clone(),
                index: cursor.index() - 1,
                matched: literal.to_string(),
            });

            cursor.emit(Instruction::Ldarg0);
            if let Some(field) = &back_ref {
                cursor.emit(Instruction::Ldfld(field.clone()));
            }
            cursor.emit(Instruction::Hook(token));
        }
    }

    // Nothing matched, nothing committed: the body keeps its version.
    if !sites.is_empty() {
        working.mark_patched();
        *body = working;
    }
    Ok(PatchPass { sites, tokens })
}

/// Injects a callback over the comparand load of a branch condition.
///
/// Matches the two-instruction window `callvirt call_name; ldloc local` and
/// places the trampoline past it, so the callback receives the loaded comparand
/// and can return a sentinel the other operand can never equal, steering the
/// branch without rewriting it. Only the first occurrence is patched; a body
/// without the window is left untouched and reported as `None`.
pub fn suppress_branch(
    body: &mut MethodBody,
    call_name: &str,
    local: u16,
    hook: HookFn,
    hooks: &mut HookTable,
) -> Result<Option<(PatchSite, HookToken)>> {
    let mut working = body.clone();
    let full_name = working.full_name();

    let mut cursor = Cursor::new(&mut working);
    let call = callvirt(call_name);
    let load = ldloc(local);
    if !cursor.try_goto_next(MoveType::After, &[&call, &load]) {
        return Ok(None);
    }

    let token = hooks.register(hook);
    let site = PatchSite {
        method: full_name.clone(),
        index: cursor.index() - 2,
        matched: call_name.to_string(),
    };
    log::debug!(
        "injecting branch trampoline over {} at {} in {}",
        call_name,
        site.index,
        full_name
    );

    cursor.emit(Instruction::Ldarg0);
    cursor.emit(Instruction::Hook(token));

    working.mark_patched();
    *body = working;
    Ok(Some((site, token)))
}
