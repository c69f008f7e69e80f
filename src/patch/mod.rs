//! The patch engine: hook registration, back-reference resolution and
//! instruction injection.
//!
//! Patching happens in passes. A pass scans a cloned working copy of a method
//! body with a [`crate::il::Cursor`], injects callback trampolines behind matched
//! sites, and commits the rewritten body back into the host's method table in one
//! step. Either every site of a pass is injected or none is; a shape mismatch
//! aborts the pass, releases the hooks it registered, and leaves the pristine
//! body in place.
//!
//! # Key Types
//! - [`HookTable`] - registered injected callbacks, addressed by [`HookToken`]
//! - [`SubstitutionTable`] - literal-to-callback map driving [`replace_literals`]
//! - [`PatchPass`] - record of a committed pass: sites injected, tokens registered
//!
//! # Main Functions
//! - [`replace_literals`] - inject a callback behind every matched string literal
//! - [`suppress_branch`] - inject a callback over a compare-operand load
//! - [`back_ref_field`] - resolve a step-body's hidden back-reference field

mod injector;
mod resolver;

use std::sync::Arc;

use crate::host::World;
use crate::il::{HookToken, Value};

pub use injector::{replace_literals, suppress_branch, PatchPass, PatchSite, SubstitutionTable};
pub use resolver::back_ref_field;

/// An injected callback.
///
/// Receives the world, the value the original instruction produced, and the
/// instance the patched method is executing on; returns the value to leave on the
/// evaluation stack in its place.
pub type HookFn = Arc<dyn Fn(&mut World, Value, Value) -> Value>;

/// Registry of injected callbacks.
///
/// Tokens are slot indices. Releasing a token clears its slot without shifting
/// the others, so tokens embedded in committed bodies stay stable; the backing
/// storage is reclaimed once every slot is clear.
#[derive(Default)]
pub struct HookTable {
    slots: Vec<Option<HookFn>>,
}

impl HookTable {
    /// Registers a callback and returns its token.
    pub fn register(&mut self, hook: HookFn) -> HookToken {
        self.slots.push(Some(hook));
        HookToken(self.slots.len() as u32 - 1)
    }

    /// Releases the callback behind `token`; releasing an unknown or already
    /// released token is a no-op.
    pub fn release(&mut self, token: HookToken) {
        if let Some(slot) = self.slots.get_mut(token.0 as usize) {
            *slot = None;
        }
        if self.slots.iter().all(Option::is_none) {
            self.slots.clear();
        }
    }

    /// The callback behind `token`, if still registered.
    pub fn get(&self, token: HookToken) -> Option<&HookFn> {
        self.slots.get(token.0 as usize).and_then(Option::as_ref)
    }

    /// Number of currently registered callbacks.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
