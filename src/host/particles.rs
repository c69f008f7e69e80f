//! Shared mutable particle-effect slots and the scoped override discipline.
//!
//! The host keeps one "current particle effect" descriptor per category in shared
//! mutable slots that its own logic reads mid-call. The only safe way to override
//! them per instance is [`with_slot_overrides`]: save the current slot values,
//! optionally write the instance's descriptors, invoke the wrapped call, and
//! restore the saved values unconditionally - on every exit path, including a
//! wrapped call that returns an error.
//!
//! # Re-entrancy
//!
//! Each nesting level saves into its own stack frame, so the save/restore pair is
//! correct under single-threaded re-entrancy. The discipline is not a mutex: slot
//! access must stay confined to one logical thread of control per call.

use crate::host::Position;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Parses an `rrggbb` hex triplet; returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color(r, g, b))
    }
}

/// A particle-effect descriptor: the color pair the emitter interpolates between.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleType {
    /// Primary color.
    pub color: Color,
    /// Secondary color.
    pub color2: Color,
}

impl ParticleType {
    /// Copies this descriptor with both colors replaced where provided.
    pub fn recolored(&self, color: Option<Color>, color2: Option<Color>) -> ParticleType {
        ParticleType {
            color: color.unwrap_or(self.color),
            color2: color2.unwrap_or(self.color2),
        }
    }
}

/// One particle emission observed from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEvent {
    /// The descriptor that was current in the slot when the host emitted.
    pub particle: ParticleType,
    /// Where the particle was emitted.
    pub position: Position,
}

/// The process-wide particle-effect slots, one per collectible glow category.
pub struct ParticleSlots {
    glow: ParticleType,
    ghost_glow: ParticleType,
    events: Vec<ParticleEvent>,
}

impl ParticleSlots {
    /// Creates the slots with the host's default glow descriptors.
    pub fn new(glow: ParticleType, ghost_glow: ParticleType) -> Self {
        ParticleSlots {
            glow,
            ghost_glow,
            events: Vec::new(),
        }
    }

    /// The current glow descriptor.
    pub fn glow(&self) -> &ParticleType {
        &self.glow
    }

    /// The current ghost-glow descriptor.
    pub fn ghost_glow(&self) -> &ParticleType {
        &self.ghost_glow
    }

    /// Reads both slots, in `(glow, ghost_glow)` order.
    pub fn snapshot(&self) -> (ParticleType, ParticleType) {
        (self.glow.clone(), self.ghost_glow.clone())
    }

    /// Writes both slots.
    pub fn set_slots(&mut self, glow: ParticleType, ghost_glow: ParticleType) {
        self.glow = glow;
        self.ghost_glow = ghost_glow;
    }

    /// Restores a previously taken snapshot.
    pub fn restore(&mut self, saved: (ParticleType, ParticleType)) {
        self.glow = saved.0;
        self.ghost_glow = saved.1;
    }

    /// Emits a particle with the given descriptor.
    pub fn emit(&mut self, particle: ParticleType, position: Position) {
        self.events.push(ParticleEvent { particle, position });
    }

    /// Particle emissions observed so far, in order.
    pub fn events(&self) -> &[ParticleEvent] {
        &self.events
    }

    /// Drains the recorded emissions.
    pub fn take_events(&mut self) -> Vec<ParticleEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Runs `f` with the particle slots temporarily replaced by `overrides`.
///
/// The slots are reached through `slots` on the carrier (the host, or anything
/// else that owns them), saved before and restored after `f` regardless of its
/// outcome. When `overrides` is `None` the save/restore pair still runs; restoring
/// the same values is a no-op, so non-overridden instances observe the host's
/// unmodified behavior.
pub fn with_slot_overrides<C, R>(
    carrier: &mut C,
    slots: fn(&mut C) -> &mut ParticleSlots,
    overrides: Option<(ParticleType, ParticleType)>,
    f: impl FnOnce(&mut C) -> R,
) -> R {
    let saved = slots(carrier).snapshot();
    if let Some((glow, ghost_glow)) = overrides {
        slots(carrier).set_slots(glow, ghost_glow);
    }
    let result = f(carrier);
    slots(carrier).restore(saved);
    result
}
