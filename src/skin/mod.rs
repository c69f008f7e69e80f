//! Per-instance reskinning: override records and their attribute source.
//!
//! A skin is a frozen [`SkinOverrides`] record built once from map-data attributes
//! and attached to individual entities as a capability. The patched host methods
//! stay shared across all instances; at each substitution point the injected
//! callback checks whether the executing instance carries a record and substitutes
//! from it, so entities without one observe the host's stock behavior bit for bit.
//!
//! # Key Types
//! - [`Attrs`] - string-keyed attribute map, as parsed from map data
//! - [`SkinOverrides`] - the per-skin override record
//! - [`hooks::SkinHooks`] - lifecycle managing installation of the whole feature

pub mod hooks;

use std::collections::HashMap;

use crate::host::{Color, ParticleSlots, ParticleType};

pub use hooks::SkinHooks;

/// String-keyed attributes of one map-data entity definition.
///
/// Missing keys read as the empty string; the override record treats empty as
/// "not customized" where the host needs a usable value.
#[derive(Debug, Clone, Default)]
pub struct Attrs {
    values: HashMap<String, String>,
}

impl Attrs {
    /// Creates an empty attribute map.
    pub fn new() -> Self {
        Attrs::default()
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// The attribute value, or the empty string when absent.
    pub fn attr(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    /// The attribute parsed as a boolean, or `default` when absent or unparsable.
    pub fn attr_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key).map(String::as_str) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => default,
            },
            None => default,
        }
    }
}

/// The frozen override record of one skin.
///
/// Built once from attributes at entity-construction time and never mutated
/// afterwards, so it can be shared behind an [`std::sync::Arc`] by every callback
/// that substitutes from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinOverrides {
    /// Sprite identifier; empty means keep the host default.
    pub sprite: String,
    /// Ghost-variant sprite identifier; empty means keep the host default.
    pub ghost_sprite: String,
    /// Pulse sound event path.
    pub pulse_sound: String,
    /// Touch sound event path.
    pub touch_sound: String,
    /// Ghost-variant touch sound event path.
    pub alt_touch_sound: String,
    /// Collection sound event path.
    pub get_sound: String,
    /// Whether the animation-driven pulse effect fires for this skin.
    pub pulse_enabled: bool,
    /// Glow particle descriptor.
    pub glow: ParticleType,
    /// Ghost-variant glow particle descriptor.
    pub ghost_glow: ParticleType,
}

impl SkinOverrides {
    /// Builds the record from map-data attributes.
    ///
    /// Particle colors are parsed as hex triplets and layered over the host's
    /// default descriptors in `defaults`; an absent or malformed color keeps the
    /// default channel. The pulse defaults to enabled.
    pub fn from_attrs(attrs: &Attrs, defaults: &ParticleSlots) -> Self {
        SkinOverrides {
            sprite: attrs.attr("sprite").to_string(),
            ghost_sprite: attrs.attr("ghostSprite").to_string(),
            pulse_sound: attrs.attr("pulseSound").to_string(),
            touch_sound: attrs.attr("touchSound").to_string(),
            alt_touch_sound: attrs.attr("altTouchSound").to_string(),
            get_sound: attrs.attr("getSound").to_string(),
            pulse_enabled: attrs.attr_bool("pulseEnabled", true),
            glow: defaults.glow().recolored(
                Color::from_hex(attrs.attr("particleColor1")),
                Color::from_hex(attrs.attr("particleColor2")),
            ),
            ghost_glow: defaults.ghost_glow().recolored(
                Color::from_hex(attrs.attr("ghostParticleColor1")),
                Color::from_hex(attrs.attr("ghostParticleColor2")),
            ),
        }
    }
}
