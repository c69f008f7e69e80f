//! Installation lifecycle of the reskinning feature.
//!
//! [`SkinHooks`] owns everything the feature changes about the host: the patch
//! passes over the four target methods, the branch suppression in the animation
//! handler, and the three call interceptions. Installation is transactional -
//! pristine bodies are saved first, and any failure rolls the host back to them -
//! and both install and uninstall are idempotent, so repeated lifecycle cycles
//! leave no residue in the method table, the hook table, or the interception
//! slots.

use std::collections::HashMap;
use std::sync::Arc;

use crate::host::{
    fixtures, intrinsics, with_slot_overrides, CollectWrapper, EntityId, EntityKind, Host,
    MapLoadWrapper, ParticleSlots, UpdateWrapper,
};
use crate::il::{HookToken, MethodBody, Value};
use crate::patch::{replace_literals, suppress_branch, HookFn, SubstitutionTable};
use crate::skin::SkinOverrides;
use crate::{Error, Result};

fn sprite(overrides: &SkinOverrides) -> &str {
    &overrides.sprite
}

fn ghost_sprite(overrides: &SkinOverrides) -> &str {
    &overrides.ghost_sprite
}

fn pulse_sound(overrides: &SkinOverrides) -> &str {
    &overrides.pulse_sound
}

fn touch_sound(overrides: &SkinOverrides) -> &str {
    &overrides.touch_sound
}

fn alt_touch_sound(overrides: &SkinOverrides) -> &str {
    &overrides.alt_touch_sound
}

fn get_sound(overrides: &SkinOverrides) -> &str {
    &overrides.get_sound
}

/// Builds the per-instance substitution callback for one override field.
///
/// The callback receives the value the original load produced and the executing
/// instance. An instance without an override record keeps the original value.
/// For overridden instances the policy is per field: with `empty_falls_back`
/// an empty override means "keep the host default" (the sprite identifiers,
/// where the host needs a resolvable name), without it the override substitutes
/// verbatim (the sound paths).
fn substitute_hook(accessor: fn(&SkinOverrides) -> &str, empty_falls_back: bool) -> HookFn {
    Arc::new(move |world, original, instance| {
        let Value::Entity(id) = instance else {
            return original;
        };
        match world.scene.entity(id).overrides() {
            Some(overrides) => {
                let replacement = accessor(overrides);
                if empty_falls_back && replacement.is_empty() {
                    original
                } else {
                    Value::Str(Arc::from(replacement))
                }
            }
            None => original,
        }
    })
}

/// Builds the pulse-toggle callback injected over the frame comparand.
///
/// For a skin with the pulse disabled, the callback returns `-1` - a frame index
/// no animation reaches - so the equality branch never takes and the burst is
/// suppressed. The pulse sound is the audible half of the effect and still plays
/// on the matching frame, from the skin's own path.
fn pulse_toggle_hook() -> HookFn {
    Arc::new(|world, original, instance| {
        let Value::Entity(id) = instance else {
            return original;
        };
        let (enabled, path) = match world.scene.entity(id).overrides() {
            Some(overrides) => (overrides.pulse_enabled, overrides.pulse_sound.clone()),
            None => return original,
        };
        if enabled {
            return original;
        }
        let Value::Int(comparand) = original else {
            return original;
        };
        let (frame, position) = {
            let entity = world.scene.entity(id);
            (entity.sprite.frame, entity.position)
        };
        if frame == comparand {
            world.audio.play(&path, position);
        }
        Value::Int(-1)
    })
}

fn particle_slots(host: &mut Host) -> &mut ParticleSlots {
    &mut host.world.particles
}

fn update_wrapper() -> UpdateWrapper {
    Arc::new(|host, entity, inner| {
        let overrides = host
            .world
            .scene
            .entity(entity)
            .overrides()
            .map(|o| (o.glow.clone(), o.ghost_glow.clone()));
        with_slot_overrides(host, particle_slots, overrides, |host| inner(host, entity));
    })
}

/// Reskins the points popup this collect scheduled, matching the owner's skin.
fn reskin_points(host: &mut Host, owner: EntityId) {
    let sprite = match host.world.scene.entity(owner).overrides() {
        Some(overrides) if !overrides.sprite.is_empty() => overrides.sprite.clone(),
        _ => return,
    };
    let points = host
        .world
        .scene
        .to_add()
        .iter()
        .copied()
        .find(|id| host.world.scene.entity(*id).kind == EntityKind::Points);
    if let Some(id) = points {
        host.world.assign_sprite(id, &sprite);
    }
}

fn collect_wrapper() -> CollectWrapper {
    Arc::new(|host, entity, inner| {
        let id = inner(host, entity);
        if host.world.scene.entity(entity).overrides().is_some() {
            host.world.scene.set_on_complete(id, Arc::new(reskin_points));
        }
        id
    })
}

fn map_load_wrapper() -> MapLoadWrapper {
    Arc::new(|host, def, inner| {
        inner(host, def);
        let detected = host.world.level.detected.drain();
        if detected > 0 {
            log::debug!("folding {} detected collectibles into the map total", detected);
            host.world.level.map.total_collectibles += detected;
        }
    })
}

/// The methods the feature patches, in installation order.
const TARGETS: [&str; 4] = [
    fixtures::ON_ANIMATE,
    fixtures::ON_PLAYER,
    fixtures::ADDED,
    fixtures::COLLECT_MOVE_NEXT,
];

/// Lifecycle owner of the reskinning feature's host modifications.
#[derive(Default)]
pub struct SkinHooks {
    saved: HashMap<String, MethodBody>,
    tokens: Vec<HookToken>,
    installed: bool,
}

impl SkinHooks {
    /// Creates the lifecycle in the uninstalled state.
    pub fn new() -> Self {
        SkinHooks::default()
    }

    /// Whether the feature is currently installed.
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Installs the feature into `host`: patch passes over the four target
    /// methods, the pulse branch suppression, and the three call interceptions.
    ///
    /// Installing while already installed is a no-op. On any failure the host is
    /// rolled back to its pristine bodies and an empty hook table before the
    /// error is returned.
    pub fn install(&mut self, host: &mut Host) -> Result<()> {
        if self.installed {
            return Ok(());
        }

        for key in TARGETS {
            let body = host
                .methods
                .get(key)
                .ok_or_else(|| Error::MethodNotFound(key.to_string()))?;
            self.saved.insert(key.to_string(), body.clone());
        }
        self.installed = true;

        match self.install_patches(host) {
            Ok(()) => {
                log::info!("skin hooks installed");
                Ok(())
            }
            Err(err) => {
                self.uninstall(host);
                Err(err)
            }
        }
    }

    fn install_patches(&mut self, host: &mut Host) -> Result<()> {
        let mut animate = SubstitutionTable::new();
        animate.insert(fixtures::PULSE_SOUND, substitute_hook(pulse_sound, false))?;

        let mut player = SubstitutionTable::new();
        player.insert(fixtures::TOUCH_SOUND, substitute_hook(touch_sound, false))?;
        player.insert(
            fixtures::ALT_TOUCH_SOUND,
            substitute_hook(alt_touch_sound, false),
        )?;

        let mut added = SubstitutionTable::new();
        added.insert(fixtures::SPRITE, substitute_hook(sprite, true))?;
        added.insert(fixtures::GHOST_SPRITE, substitute_hook(ghost_sprite, true))?;

        let mut collect = SubstitutionTable::new();
        collect.insert(fixtures::GET_SOUND, substitute_hook(get_sound, false))?;

        let passes = [
            (fixtures::ON_ANIMATE, animate),
            (fixtures::ON_PLAYER, player),
            (fixtures::ADDED, added),
            (fixtures::COLLECT_MOVE_NEXT, collect),
        ];
        for (key, table) in passes {
            let body = host
                .methods
                .get_mut(key)
                .ok_or_else(|| Error::MethodNotFound(key.to_string()))?;
            let pass = replace_literals(body, &table, &mut host.hooks)?;
            self.tokens.extend(pass.tokens);
        }

        let animate_body = host
            .methods
            .get_mut(fixtures::ON_ANIMATE)
            .ok_or_else(|| Error::MethodNotFound(fixtures::ON_ANIMATE.to_string()))?;
        if let Some((_, token)) = suppress_branch(
            animate_body,
            intrinsics::SPRITE_CURRENT_FRAME,
            0,
            pulse_toggle_hook(),
            &mut host.hooks,
        )? {
            self.tokens.push(token);
        }

        host.wrappers.update = Some(update_wrapper());
        host.wrappers.collect = Some(collect_wrapper());
        host.wrappers.map_load = Some(map_load_wrapper());
        Ok(())
    }

    /// Removes the feature from `host`: restores the saved pristine bodies,
    /// releases every registered callback, and clears the interception slots.
    ///
    /// Uninstalling while not installed is a no-op.
    pub fn uninstall(&mut self, host: &mut Host) {
        if !self.installed {
            return;
        }
        for (key, body) in self.saved.drain() {
            host.methods.insert(key, body);
        }
        for token in self.tokens.drain(..) {
            host.hooks.release(token);
        }
        host.wrappers.update = None;
        host.wrappers.collect = None;
        host.wrappers.map_load = None;
        self.installed = false;
        log::info!("skin hooks uninstalled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Entity, Position};
    use crate::skin::Attrs;

    fn skinned_entity(host: &mut Host, attrs: &Attrs) -> EntityId {
        let overrides = Arc::new(SkinOverrides::from_attrs(attrs, &fixtures::default_slots()));
        host.world_mut()
            .scene
            .spawn(Entity::collectible(Position::default()).with_overrides(overrides))
    }

    #[test]
    fn test_install_is_idempotent() {
        let mut host = Host::with_fixtures();
        let mut hooks = SkinHooks::new();
        hooks.install(&mut host).unwrap();
        let version = host.method(fixtures::ON_PLAYER).unwrap().version();

        hooks.install(&mut host).unwrap();
        assert_eq!(host.method(fixtures::ON_PLAYER).unwrap().version(), version);
    }

    #[test]
    fn test_uninstall_restores_pristine_bodies() {
        let mut host = Host::with_fixtures();
        let pristine = host.method(fixtures::ON_PLAYER).unwrap().clone();

        let mut hooks = SkinHooks::new();
        hooks.install(&mut host).unwrap();
        assert_ne!(*host.method(fixtures::ON_PLAYER).unwrap(), pristine);

        hooks.uninstall(&mut host);
        assert_eq!(*host.method(fixtures::ON_PLAYER).unwrap(), pristine);
        assert!(host.hooks.is_empty());
        assert!(host.wrappers.update.is_none());

        // Second uninstall is a no-op.
        hooks.uninstall(&mut host);
    }

    #[test]
    fn test_substitution_is_per_instance() {
        let mut host = Host::with_fixtures();
        let mut hooks = SkinHooks::new();
        hooks.install(&mut host).unwrap();

        let mut attrs = Attrs::new();
        attrs.set("touchSound", "event:/custom/touch");
        let skinned = skinned_entity(&mut host, &attrs);
        let plain = host
            .world_mut()
            .scene
            .spawn(Entity::collectible(Position::default()));

        host.on_player(skinned).unwrap();
        host.on_player(plain).unwrap();

        let events = host.world().audio.events();
        assert_eq!(events[0].path, "event:/custom/touch");
        assert_eq!(events[1].path, fixtures::TOUCH_SOUND);
    }

    #[test]
    fn test_empty_override_keeps_host_default() {
        let mut host = Host::with_fixtures();
        let mut hooks = SkinHooks::new();
        hooks.install(&mut host).unwrap();

        let skinned = skinned_entity(&mut host, &Attrs::new());
        host.added(skinned).unwrap();
        assert_eq!(
            host.world().sprites.assignments()[0].sprite,
            fixtures::SPRITE
        );
    }

    #[test]
    fn test_disabled_pulse_plays_sound_without_burst() {
        let mut host = Host::with_fixtures();
        let mut hooks = SkinHooks::new();
        hooks.install(&mut host).unwrap();

        let mut attrs = Attrs::new();
        attrs
            .set("pulseEnabled", "false")
            .set("pulseSound", "event:/skin/pulse");
        let skinned = skinned_entity(&mut host, &attrs);
        host.world_mut().scene.entity_mut(skinned).sprite.frame = fixtures::PULSE_FRAME;

        host.on_animate(skinned).unwrap();
        assert_eq!(host.world().audio.events().len(), 1);
        assert_eq!(host.world().audio.events()[0].path, "event:/skin/pulse");
        assert!(host.world().scene.pulses().is_empty());
    }
}
