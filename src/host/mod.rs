//! The closed host runtime: world services, method dispatch and the cooperative
//! scheduler.
//!
//! Per the engine's contract, the host's entity/rendering/audio subsystems are
//! opaque collaborators - "play sound by identifier", "assign sprite by
//! identifier", "read/write shared particle-effect slot", "enumerate newly
//! scheduled entities". This module models exactly those interfaces, executable
//! enough that patched behavior is observable, and nothing more.
//!
//! # Architecture
//!
//! - [`World`] - the runtime services: audio, sprites, particle slots, scene, level
//! - [`Host`] - the dispatcher owning the world, the method table of compiled
//!   bodies, the injected-hook table, and the call-interception slots
//! - [`fixtures`] - the pristine compiled bodies of the patch targets
//!
//! Calls into patchable methods go through the method table, so a committed patch
//! pass is picked up by every subsequent invocation. Call interceptions wrap the
//! whole method call and run once per invocation, separate from instruction-level
//! patches.
//!
//! # Thread Safety
//!
//! The host is a single cooperative scheduler stepping entities and coroutines one
//! frame at a time. Nothing here is [`Send`] or [`Sync`]; the shared particle
//! slots rely on call-scoped access from one logical thread of control.

pub mod audio;
pub mod fixtures;
pub mod level;
pub mod particles;
pub mod scene;
pub mod sprites;

use std::collections::HashMap;
use std::sync::Arc;

pub use audio::{Audio, SoundEvent};
pub use level::{DetectedCounter, Level, MapData, MapDef};
pub use particles::{with_slot_overrides, Color, ParticleEvent, ParticleSlots, ParticleType};
pub use scene::{
    Coroutine, CoroutineId, CoroutineState, Entity, EntityId, EntityKind, Frame, FrameId,
    OnComplete, Position, Scene, SpriteSlot,
};
pub use sprites::{SpriteAssignment, SpriteBank};

use crate::il::{eval, MethodBody, Value};
use crate::patch::HookTable;
use crate::{Error, Result};

/// Names of the host services reachable from compiled bodies via `Callvirt`.
pub mod intrinsics {
    /// `Audio::Play(path, entity)`: play a sound at the entity's position.
    pub const AUDIO_PLAY: &str = "Audio::Play";
    /// `SpriteBank::CreateOn(path, entity)`: assign a sprite onto an entity.
    pub const SPRITE_CREATE_ON: &str = "SpriteBank::CreateOn";
    /// `Sprite::get_CurrentAnimationFrame(entity)`: current animation frame.
    pub const SPRITE_CURRENT_FRAME: &str = "Sprite::get_CurrentAnimationFrame";
    /// `Scene::SpawnPoints(entity)`: schedule the points popup for an entity.
    pub const SCENE_SPAWN_POINTS: &str = "Scene::SpawnPoints";
    /// `Scene::EmitPulse(entity)`: the pulse light + displacement burst.
    pub const SCENE_EMIT_PULSE: &str = "Scene::EmitPulse";
}

/// Compiled method bodies of the host, keyed by fully qualified name.
pub type MethodTable = HashMap<String, MethodBody>;

/// Interception wrapper around `Collectible::Update`.
pub type UpdateWrapper = Arc<dyn Fn(&mut Host, EntityId, &mut dyn FnMut(&mut Host, EntityId))>;

/// Interception wrapper around the collect kick-off.
pub type CollectWrapper =
    Arc<dyn Fn(&mut Host, EntityId, &mut dyn FnMut(&mut Host, EntityId) -> CoroutineId) -> CoroutineId>;

/// Interception wrapper around the map-load event.
pub type MapLoadWrapper = Arc<dyn Fn(&mut Host, &MapDef, &mut dyn FnMut(&mut Host, &MapDef))>;

/// One interception slot per interceptable host method.
///
/// Installation overwrites a slot; removal clears it. A cleared slot means the
/// original call runs unwrapped, so repeated install/remove cycles leave no
/// residue.
#[derive(Default)]
pub struct Wrappers {
    /// Wrapper around per-frame entity updates.
    pub update: Option<UpdateWrapper>,
    /// Wrapper around the collect coroutine kick-off.
    pub collect: Option<CollectWrapper>,
    /// Wrapper around map-load completion.
    pub map_load: Option<MapLoadWrapper>,
}

/// The runtime services compiled bodies execute against.
pub struct World {
    /// Audio subsystem.
    pub audio: Audio,
    /// Sprite bank.
    pub sprites: SpriteBank,
    /// Shared mutable particle-effect slots.
    pub particles: ParticleSlots,
    /// Entity arena, staging list, frames and coroutines.
    pub scene: Scene,
    /// Level data and the detection counter.
    pub level: Level,
}

impl World {
    /// Creates a world with the host's default particle slots and an empty scene.
    pub fn new() -> Self {
        World {
            audio: Audio::default(),
            sprites: SpriteBank::default(),
            particles: fixtures::default_slots(),
            scene: Scene::default(),
            level: Level::default(),
        }
    }

    /// Assigns the sprite identified by `sprite` onto `entity`, recording the
    /// assignment in the bank.
    pub fn assign_sprite(&mut self, entity: EntityId, sprite: &str) {
        self.scene.entity_mut(entity).sprite.id = sprite.to_string();
        self.sprites.record(entity, sprite);
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}

/// The closed host: world, compiled bodies, injected hooks and interception slots.
pub struct Host {
    pub(crate) world: World,
    pub(crate) methods: MethodTable,
    pub(crate) hooks: HookTable,
    pub(crate) wrappers: Wrappers,
}

impl Host {
    /// Creates a host with the pristine fixture bodies installed.
    pub fn with_fixtures() -> Self {
        Host {
            world: World::new(),
            methods: fixtures::method_table(),
            hooks: HookTable::default(),
            wrappers: Wrappers::default(),
        }
    }

    /// The runtime world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the runtime world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The compiled body behind a method-table key.
    pub fn method(&self, key: &str) -> Option<&MethodBody> {
        self.methods.get(key)
    }

    fn invoke(&mut self, key: &str, arg0: Value) -> Result<Option<Value>> {
        let body = self
            .methods
            .get(key)
            .ok_or_else(|| Error::MethodNotFound(key.to_string()))?;
        eval::run(body, &self.hooks, &mut self.world, arg0)
    }

    /// Runs `Collectible::OnAnimate` for one frame of `entity`'s animation.
    pub fn on_animate(&mut self, entity: EntityId) -> Result<()> {
        self.invoke(fixtures::ON_ANIMATE, Value::Entity(entity))?;
        Ok(())
    }

    /// Runs `Collectible::OnPlayer` when the player touches `entity`.
    pub fn on_player(&mut self, entity: EntityId) -> Result<()> {
        self.invoke(fixtures::ON_PLAYER, Value::Entity(entity))?;
        Ok(())
    }

    /// Runs `Collectible::Added` when `entity` enters the scene.
    pub fn added(&mut self, entity: EntityId) -> Result<()> {
        self.invoke(fixtures::ADDED, Value::Entity(entity))?;
        Ok(())
    }

    /// Per-frame update of `entity`, through the interception slot if occupied.
    pub fn update(&mut self, entity: EntityId) {
        match self.wrappers.update.clone() {
            Some(wrapper) => wrapper(self, entity, &mut |host, entity| host.update_base(entity)),
            None => self.update_base(entity),
        }
    }

    /// The host's own update logic: emit a glow particle from whichever shared
    /// slot matches the entity's variant.
    fn update_base(&mut self, entity: EntityId) {
        let (is_ghost, position) = {
            let entity = self.world.scene.entity(entity);
            (entity.is_ghost, entity.position)
        };
        let particle = if is_ghost {
            self.world.particles.ghost_glow().clone()
        } else {
            self.world.particles.glow().clone()
        };
        self.world.particles.emit(particle, position);
    }

    /// Kicks off the collect sequence for `entity`, through the interception slot
    /// if occupied, and returns the scheduled coroutine.
    pub fn collect(&mut self, entity: EntityId) -> CoroutineId {
        match self.wrappers.collect.clone() {
            Some(wrapper) => wrapper(self, entity, &mut |host, entity| host.collect_base(entity)),
            None => self.collect_base(entity),
        }
    }

    fn collect_base(&mut self, entity: EntityId) -> CoroutineId {
        let fields = self
            .methods
            .get(fixtures::COLLECT_MOVE_NEXT)
            .and_then(|body| body.state_machine())
            .map(|sm| sm.fields.clone())
            .unwrap_or_default();
        self.world
            .scene
            .start_coroutine(fixtures::COLLECT_MOVE_NEXT, entity, &fields)
    }

    /// Loads map data, through the interception slot if occupied.
    pub fn load_map(&mut self, def: &MapDef) {
        match self.wrappers.map_load.clone() {
            Some(wrapper) => wrapper(self, def, &mut |host, def| host.world.level.load(def)),
            None => self.world.level.load(def),
        }
    }

    /// Advances the scheduler by one frame: resumes every active coroutine once,
    /// fires completion events for coroutines that finished this frame, then
    /// flushes the staging list.
    ///
    /// Completion events fire before the flush so they can still observe the
    /// newly scheduled entities of this frame.
    pub fn step_frame(&mut self) -> Result<()> {
        let active = self.world.scene.active_coroutines();
        let mut finished = Vec::new();

        for id in active {
            let (method, frame) = {
                let coroutine = self.world.scene.coroutine(id);
                (coroutine.method.clone(), coroutine.frame)
            };
            let result = {
                let body = self
                    .methods
                    .get(&method)
                    .ok_or_else(|| Error::MethodNotFound(method.clone()))?;
                eval::run(body, &self.hooks, &mut self.world, Value::Frame(frame))?
            };
            match result {
                Some(Value::Int(1)) => self.world.scene.note_resumed(id),
                Some(Value::Int(0)) => finished.push(id),
                other => {
                    return Err(eval_error!(
                        "step-body {} returned {:?} instead of a continue flag",
                        method,
                        other
                    ))
                }
            }
        }

        for id in finished {
            let owner = self.world.scene.coroutine(id).owner;
            if let Some(callback) = self.world.scene.complete(id) {
                callback(self, owner);
            }
        }
        self.world.scene.flush_to_add();
        Ok(())
    }

    /// Fatal-abort path for a scene transition: every in-flight coroutine is
    /// completed without further resumptions, its completion event still fires
    /// exactly once, and the staging list is flushed.
    pub fn abort_coroutines(&mut self) {
        for id in self.world.scene.active_coroutines() {
            let owner = self.world.scene.coroutine(id).owner;
            if let Some(callback) = self.world.scene.complete(id) {
                callback(self, owner);
            }
        }
        self.world.scene.flush_to_add();
    }
}
