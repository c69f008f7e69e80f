//! Scene model: entity arena, scheduling staging list, state-machine frames and
//! cooperative coroutines.
//!
//! The scene is the part of the closed host the patched methods execute against.
//! Entities live in an arena and are referenced by [`EntityId`] handles; generated
//! step-bodies execute against [`Frame`]s referenced by [`FrameId`] handles, so the
//! hidden back-reference from a frame to its owning entity is an explicit handle,
//! never a raw pointer.
//!
//! # Coroutines
//!
//! A restartable multi-step computation is an explicit state machine:
//! `Pending -> Suspended(n) -> Completed`, driven one resumption per frame by the
//! scheduler. The externally observable completion event (`on_complete`) fires
//! exactly once - after the final resumption, or on fatal abort during a scene
//! transition - never per yield.

use std::collections::HashMap;
use std::sync::Arc;

use crate::host::Host;
use crate::il::Value;
use crate::skin::SkinOverrides;

/// Handle to an entity in the scene arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

/// Handle to a state-machine frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u32);

/// Handle to a scheduled coroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoroutineId(pub u32);

/// A 2D world position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Position {
    /// Creates a position from its coordinates.
    pub fn new(x: f32, y: f32) -> Self {
        Position { x, y }
    }
}

/// What kind of host object an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A collectible item sitting in the level.
    Collectible,
    /// The score popup spawned when a collectible is collected.
    Points,
}

/// Per-entity sprite state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpriteSlot {
    /// Identifier of the sprite assigned to this entity.
    pub id: String,
    /// Current animation frame index.
    pub frame: i32,
}

/// A host entity.
///
/// The override record is a capability: entities constructed through the host's
/// default path carry none, and every substitution point checks for its presence
/// instead of relying on a subclass hierarchy.
#[derive(Debug, Clone)]
pub struct Entity {
    /// What kind of host object this is.
    pub kind: EntityKind,
    /// World position.
    pub position: Position,
    /// Whether this is the ghost variant (already collected in a previous session).
    pub is_ghost: bool,
    /// Sprite state.
    pub sprite: SpriteSlot,
    overrides: Option<Arc<SkinOverrides>>,
}

impl Entity {
    /// Creates a plain collectible at `position`.
    pub fn collectible(position: Position) -> Self {
        Entity {
            kind: EntityKind::Collectible,
            position,
            is_ghost: false,
            sprite: SpriteSlot::default(),
            overrides: None,
        }
    }

    /// Creates a points popup at `position`.
    pub fn points(position: Position) -> Self {
        Entity {
            kind: EntityKind::Points,
            position,
            is_ghost: false,
            sprite: SpriteSlot {
                id: "points".to_string(),
                frame: 0,
            },
            overrides: None,
        }
    }

    /// Marks this entity as the ghost variant.
    pub fn ghost(mut self) -> Self {
        self.is_ghost = true;
        self
    }

    /// Attaches an override record, making this a reskinned instance.
    pub fn with_overrides(mut self, overrides: Arc<SkinOverrides>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// The capability check: the override record, if this instance carries one.
    pub fn overrides(&self) -> Option<&SkinOverrides> {
        self.overrides.as_deref()
    }
}

/// A state-holder frame instantiating a generated step-body's synthesized fields.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Field name to value; keys are the generated type's synthesized field names.
    pub fields: HashMap<String, Value>,
}

/// Lifecycle of a cooperative coroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineState {
    /// Scheduled but not yet resumed.
    Pending,
    /// Resumed `n` times and yielded each time.
    Suspended(u32),
    /// Finished; the completion event has fired.
    Completed,
}

/// Completion event callback, fired once per coroutine.
pub type OnComplete = Arc<dyn Fn(&mut Host, EntityId)>;

/// A scheduled multi-step computation driving a generated step-body.
pub struct Coroutine {
    /// Key of the step-body in the host's method table.
    pub method: String,
    /// The state-holder frame the body executes against.
    pub frame: FrameId,
    /// The entity that started the computation.
    pub owner: EntityId,
    /// Current lifecycle state.
    pub state: CoroutineState,
    on_complete: Option<OnComplete>,
}

/// The entity arena, staging list, frames and coroutines of the running scene.
#[derive(Default)]
pub struct Scene {
    entities: Vec<Entity>,
    to_add: Vec<EntityId>,
    frames: Vec<Frame>,
    coroutines: Vec<Coroutine>,
    pulses: Vec<EntityId>,
}

impl Scene {
    /// Adds an entity directly to the scene and returns its handle.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.entities.push(entity);
        EntityId(self.entities.len() as u32 - 1)
    }

    /// Adds an entity to the staging list; it becomes a "newly scheduled" entity
    /// until the end of the current frame.
    pub fn schedule(&mut self, entity: Entity) -> EntityId {
        let id = self.spawn(entity);
        self.to_add.push(id);
        id
    }

    /// The entities scheduled this frame, in scheduling order.
    pub fn to_add(&self) -> &[EntityId] {
        &self.to_add
    }

    /// Clears the staging list at the end of a frame.
    pub fn flush_to_add(&mut self) {
        self.to_add.clear();
    }

    /// The entity behind a handle.
    ///
    /// # Panics
    ///
    /// Panics on a dangling handle; the scene never removes entities.
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0 as usize]
    }

    /// Mutable access to the entity behind a handle.
    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0 as usize]
    }

    /// The frame behind a handle.
    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.0 as usize]
    }

    /// Mutable access to the frame behind a handle.
    pub fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.0 as usize]
    }

    /// Instantiates a state-holder frame for `owner` and schedules a coroutine
    /// stepping `method` against it.
    ///
    /// All declared fields start zeroed; the back-reference field (by the
    /// compiler's `<>…__this` convention) is initialized to the owning entity.
    pub fn start_coroutine(
        &mut self,
        method: &str,
        owner: EntityId,
        fields: &[String],
    ) -> CoroutineId {
        let mut frame = Frame {
            fields: HashMap::new(),
        };
        for field in fields {
            let value = if field.starts_with("<>") && field.ends_with("__this") {
                Value::Entity(owner)
            } else {
                Value::Int(0)
            };
            frame.fields.insert(field.clone(), value);
        }

        self.frames.push(frame);
        let frame_id = FrameId(self.frames.len() as u32 - 1);

        self.coroutines.push(Coroutine {
            method: method.to_string(),
            frame: frame_id,
            owner,
            state: CoroutineState::Pending,
            on_complete: None,
        });
        CoroutineId(self.coroutines.len() as u32 - 1)
    }

    /// The coroutine behind a handle.
    pub fn coroutine(&self, id: CoroutineId) -> &Coroutine {
        &self.coroutines[id.0 as usize]
    }

    /// Attaches the completion event; replaces any previously attached callback.
    pub fn set_on_complete(&mut self, id: CoroutineId, callback: OnComplete) {
        self.coroutines[id.0 as usize].on_complete = Some(callback);
    }

    /// Handles of all coroutines that have not yet completed.
    pub fn active_coroutines(&self) -> Vec<CoroutineId> {
        self.coroutines
            .iter()
            .enumerate()
            .filter(|(_, c)| c.state != CoroutineState::Completed)
            .map(|(index, _)| CoroutineId(index as u32))
            .collect()
    }

    /// Records one resumption that yielded.
    pub fn note_resumed(&mut self, id: CoroutineId) {
        let coroutine = &mut self.coroutines[id.0 as usize];
        coroutine.state = match coroutine.state {
            CoroutineState::Pending => CoroutineState::Suspended(1),
            CoroutineState::Suspended(n) => CoroutineState::Suspended(n + 1),
            CoroutineState::Completed => CoroutineState::Completed,
        };
    }

    /// Records the light + displacement burst of a pulse effect on `entity`.
    pub fn record_pulse(&mut self, entity: EntityId) {
        self.pulses.push(entity);
    }

    /// Pulse bursts recorded so far, in order.
    pub fn pulses(&self) -> &[EntityId] {
        &self.pulses
    }

    /// Drains the recorded pulse bursts.
    pub fn take_pulses(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pulses)
    }

    /// Marks the coroutine completed and takes its completion callback.
    ///
    /// The callback is taken rather than borrowed so it can only ever fire once,
    /// including on the fatal-abort path.
    pub fn complete(&mut self, id: CoroutineId) -> Option<OnComplete> {
        let coroutine = &mut self.coroutines[id.0 as usize];
        coroutine.state = CoroutineState::Completed;
        coroutine.on_complete.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_stages_until_flush() {
        let mut scene = Scene::default();
        let id = scene.schedule(Entity::points(Position::default()));
        assert_eq!(scene.to_add(), &[id]);
        scene.flush_to_add();
        assert!(scene.to_add().is_empty());
        assert_eq!(scene.entity(id).kind, EntityKind::Points);
    }

    #[test]
    fn test_start_coroutine_initializes_back_reference() {
        let mut scene = Scene::default();
        let owner = scene.spawn(Entity::collectible(Position::default()));
        let fields = vec!["<>1__state".to_string(), "<>4__this".to_string()];
        let co = scene.start_coroutine("MoveNext", owner, &fields);

        let frame = scene.frame(scene.coroutine(co).frame);
        assert_eq!(frame.fields["<>1__state"], Value::Int(0));
        assert_eq!(frame.fields["<>4__this"], Value::Entity(owner));
        assert_eq!(scene.coroutine(co).state, CoroutineState::Pending);
    }

    #[test]
    fn test_coroutine_state_progression() {
        let mut scene = Scene::default();
        let owner = scene.spawn(Entity::collectible(Position::default()));
        let co = scene.start_coroutine("MoveNext", owner, &[]);

        scene.note_resumed(co);
        assert_eq!(scene.coroutine(co).state, CoroutineState::Suspended(1));
        scene.note_resumed(co);
        assert_eq!(scene.coroutine(co).state, CoroutineState::Suspended(2));

        assert!(scene.complete(co).is_none());
        assert_eq!(scene.coroutine(co).state, CoroutineState::Completed);
        assert!(scene.active_coroutines().is_empty());
    }

    #[test]
    fn test_completion_callback_taken_once() {
        let mut scene = Scene::default();
        let owner = scene.spawn(Entity::collectible(Position::default()));
        let co = scene.start_coroutine("MoveNext", owner, &[]);
        scene.set_on_complete(co, Arc::new(|_, _| {}));

        assert!(scene.complete(co).is_some());
        assert!(scene.complete(co).is_none());
    }
}
