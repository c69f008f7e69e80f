//! Host sprite service: "fetch/assign sprite by identifier onto a target object".

use crate::host::EntityId;

/// One sprite assignment performed through the bank.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteAssignment {
    /// The entity the sprite was assigned to.
    pub entity: EntityId,
    /// Identifier of the assigned sprite.
    pub sprite: String,
}

/// The host's sprite bank.
#[derive(Default)]
pub struct SpriteBank {
    assignments: Vec<SpriteAssignment>,
}

impl SpriteBank {
    /// Records a sprite assignment onto `entity`.
    pub fn record(&mut self, entity: EntityId, sprite: &str) {
        self.assignments.push(SpriteAssignment {
            entity,
            sprite: sprite.to_string(),
        });
    }

    /// Sprite assignments performed so far, in order.
    pub fn assignments(&self) -> &[SpriteAssignment] {
        &self.assignments
    }

    /// Drains the recorded assignments.
    pub fn take_assignments(&mut self) -> Vec<SpriteAssignment> {
        std::mem::take(&mut self.assignments)
    }
}
