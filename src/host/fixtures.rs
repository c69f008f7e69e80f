//! The closed host's compiled method bodies.
//!
//! These are the externally defined, unmodifiable methods this crate patches. They
//! cannot be subclassed or edited at source level; their only seam is instruction
//! injection into the bodies built here. The shapes mirror what the host compiler
//! emits: the collect sequence has been lowered into a generated state-holder type
//! (`<Collect>d__9`) whose `MoveNext` body carries the step logic and a synthesized
//! `<>4__this` back-reference to the collectible.
//!
//! The default resource literals below are the substitution keys the reskinning
//! feature replaces per instance.

use std::collections::HashMap;

use crate::host::{intrinsics, Color, ParticleSlots, ParticleType};
use crate::il::{Instruction, MethodBody, StateMachine};

/// Method table key of `Collectible::OnAnimate`.
pub const ON_ANIMATE: &str = "Collectible::OnAnimate";
/// Method table key of `Collectible::OnPlayer`.
pub const ON_PLAYER: &str = "Collectible::OnPlayer";
/// Method table key of `Collectible::Added`.
pub const ADDED: &str = "Collectible::Added";
/// Method table key of the generated collect step-body.
pub const COLLECT_MOVE_NEXT: &str = "Collectible::<Collect>d__9::MoveNext";

/// Default pulse sound literal.
pub const PULSE_SOUND: &str = "event:/collect/pulse";
/// Default touch sound literal.
pub const TOUCH_SOUND: &str = "event:/collect/touch";
/// Default alternate (ghost) touch sound literal.
pub const ALT_TOUCH_SOUND: &str = "event:/collect/touch_alt";
/// Default collection sound literal.
pub const GET_SOUND: &str = "event:/collect/get";
/// Default sprite identifier literal.
pub const SPRITE: &str = "collectible";
/// Default ghost-variant sprite identifier literal.
pub const GHOST_SPRITE: &str = "collectible_ghost";

/// Animation frame on which the host triggers the pulse effect.
pub const PULSE_FRAME: i32 = 35;

/// `Collectible::OnAnimate`: compares the sprite's current animation frame against
/// the pulse frame and, on the matching frame, plays the pulse sound and emits the
/// light + displacement burst.
fn on_animate() -> MethodBody {
    let mut body = MethodBody::new("Collectible", "OnAnimate");
    let pulse = body.new_label();
    let end = body.new_label();

    body.push(Instruction::LdcI4(PULSE_FRAME));
    body.push(Instruction::Stloc(0));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Callvirt(intrinsics::SPRITE_CURRENT_FRAME.to_string()));
    body.push(Instruction::Ldloc(0));
    body.push(Instruction::Beq(pulse));
    body.push(Instruction::Br(end));

    body.place_label(pulse);
    body.push(Instruction::Ldstr(PULSE_SOUND.into()));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Callvirt(intrinsics::AUDIO_PLAY.to_string()));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Callvirt(intrinsics::SCENE_EMIT_PULSE.to_string()));

    body.place_label(end);
    body.push(Instruction::Ret);
    body
}

/// `Collectible::OnPlayer`: plays the touch sound, or the alternate touch sound
/// for the ghost variant.
fn on_player() -> MethodBody {
    let mut body = MethodBody::new("Collectible", "OnPlayer");
    let ghost = body.new_label();
    let end = body.new_label();

    body.push(Instruction::Ldarg0);
    body.push(Instruction::Ldfld("is_ghost".to_string()));
    body.push(Instruction::Brtrue(ghost));
    body.push(Instruction::Ldstr(TOUCH_SOUND.into()));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Callvirt(intrinsics::AUDIO_PLAY.to_string()));
    body.push(Instruction::Br(end));

    body.place_label(ghost);
    body.push(Instruction::Ldstr(ALT_TOUCH_SOUND.into()));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Callvirt(intrinsics::AUDIO_PLAY.to_string()));

    body.place_label(end);
    body.push(Instruction::Ret);
    body
}

/// `Collectible::Added`: assigns the default sprite, or the ghost sprite for the
/// ghost variant.
fn added() -> MethodBody {
    let mut body = MethodBody::new("Collectible", "Added");
    let ghost = body.new_label();
    let end = body.new_label();

    body.push(Instruction::Ldarg0);
    body.push(Instruction::Ldfld("is_ghost".to_string()));
    body.push(Instruction::Brtrue(ghost));
    body.push(Instruction::Ldstr(SPRITE.into()));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Callvirt(intrinsics::SPRITE_CREATE_ON.to_string()));
    body.push(Instruction::Br(end));

    body.place_label(ghost);
    body.push(Instruction::Ldstr(GHOST_SPRITE.into()));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Callvirt(intrinsics::SPRITE_CREATE_ON.to_string()));

    body.place_label(end);
    body.push(Instruction::Ret);
    body
}

/// The generated collect step-body.
///
/// Step 0 plays the collection sound at the owning collectible's position -
/// reached through the synthesized `<>4__this` back-reference - advances the state
/// and yields. Step 1 spawns the points popup and completes. The return value is
/// the continue flag: 1 to resume next frame, 0 when done.
fn collect_move_next() -> MethodBody {
    let mut body = MethodBody::new_state_machine(
        "Collectible::<Collect>d__9",
        "MoveNext",
        StateMachine {
            kick_off: "Collect".to_string(),
            fields: vec!["<>1__state".to_string(), "<>4__this".to_string()],
        },
    );
    let resume = body.new_label();

    body.push(Instruction::Ldarg0);
    body.push(Instruction::Ldfld("<>1__state".to_string()));
    body.push(Instruction::Brtrue(resume));

    body.push(Instruction::Ldstr(GET_SOUND.into()));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Ldfld("<>4__this".to_string()));
    body.push(Instruction::Callvirt(intrinsics::AUDIO_PLAY.to_string()));
    body.push(Instruction::Ldarg0);
    body.push(Instruction::LdcI4(1));
    body.push(Instruction::Stfld("<>1__state".to_string()));
    body.push(Instruction::LdcI4(1));
    body.push(Instruction::Ret);

    body.place_label(resume);
    body.push(Instruction::Ldarg0);
    body.push(Instruction::Ldfld("<>4__this".to_string()));
    body.push(Instruction::Callvirt(intrinsics::SCENE_SPAWN_POINTS.to_string()));
    body.push(Instruction::LdcI4(0));
    body.push(Instruction::Ret);
    body
}

/// Builds the host's method table with all patchable bodies in pristine state.
pub fn method_table() -> HashMap<String, MethodBody> {
    let mut methods = HashMap::new();
    for body in [on_animate(), on_player(), added(), collect_move_next()] {
        methods.insert(body.full_name(), body);
    }
    methods
}

/// The host's default particle slots: warm glow for live collectibles, cold glow
/// for ghosts.
pub fn default_slots() -> ParticleSlots {
    ParticleSlots::new(
        ParticleType {
            color: Color(0xFF, 0x50, 0x50),
            color2: Color(0xFF, 0xFF, 0xFF),
        },
        ParticleType {
            color: Color(0x50, 0x50, 0xFF),
            color2: Color(0xCC, 0xCC, 0xFF),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_table_keys_match_full_names() {
        let methods = method_table();
        for key in [ON_ANIMATE, ON_PLAYER, ADDED, COLLECT_MOVE_NEXT] {
            let body = methods.get(key).unwrap_or_else(|| panic!("missing {key}"));
            assert_eq!(body.full_name(), key);
        }
    }

    #[test]
    fn test_only_move_next_is_a_state_machine() {
        let methods = method_table();
        assert!(methods[COLLECT_MOVE_NEXT].is_state_machine());
        assert!(!methods[ON_ANIMATE].is_state_machine());
        assert!(!methods[ON_PLAYER].is_state_machine());
        assert!(!methods[ADDED].is_state_machine());
    }
}
