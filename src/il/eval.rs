//! Stack-machine evaluator for method bodies.
//!
//! The host executes its compiled bodies through this evaluator, which is what
//! makes injected logic observable: once a patch pass has committed, every
//! invocation of the patched method runs the injected instructions inline - no
//! scanning happens per call.
//!
//! # Evaluation model
//!
//! One operand stack, eight zeroed local slots, and an `arg0` value: the entity
//! for an instance method, or the state-holder frame for a generated step-body.
//! `Callvirt` dispatches into the host world by intrinsic name. `Hook` resolves an
//! injected callback through the hook table; a missing callback degrades to
//! returning the original value so a fault behind the injected point can never
//! corrupt the evaluation stack of the surrounding host method.
//!
//! Evaluation is step-limited; a body that fails to terminate within the budget
//! is reported as [`crate::Error::StepLimit`].

use std::sync::Arc;

use crate::{
    host::{intrinsics, Entity, EntityId, FrameId, World},
    il::{Instruction, MethodBody},
    patch::HookTable,
    Result,
};

/// Maximum instruction count per method invocation.
const STEP_LIMIT: usize = 10_000;

/// Number of local variable slots available to a body.
const LOCAL_SLOTS: usize = 8;

/// A value on the evaluation stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// 32-bit integer.
    Int(i32),
    /// String constant or resource identifier.
    Str(Arc<str>),
    /// Reference to a host entity.
    Entity(EntityId),
    /// Reference to a state-holder frame.
    Frame(FrameId),
}

impl Value {
    /// CIL truthiness: zero and null are false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Int(0))
    }
}

/// Executes `body` against the world, returning the value left on the stack at
/// `ret` (if any).
pub fn run(
    body: &MethodBody,
    hooks: &HookTable,
    world: &mut World,
    arg0: Value,
) -> Result<Option<Value>> {
    let mut stack: Vec<Value> = Vec::with_capacity(8);
    let mut locals = vec![Value::Int(0); LOCAL_SLOTS];
    let mut ip = 0usize;
    let mut steps = 0usize;

    while ip < body.len() {
        steps += 1;
        if steps > STEP_LIMIT {
            return Err(crate::Error::StepLimit(STEP_LIMIT));
        }

        match body.instruction(ip) {
            Instruction::Nop => {}
            Instruction::Ldstr(literal) => stack.push(Value::Str(literal.clone())),
            Instruction::LdcI4(constant) => stack.push(Value::Int(*constant)),
            Instruction::Ldarg0 => stack.push(arg0.clone()),
            Instruction::Ldloc(slot) => {
                let value = locals
                    .get(*slot as usize)
                    .cloned()
                    .ok_or_else(|| eval_error!("ldloc {} out of range in {}", slot, body.full_name()))?;
                stack.push(value);
            }
            Instruction::Stloc(slot) => {
                let value = pop(&mut stack, body, ip)?;
                let target = locals
                    .get_mut(*slot as usize)
                    .ok_or_else(|| eval_error!("stloc {} out of range in {}", slot, body.full_name()))?;
                *target = value;
            }
            Instruction::Ldfld(field) => {
                let value = match pop(&mut stack, body, ip)? {
                    Value::Entity(id) => entity_field(world, id, field, body)?,
                    Value::Frame(id) => world
                        .scene
                        .frame(id)
                        .fields
                        .get(field)
                        .cloned()
                        .ok_or_else(|| {
                            eval_error!("undefined frame field {} in {}", field, body.full_name())
                        })?,
                    other => {
                        return Err(eval_error!(
                            "ldfld {} on non-object {:?} in {}",
                            field,
                            other,
                            body.full_name()
                        ))
                    }
                };
                stack.push(value);
            }
            Instruction::Stfld(field) => {
                let value = pop(&mut stack, body, ip)?;
                match pop(&mut stack, body, ip)? {
                    Value::Frame(id) => {
                        world.scene.frame_mut(id).fields.insert(field.clone(), value);
                    }
                    other => {
                        return Err(eval_error!(
                            "stfld {} on non-frame {:?} in {}",
                            field,
                            other,
                            body.full_name()
                        ))
                    }
                }
            }
            Instruction::Callvirt(name) => call_intrinsic(name, &mut stack, world, body, ip)?,
            Instruction::Br(label) => {
                ip = body.label_target(*label)?;
                continue;
            }
            Instruction::Brtrue(label) => {
                if pop(&mut stack, body, ip)?.is_truthy() {
                    ip = body.label_target(*label)?;
                    continue;
                }
            }
            Instruction::Beq(label) => {
                let rhs = pop(&mut stack, body, ip)?;
                let lhs = pop(&mut stack, body, ip)?;
                if lhs == rhs {
                    ip = body.label_target(*label)?;
                    continue;
                }
            }
            Instruction::Hook(token) => {
                let instance = pop(&mut stack, body, ip)?;
                let original = pop(&mut stack, body, ip)?;
                match hooks.get(*token) {
                    Some(hook) => stack.push(hook(world, original, instance)),
                    None => {
                        // Fail-safe: a released callback must not disturb the host.
                        log::warn!(
                            "hook {:?} not registered while evaluating {}",
                            token,
                            body.full_name()
                        );
                        stack.push(original);
                    }
                }
            }
            Instruction::Ret => return Ok(stack.pop()),
        }

        ip += 1;
    }

    Err(eval_error!("{} fell off the end of its body", body.full_name()))
}

fn pop(stack: &mut Vec<Value>, body: &MethodBody, ip: usize) -> Result<Value> {
    stack
        .pop()
        .ok_or_else(|| eval_error!("stack underflow at {} in {}", ip, body.full_name()))
}

fn pop_entity(stack: &mut Vec<Value>, body: &MethodBody, ip: usize) -> Result<EntityId> {
    match pop(stack, body, ip)? {
        Value::Entity(id) => Ok(id),
        other => Err(eval_error!(
            "expected an entity reference at {} in {}, found {:?}",
            ip,
            body.full_name(),
            other
        )),
    }
}

fn pop_str(stack: &mut Vec<Value>, body: &MethodBody, ip: usize) -> Result<Arc<str>> {
    match pop(stack, body, ip)? {
        Value::Str(s) => Ok(s),
        other => Err(eval_error!(
            "expected a string at {} in {}, found {:?}",
            ip,
            body.full_name(),
            other
        )),
    }
}

fn entity_field(world: &World, id: EntityId, field: &str, body: &MethodBody) -> Result<Value> {
    match field {
        "is_ghost" => Ok(Value::Int(i32::from(world.scene.entity(id).is_ghost))),
        _ => Err(eval_error!(
            "undefined entity field {} in {}",
            field,
            body.full_name()
        )),
    }
}

fn call_intrinsic(
    name: &str,
    stack: &mut Vec<Value>,
    world: &mut World,
    body: &MethodBody,
    ip: usize,
) -> Result<()> {
    match name {
        intrinsics::AUDIO_PLAY => {
            let target = pop_entity(stack, body, ip)?;
            let path = pop_str(stack, body, ip)?;
            let position = world.scene.entity(target).position;
            world.audio.play(&path, position);
        }
        intrinsics::SPRITE_CREATE_ON => {
            let target = pop_entity(stack, body, ip)?;
            let sprite = pop_str(stack, body, ip)?;
            world.assign_sprite(target, &sprite);
        }
        intrinsics::SPRITE_CURRENT_FRAME => {
            let target = pop_entity(stack, body, ip)?;
            stack.push(Value::Int(world.scene.entity(target).sprite.frame));
        }
        intrinsics::SCENE_SPAWN_POINTS => {
            let owner = pop_entity(stack, body, ip)?;
            let position = world.scene.entity(owner).position;
            world.scene.schedule(Entity::points(position));
        }
        intrinsics::SCENE_EMIT_PULSE => {
            let owner = pop_entity(stack, body, ip)?;
            world.scene.record_pulse(owner);
        }
        _ => {
            return Err(eval_error!(
                "unknown host intrinsic {} at {} in {}",
                name,
                ip,
                body.full_name()
            ))
        }
    }
    Ok(())
}
