//! Back-reference resolution for generated step-bodies.
//!
//! When patching inside a step-body, injected callbacks need the entity that
//! started the computation, but `arg0` there is the state-holder frame, not the
//! entity. The compiler synthesizes a back-reference field on the generated type
//! under a reserved naming convention; this resolver finds it in the body's
//! state-machine descriptor so the injector can load it before the trampoline.
//!
//! Resolution happens once, up front, per patch pass. A body whose shape does not
//! expose the field fails the whole pass before any site is touched.

use crate::il::MethodBody;
use crate::Result;

/// Resolves the synthesized back-reference field of a generated step-body.
///
/// The field is matched by the compiler's convention: a reserved `<>` prefix and
/// a `__this` suffix. Fails with a shape error when `body` carries no
/// state-machine descriptor or the descriptor has no such field.
pub fn back_ref_field(body: &MethodBody) -> Result<String> {
    let state_machine = body.state_machine().ok_or_else(|| {
        shape_error!(
            "{} has no state-machine descriptor to resolve a back-reference in",
            body.full_name()
        )
    })?;

    state_machine
        .fields
        .iter()
        .find(|field| field.starts_with("<>") && field.ends_with("__this"))
        .cloned()
        .ok_or_else(|| {
            shape_error!(
                "no back-reference field among the {} synthesized fields of {}",
                state_machine.fields.len(),
                body.full_name()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::StateMachine;

    #[test]
    fn test_resolves_by_convention() {
        let body = MethodBody::new_state_machine(
            "Collectible::<Collect>d__9",
            "MoveNext",
            StateMachine {
                kick_off: "Collect".to_string(),
                fields: vec!["<>1__state".to_string(), "<>4__this".to_string()],
            },
        );
        assert_eq!(back_ref_field(&body).unwrap(), "<>4__this");
    }

    #[test]
    fn test_missing_descriptor_is_a_shape_error() {
        let body = MethodBody::new("Collectible", "OnPlayer");
        assert!(matches!(
            back_ref_field(&body).unwrap_err(),
            crate::Error::Shape { .. }
        ));
    }

    #[test]
    fn test_descriptor_without_back_reference_is_a_shape_error() {
        let body = MethodBody::new_state_machine(
            "Collectible::<Collect>d__9",
            "MoveNext",
            StateMachine {
                kick_off: "Collect".to_string(),
                fields: vec!["<>1__state".to_string()],
            },
        );
        assert!(back_ref_field(&body).is_err());
    }
}
