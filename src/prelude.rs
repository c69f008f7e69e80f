//! Common imports for working with `ilweave`.
//!
//! This prelude re-exports the types needed for the typical workflow: stand up a
//! host, install the reskinning feature, spawn skinned and stock entities, and
//! drive the scheduler. Import it with:
//!
//! ```rust
//! use ilweave::prelude::*;
//! ```

// Core result handling
pub use crate::{Error, Result};

// Instruction model and patching
pub use crate::il::{Cursor, Instruction, MethodBody, MoveType, Value};
pub use crate::patch::{replace_literals, suppress_branch, HookFn, HookTable, SubstitutionTable};

// Host runtime
pub use crate::host::{
    CoroutineId, CoroutineState, Entity, EntityId, EntityKind, Host, MapDef, ParticleType,
    Position, World,
};

// Reskinning feature
pub use crate::skin::{Attrs, SkinHooks, SkinOverrides};
