//! # ilweave - runtime behavior injection for closed instruction streams
//!
//! `ilweave` rewrites the compiled method bodies of a closed host at runtime:
//! it scans an instruction stream for declared patterns, injects callback
//! trampolines behind the matched sites, and commits the rewritten body so every
//! subsequent invocation runs the injected logic inline. On top of the engine it
//! ships a complete feature - per-instance reskinning of the host's collectible
//! entities - exercising every part of the machinery: literal substitution,
//! branch suppression, patching inside compiler-generated coroutine step-bodies,
//! call interception, scoped shared-state override, and a transactional
//! install/uninstall lifecycle.
//!
//! # Architecture
//!
//! - [`il`] - the instruction model, pattern-scanning cursor, and the
//!   stack-machine evaluator the host runs its bodies on
//! - [`patch`] - hook registration and the injection passes
//! - [`host`] - the closed host runtime: world services, method dispatch,
//!   cooperative scheduler, and the pristine fixture bodies
//! - [`skin`] - the reskinning feature: override records and the lifecycle
//!   that installs them into a host
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ilweave::prelude::*;
//!
//! # fn main() -> ilweave::Result<()> {
//! let mut host = Host::with_fixtures();
//! let mut hooks = SkinHooks::new();
//! hooks.install(&mut host)?;
//!
//! // A skinned collectible substitutes its own resources...
//! let mut attrs = Attrs::new();
//! attrs.set("touchSound", "event:/custom/touch");
//! let overrides = Arc::new(SkinOverrides::from_attrs(
//!     &attrs,
//!     &host.world().particles,
//! ));
//! let skinned = host
//!     .world_mut()
//!     .scene
//!     .spawn(Entity::collectible(Position::default()).with_overrides(overrides));
//! host.on_player(skinned)?;
//! assert_eq!(host.world().audio.events()[0].path, "event:/custom/touch");
//!
//! // ...while an unskinned one keeps the host's stock behavior.
//! let plain = host
//!     .world_mut()
//!     .scene
//!     .spawn(Entity::collectible(Position::default()));
//! host.on_player(plain)?;
//! assert_eq!(host.world().audio.events()[1].path, "event:/collect/touch");
//!
//! hooks.uninstall(&mut host);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

#[macro_use]
pub(crate) mod error;

pub mod host;
pub mod il;
pub mod patch;
pub mod prelude;
pub mod skin;

pub use error::Error;

/// Convenience alias to simplify the usage of the library-provided [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;
