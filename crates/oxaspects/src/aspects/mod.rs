//! The interception engine.
//!
//! # Architecture
//!
//! - [`options`]: Position and behavior flags of a hook request
//! - [`block`]: Advice callbacks and their signature check
//! - `info`: Advice records
//! - `container`: Per-method advice chains and the trampoline body
//! - [`context`]: The invocation context handed to advice
//! - [`strategy`]: Synthesized subclasses for instance-only hooks
//! - `registry`: Process-wide map of hooked methods to containers
//! - [`api`]: The public hooking surface
//!
//! A hook request resolves the method on the target's hierarchy, checks the
//! block against the method's signature, then fetches or creates the
//! container and appends the record. The first record of a container
//! redirects the method's table entry to a trampoline; removing the last one
//! puts the original entry back.

pub mod api;
pub mod block;
pub(crate) mod container;
pub mod context;
pub(crate) mod info;
pub mod options;
pub(crate) mod registry;
pub mod strategy;

pub use api::{ClassAspects, HookTarget, ObjectAspects, all_identifiers, hook_method, remove_hook};
pub use block::Block;
pub use context::InvocationContext;
pub use options::{AspectOptions, Position};
pub use strategy::SUBCLASS_PREFIX;
