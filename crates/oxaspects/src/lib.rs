//! `OxAspects`: before/instead/after advice for the `OxAspects` runtime.
//!
//! Attach behavior to an existing method of a class, of a class's metaclass,
//! or of one single object, without touching the method's definition:
//!
//! - **Before** advice runs ahead of the original implementation
//! - **Instead** advice replaces it, optionally calling it through the
//!   [`InvocationContext`]
//! - **After** advice runs once the result is known
//!
//! Any number of Before and After records may be stacked; they run in
//! registration order. Every record carries an identifier used to remove it
//! again. Removing the last record of a method restores the method's original
//! dispatch.
//!
//! # Example
//!
//! ```rust
//! use oxaspects::{AspectOptions, Block, ClassAspects};
//! use oxaspects_rt::{Class, MessageArgs, Method, Object, Selector, Value};
//! use std::str::FromStr;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let class = Class::new_root("LibDocGreeter").unwrap();
//! class
//!     .add_method(Method::from_fn("greet", "*@:", |_, _, _| Ok(Value::from("hi"))).unwrap())
//!     .unwrap();
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//! let block = Block::new("v@", move |_, _| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(Value::Void)
//! })
//! .unwrap();
//! class
//!     .hook_instance_method("greet", AspectOptions::BEFORE, "count", block)
//!     .unwrap();
//!
//! let obj = Object::new(&class).unwrap();
//! let sel = Selector::from_str("greet").unwrap();
//! assert_eq!(obj.send_message(&sel, &MessageArgs::none()).unwrap(), Value::from("hi"));
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//!
//! assert!(class.remove_instance_hook("greet", "count"));
//! ```
//!
//! # Logging
//!
//! The engine logs through `oxaspects-log`. Set `OXASPECTS_LOG=debug` and call
//! [`oxaspects_log::init_from_env`] to see installations and teardowns, or
//! `trace` to see every trampoline entry. Build with the `trace-chains`
//! feature to also trace each advice as it runs.

pub mod aspects;
pub mod error;

pub use aspects::{
    AspectOptions, Block, ClassAspects, HookTarget, InvocationContext,
    ObjectAspects, Position, SUBCLASS_PREFIX, all_identifiers, hook_method, remove_hook,
};
pub use error::{AspectError, Result, SUCCESS_CODE, result_code};
