//! `OxAspects` runtime: an Objective-C style dynamic dispatch substrate.
//!
//! This crate provides the primitives the interception engine consumes:
//!
//! - **Selectors** interned once per name, compared by pointer
//! - **Classes** with metaclasses, per-class method tables and cached lookup
//! - **Objects** whose runtime type tag can be retargeted after creation
//! - **Type encodings** describing method and block signatures
//! - **Message dispatch** with argument and return value validation
//!
//! # Example
//!
//! ```rust
//! use oxaspects_rt::{Class, Method, MessageArgs, Object, Selector, Value};
//! use std::str::FromStr;
//!
//! let class = Class::new_root("LibDocGreeter").unwrap();
//! class
//!     .add_method(Method::from_fn("greet", "*@:", |_, _, _| Ok(Value::from("hi"))).unwrap())
//!     .unwrap();
//!
//! let obj = Object::new(&class).unwrap();
//! let sel = Selector::from_str("greet").unwrap();
//! let ret = obj.send_message(&sel, &MessageArgs::none()).unwrap();
//! assert_eq!(ret.as_str(), Some("hi"));
//! ```

pub mod error;
pub mod runtime;

pub use error::{Error, Result};
pub use runtime::{
    BlockSignature, Class, ClassBuilder, Imp, MessageArgs, Method, Object,
    Selector, Signature, Value, all_classes, allocate_class, class_from_name,
};
