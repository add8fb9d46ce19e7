//! Runtime module.
//!
//! # Architecture
//!
//! - [`selector`]: Selector interning
//! - [`encoding`]: Method and block type encodings
//! - [`value`]: Dynamically typed values and message arguments
//! - [`class`]: Classes, metaclasses, method tables and runtime class creation
//! - [`object`]: Instances with a retargetable runtime type tag
//! - [`dispatch`]: Message sending
//!
//! Classes and selectors are registered globally and live for the whole
//! process. Objects are reference counted.

pub mod class;
pub mod dispatch;
pub mod encoding;
pub mod object;
pub mod selector;
pub mod value;

pub use class::{Class, ClassBuilder, Imp, Method, all_classes, allocate_class, class_from_name};
pub use encoding::{BlockSignature, Signature};
pub use object::Object;
pub use selector::Selector;
pub use value::{MessageArgs, Value};
