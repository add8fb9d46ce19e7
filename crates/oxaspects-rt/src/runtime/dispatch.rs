//! Message dispatch, the runtime's `objc_msgSend`.
//!
//! # Dispatch Algorithm
//!
//! 1. Read the receiver's current runtime type (isa)
//! 2. Resolve the selector through the class's cache, walking the
//!    inheritance chain on a miss
//! 3. Validate argument count and types against the method encoding
//! 4. Invoke the implementation
//! 5. Validate the returned value against the declared return type
//!
//! Faults raised by an implementation are returned unchanged.
//!
//! # Example
//!
//! ```rust
//! use oxaspects_rt::runtime::dispatch;
//! use oxaspects_rt::{Class, MessageArgs, Method, Object, Selector, Value};
//! use std::str::FromStr;
//!
//! let class = Class::new_root("DispatchDocCounter").unwrap();
//! class
//!     .add_method(
//!         Method::from_fn("double:", "i@:i", |_, _, args| {
//!             Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
//!         })
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let obj = Object::new(&class).unwrap();
//! let sel = Selector::from_str("double:").unwrap();
//! let ret = dispatch::send_message(&obj, &sel, &MessageArgs::one(21)).unwrap();
//! assert_eq!(ret, Value::Int(42));
//!
//! // wrong argument type
//! assert!(dispatch::send_message(&obj, &sel, &MessageArgs::one("21")).is_err());
//! ```

use crate::error::{Error, Result};
use crate::runtime::class::Method;
use crate::runtime::encoding::Signature;
use crate::runtime::{Class, Imp, MessageArgs, Object, Selector, Value};

/// Sends a message to an object.
///
/// # Errors
///
/// - [`Error::SelectorNotFound`] if no class in the receiver's chain
///   implements `selector`
/// - [`Error::ArgumentCountMismatch`] / [`Error::ArgumentTypeMismatch`] if
///   `args` do not match the method encoding
/// - [`Error::ReturnTypeMismatch`] if the implementation returns a value of
///   the wrong type
/// - any fault the implementation raises
pub fn send_message(obj: &Object, selector: &Selector, args: &MessageArgs) -> Result<Value> {
    let method = obj
        .class()
        .resolve(selector)
        .ok_or_else(|| not_found(selector))?;
    call_method(&method, obj, selector, args.as_slice())
}

/// Sends a message starting the lookup at `class`'s superclass.
///
/// # Errors
///
/// Same as [`send_message`].
pub fn send_super(
    obj: &Object,
    class: &Class,
    selector: &Selector,
    args: &MessageArgs,
) -> Result<Value> {
    let method = class
        .super_class()
        .and_then(|super_class| super_class.resolve(selector))
        .ok_or_else(|| not_found(selector))?;
    call_method(&method, obj, selector, args.as_slice())
}

/// Calls an implementation handle directly, bypassing lookup and validation.
///
/// # Errors
///
/// Returns whatever the implementation returns.
pub fn invoke(imp: &Imp, obj: &Object, selector: &Selector, args: &[Value]) -> Result<Value> {
    imp.call(obj, selector, args)
}

fn not_found(selector: &Selector) -> Error {
    Error::SelectorNotFound {
        selector: selector.name().to_string(),
    }
}

fn call_method(method: &Method, obj: &Object, selector: &Selector, args: &[Value]) -> Result<Value> {
    validate_arguments(&method.types, args)?;
    let ret = method.imp.call(obj, selector, args)?;
    validate_return(&method.types, ret)
}

/// Checks `args` against the argument types of `signature`.
///
/// # Errors
///
/// Returns [`Error::ArgumentCountMismatch`] or [`Error::ArgumentTypeMismatch`].
pub fn validate_arguments(signature: &Signature, args: &[Value]) -> Result<()> {
    let expected = signature.argument_types();
    if expected.len() != args.len() {
        return Err(Error::ArgumentCountMismatch {
            expected: expected.len(),
            got: args.len(),
        });
    }

    for (index, (&code, arg)) in expected.iter().zip(args).enumerate() {
        if !arg.conforms_to(code) {
            return Err(Error::ArgumentTypeMismatch {
                expected: code,
                got: arg.type_code(),
                index,
            });
        }
    }

    Ok(())
}

/// Checks a returned value against `signature`. Void methods always return
/// [`Value::Void`].
///
/// # Errors
///
/// Returns [`Error::ReturnTypeMismatch`].
pub fn validate_return(signature: &Signature, ret: Value) -> Result<Value> {
    if signature.returns_void() {
        return Ok(Value::Void);
    }
    if ret.conforms_to(signature.return_type()) {
        Ok(ret)
    } else {
        Err(Error::ReturnTypeMismatch {
            expected: signature.return_type(),
            got: ret.type_code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sel(name: &str) -> Selector {
        Selector::from_str(name).unwrap()
    }

    #[test]
    fn test_selector_not_found() {
        let class = Class::new_root("DispatchTestMissing").unwrap();
        let obj = Object::new(&class).unwrap();

        let err = send_message(&obj, &sel("missing"), &MessageArgs::none()).unwrap_err();
        assert_eq!(
            err,
            Error::SelectorNotFound {
                selector: "missing".into()
            }
        );
    }

    #[test]
    fn test_argument_validation() {
        let class = Class::new_root("DispatchTestArgs").unwrap();
        class
            .add_method(Method::from_fn("take:and:", "v@:i@", |_, _, _| Ok(Value::Void)).unwrap())
            .unwrap();
        let obj = Object::new(&class).unwrap();
        let s = sel("take:and:");

        assert_eq!(
            send_message(&obj, &s, &MessageArgs::one(1)).unwrap_err(),
            Error::ArgumentCountMismatch {
                expected: 2,
                got: 1
            }
        );
        assert_eq!(
            send_message(&obj, &s, &MessageArgs::two(1, 2)).unwrap_err(),
            Error::ArgumentTypeMismatch {
                expected: '@',
                got: 'i',
                index: 1
            }
        );
        assert_eq!(
            send_message(&obj, &s, &MessageArgs::many(vec![Value::Int(1), Value::Nil])),
            Ok(Value::Void)
        );
    }

    #[test]
    fn test_return_validation() {
        let class = Class::new_root("DispatchTestReturn").unwrap();
        class
            .add_method(Method::from_fn("lies", "i@:", |_, _, _| Ok(Value::from("no"))).unwrap())
            .unwrap();
        class
            .add_method(Method::from_fn("quiet", "v@:", |_, _, _| Ok(Value::Int(1))).unwrap())
            .unwrap();
        let obj = Object::new(&class).unwrap();

        assert_eq!(
            send_message(&obj, &sel("lies"), &MessageArgs::none()).unwrap_err(),
            Error::ReturnTypeMismatch {
                expected: 'i',
                got: '*'
            }
        );
        assert_eq!(
            send_message(&obj, &sel("quiet"), &MessageArgs::none()),
            Ok(Value::Void)
        );
    }

    #[test]
    fn test_raised_fault_propagates() {
        let class = Class::new_root("DispatchTestRaise").unwrap();
        class
            .add_method(
                Method::from_fn("explode", "v@:", |_, sel, _| Err(Error::raised(sel, "boom")))
                    .unwrap(),
            )
            .unwrap();
        let obj = Object::new(&class).unwrap();

        assert_eq!(
            send_message(&obj, &sel("explode"), &MessageArgs::none()).unwrap_err(),
            Error::Raised {
                selector: "explode".into(),
                reason: "boom".into()
            }
        );
    }

    #[test]
    fn test_send_super() {
        let root = Class::new_root("DispatchTestSuperRoot").unwrap();
        let child = Class::new("DispatchTestSuperChild", &root).unwrap();
        root.add_method(Method::from_fn("who", "*@:", |_, _, _| Ok("root".into())).unwrap())
            .unwrap();
        child
            .add_method(Method::from_fn("who", "*@:", |_, _, _| Ok("child".into())).unwrap())
            .unwrap();
        let obj = Object::new(&child).unwrap();

        assert_eq!(
            send_message(&obj, &sel("who"), &MessageArgs::none()).unwrap().as_str(),
            Some("child")
        );
        assert_eq!(
            send_super(&obj, &child, &sel("who"), &MessageArgs::none())
                .unwrap()
                .as_str(),
            Some("root")
        );
        assert!(send_super(&obj, &root, &sel("who"), &MessageArgs::none()).is_err());
    }

    #[test]
    fn test_invoke_skips_validation() {
        let imp = Imp::new(|_, _, args| Ok(Value::Int(i32::try_from(args.len()).unwrap_or(-1))));
        let class = Class::new_root("DispatchTestInvoke").unwrap();
        let obj = Object::new(&class).unwrap();

        let ret = invoke(&imp, &obj, &sel("anything"), &[Value::Nil, Value::Nil]).unwrap();
        assert_eq!(ret, Value::Int(2));
    }
}
