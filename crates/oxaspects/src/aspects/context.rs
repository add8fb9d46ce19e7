//! The object every advice block receives as its first argument.

use crate::aspects::container::HookContainer;
use oxaspects_rt::{Class, Object, Selector, Signature, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Details of one intercepted call.
///
/// All accessors are side-effect free. [`InvocationContext::invoke_original`]
/// runs the pre-hook implementation every time it is called.
///
/// # Example
///
/// ```rust
/// use oxaspects::{AspectOptions, Block, ClassAspects};
/// use oxaspects_rt::{Class, MessageArgs, Method, Object, Selector, Value};
/// use std::str::FromStr;
///
/// let class = Class::new_root("ContextDocGreeter").unwrap();
/// class
///     .add_method(Method::from_fn("greet", "*@:", |_, _, _| Ok(Value::from("hi"))).unwrap())
///     .unwrap();
///
/// // wrap the original and decorate its result
/// let block = Block::new("*@", |ctx, _| {
///     let original = ctx.invoke_original()?;
///     Ok(Value::from(format!("{}!", original.as_str().unwrap_or_default())))
/// })
/// .unwrap();
/// class
///     .hook_instance_method("greet", AspectOptions::INSTEAD, "shout", block)
///     .unwrap();
///
/// let obj = Object::new(&class).unwrap();
/// let sel = Selector::from_str("greet").unwrap();
/// assert_eq!(obj.send_message(&sel, &MessageArgs::none()).unwrap(), Value::from("hi!"));
/// ```
pub struct InvocationContext {
    container: Arc<HookContainer>,
    receiver: Object,
    arguments: Vec<Value>,
    return_value: OnceLock<Value>,
}

impl InvocationContext {
    pub(crate) fn new(container: Arc<HookContainer>, receiver: Object, arguments: Vec<Value>) -> Self {
        InvocationContext {
            container,
            receiver,
            arguments,
            return_value: OnceLock::new(),
        }
    }

    /// The object the message was sent to.
    #[must_use]
    pub fn receiver(&self) -> &Object {
        &self.receiver
    }

    /// The hooked selector.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        self.container.selector()
    }

    /// The forwarded arguments, excluding self and `_cmd`.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// The hooked method's signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        self.container.signature()
    }

    /// The hooked method's type encoding.
    #[must_use]
    pub fn type_encoding(&self) -> &str {
        self.container.signature().encoding()
    }

    /// The class the hook was requested on.
    #[must_use]
    pub fn stated_class(&self) -> &Class {
        self.container.stated_class()
    }

    /// The class whose method table carries the trampoline. For instance
    /// hooks this is a synthesized subclass.
    #[must_use]
    pub fn hooked_class(&self) -> &Class {
        self.container.hooked_class()
    }

    #[must_use]
    pub fn is_instance_hook(&self) -> bool {
        self.container.is_instance_hook()
    }

    /// The value the caller will receive. Available to After advice only.
    #[must_use]
    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.get()
    }

    pub(crate) fn set_return_value(&self, value: Value) {
        let _ = self.return_value.set(value);
    }

    /// Runs the implementation that was in place before the hook, with the
    /// captured arguments, and returns its result.
    ///
    /// When the hooked class had no own implementation the call goes to the
    /// superclass's implementation. Each call runs the original again.
    ///
    /// # Errors
    ///
    /// Returns [`oxaspects_rt::Error::NoOriginalImplementation`] when neither
    /// the hooked class nor a superclass implements the method, or whatever
    /// fault the original raises.
    pub fn invoke_original(&self) -> oxaspects_rt::Result<Value> {
        let ret = self.container.original().call(
            &self.receiver,
            self.container.selector(),
            &self.arguments,
        )?;
        if self.container.signature().returns_void() {
            Ok(Value::Void)
        } else {
            Ok(ret)
        }
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("receiver", &self.receiver)
            .field("selector", &self.selector().name())
            .field("arguments", &self.arguments)
            .field("signature", &self.type_encoding())
            .finish_non_exhaustive()
    }
}
