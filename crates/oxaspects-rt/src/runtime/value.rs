//! Dynamically typed argument and return values.
//!
//! Every value knows the type encoding it travels as ([`Value::type_code`]) and
//! can be checked against a declared encoding ([`Value::conforms_to`]) before a
//! method body sees it.

use crate::runtime::encoding::types;
use crate::runtime::{Class, Object, Selector};

/// A single argument or return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value (`v`)
    Void,
    /// The null object or class
    Nil,
    /// `B`
    Bool(bool),
    /// `i`
    Int(i32),
    /// `l` / `q`
    Long(i64),
    /// `f`
    Float(f32),
    /// `d`
    Double(f64),
    /// `*`
    Str(String),
    /// `@`
    Object(Object),
    /// `#`
    Class(Class),
    /// `:`
    Selector(Selector),
    /// `^`
    Pointer(usize),
}

impl Value {
    /// The encoding character this value travels as.
    ///
    /// `Nil` reports `@`; `Long` reports `q`.
    #[must_use]
    pub fn type_code(&self) -> char {
        match self {
            Value::Void => types::VOID,
            Value::Nil | Value::Object(_) => types::OBJECT,
            Value::Bool(_) => types::BOOL,
            Value::Int(_) => types::INT,
            Value::Long(_) => types::LONG_LONG,
            Value::Float(_) => types::FLOAT,
            Value::Double(_) => types::DOUBLE,
            Value::Str(_) => types::STRING,
            Value::Class(_) => types::CLASS,
            Value::Selector(_) => types::SELECTOR,
            Value::Pointer(_) => types::POINTER,
        }
    }

    /// Returns `true` if this value may be passed where `code` is declared.
    ///
    /// ```
    /// use oxaspects_rt::Value;
    ///
    /// assert!(Value::Int(1).conforms_to('i'));
    /// assert!(Value::Long(1).conforms_to('l'));
    /// assert!(Value::Nil.conforms_to('#'));
    /// assert!(Value::Str("x".into()).conforms_to('?'));
    /// assert!(!Value::Int(1).conforms_to('d'));
    /// ```
    #[must_use]
    pub fn conforms_to(&self, code: char) -> bool {
        if code == types::UNKNOWN {
            return true;
        }
        match self {
            Value::Nil => code == types::OBJECT || code == types::CLASS,
            Value::Long(_) => code == types::LONG || code == types::LONG_LONG,
            other => other.type_code() == code,
        }
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as `i64`, widening `Int`.
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(l) => Some(*l),
            Value::Int(i) => Some(i64::from(*i)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as `f64`, widening `Float`.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Float(f) => Some(f64::from(*f)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_selector(&self) -> Option<&Selector> {
        match self {
            Value::Selector(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_pointer(&self) -> Option<usize> {
        match self {
            Value::Pointer(p) => Some(*p),
            _ => None,
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Void
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<&Object> for Value {
    fn from(o: &Object) -> Self {
        Value::Object(o.clone())
    }
}

impl From<Class> for Value {
    fn from(c: Class) -> Self {
        Value::Class(c)
    }
}

impl From<Selector> for Value {
    fn from(s: Selector) -> Self {
        Value::Selector(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    /// `None` becomes [`Value::Nil`].
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

/// Arguments of a single message send, excluding self and `_cmd`.
///
/// # Example
///
/// ```rust
/// use oxaspects_rt::{MessageArgs, Value};
///
/// let args = MessageArgs::two(10, "ten");
/// assert_eq!(args.count(), 2);
/// assert_eq!(args.as_slice()[1], Value::from("ten"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageArgs(Vec<Value>);

impl MessageArgs {
    /// No arguments.
    #[must_use]
    pub fn none() -> Self {
        MessageArgs(Vec::new())
    }

    /// A single argument.
    pub fn one(arg: impl Into<Value>) -> Self {
        MessageArgs(vec![arg.into()])
    }

    /// Two arguments.
    pub fn two(a: impl Into<Value>, b: impl Into<Value>) -> Self {
        MessageArgs(vec![a.into(), b.into()])
    }

    /// Any number of arguments.
    #[must_use]
    pub fn many(args: Vec<Value>) -> Self {
        MessageArgs(args)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for MessageArgs {
    fn from(args: Vec<Value>) -> Self {
        MessageArgs(args)
    }
}

impl From<&[Value]> for MessageArgs {
    fn from(args: &[Value]) -> Self {
        MessageArgs(args.to_vec())
    }
}
