//! `Object` instances.
//!
//! An object is a reference-counted handle to an instance carrying a unique
//! process-wide id and a runtime type tag (the `isa` class). The tag can be
//! retargeted after creation with [`Object::set_class`]; dispatch always reads
//! the current tag.
//!
//! Every class also owns a *class object*: an `Object` whose runtime type is
//! the metaclass. It is the receiver of class-method sends and reports the
//! class it stands for through [`Object::represented_class`].

use crate::error::Result;
use crate::runtime::class::ClassInner;
use crate::runtime::{Class, MessageArgs, Selector, Value, dispatch};
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

struct ObjectInner {
    id: u64,
    isa: RwLock<Class>,
    /// Set for class objects only
    represents: Option<Weak<ClassInner>>,
}

/// A runtime object.
///
/// Cloning shares the same instance. Equality is identity.
///
/// # Example
///
/// ```rust
/// use oxaspects_rt::{Class, Object};
///
/// let class = Class::new_root("DocObjectClass").unwrap();
/// let obj = Object::new(&class).unwrap();
/// let alias = obj.clone();
///
/// assert_eq!(obj, alias);
/// assert_eq!(obj.class(), class);
/// assert_ne!(obj, Object::new(&class).unwrap());
/// ```
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Creates a new instance of `class`.
    ///
    /// # Errors
    ///
    /// This function currently always returns `Ok`.
    pub fn new(class: &Class) -> Result<Self> {
        Ok(Object::with_isa(class.clone(), None))
    }

    pub(crate) fn class_object(meta: &Class, represents: Weak<ClassInner>) -> Self {
        Object::with_isa(meta.clone(), Some(represents))
    }

    fn with_isa(isa: Class, represents: Option<Weak<ClassInner>>) -> Self {
        Object {
            inner: Arc::new(ObjectInner {
                id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
                isa: RwLock::new(isa),
                represents,
            }),
        }
    }

    /// Unique id of this instance, stable for its lifetime.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The current runtime type tag.
    #[must_use]
    pub fn class(&self) -> Class {
        self.inner.isa.read().clone()
    }

    /// Retargets the runtime type tag and returns the previous one.
    pub fn set_class(&self, class: &Class) -> Class {
        let previous = std::mem::replace(&mut *self.inner.isa.write(), class.clone());
        oxaspects_log::trace!(
            "object {} retargeted from {} to {}",
            self.inner.id,
            previous.name(),
            class.name()
        );
        previous
    }

    /// The class this object reports to the outside world.
    ///
    /// Sends `class` when the runtime type responds to it and the answer is a
    /// class; otherwise returns the runtime type.
    #[must_use]
    pub fn apparent_class(&self) -> Class {
        let isa = self.class();
        let Ok(sel) = Selector::from_str("class") else {
            return isa;
        };
        match isa.resolve(&sel) {
            Some(method) => match method.imp.call(self, &sel, &[]) {
                Ok(Value::Class(reported)) => reported,
                _ => isa,
            },
            None => isa,
        }
    }

    /// For class objects, the class they stand for.
    #[must_use]
    pub fn represented_class(&self) -> Option<Class> {
        self.inner
            .represents
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Class { inner })
    }

    /// Returns `true` if this is a class object.
    #[must_use]
    pub fn is_class_object(&self) -> bool {
        self.inner.represents.is_some()
    }

    /// Sends a message to this object. See [`dispatch::send_message`].
    ///
    /// # Errors
    ///
    /// Returns the dispatch error or the fault raised by the implementation.
    pub fn send_message(&self, selector: &Selector, args: &MessageArgs) -> Result<Value> {
        dispatch::send_message(self, selector, args)
    }

    /// Returns `true` if the runtime type responds to `selector`.
    #[must_use]
    pub fn responds_to(&self, selector: &Selector) -> bool {
        self.class().responds_to(selector)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.inner.id)
            .field("class", &self.class().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Method;

    #[test]
    fn test_unique_ids() {
        let class = Class::new_root("ObjectTestIds").unwrap();
        let a = Object::new(&class).unwrap();
        let b = Object::new(&class).unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_set_class_returns_previous() {
        let root = Class::new_root("ObjectTestRetargetRoot").unwrap();
        let sub = Class::new("ObjectTestRetargetSub", &root).unwrap();
        let obj = Object::new(&root).unwrap();

        let previous = obj.set_class(&sub);
        assert_eq!(previous, root);
        assert_eq!(obj.class(), sub);

        // clones observe the retarget
        let alias = obj.clone();
        obj.set_class(&root);
        assert_eq!(alias.class(), root);
    }

    #[test]
    fn test_apparent_class_uses_class_override() {
        let root = Class::new_root("ObjectTestApparentRoot").unwrap();
        let disguise = Class::new("ObjectTestApparentDisguise", &root).unwrap();
        let reported = root.clone();
        disguise
            .add_method(
                Method::from_fn("class", "#@:", move |_, _, _| {
                    Ok(Value::Class(reported.clone()))
                })
                .unwrap(),
            )
            .unwrap();

        let obj = Object::new(&root).unwrap();
        assert_eq!(obj.apparent_class(), root);

        obj.set_class(&disguise);
        assert_eq!(obj.class(), disguise);
        assert_eq!(obj.apparent_class(), root);
    }

    #[test]
    fn test_class_object() {
        let class = Class::new_root("ObjectTestClassObject").unwrap();
        let object = class.class_object().unwrap();

        assert!(object.is_class_object());
        assert_eq!(object.represented_class(), Some(class.clone()));
        assert_eq!(object.class(), class.metaclass().unwrap());

        let instance = Object::new(&class).unwrap();
        assert!(!instance.is_class_object());
        assert!(instance.represented_class().is_none());
    }
}
