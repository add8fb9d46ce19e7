//! Public hooking surface.
//!
//! [`hook_method`], [`remove_hook`] and [`all_identifiers`] take an explicit
//! [`HookTarget`]. The [`ClassAspects`] and [`ObjectAspects`] extension traits
//! offer the same operations as methods on classes and objects.

use crate::aspects::block::Block;
use crate::aspects::container::HookKey;
use crate::aspects::info::AspectInfo;
use crate::aspects::options::AspectOptions;
use crate::aspects::registry;
use crate::error::{AspectError, Result};
use oxaspects_log::{debug, warn};
use oxaspects_rt::{Class, Method, Object, Selector};
use std::str::FromStr;

/// What a hook applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookTarget {
    /// An instance method, for every instance of the class and its subclasses
    Class(Class),
    /// A class method of the class
    ClassMethods(Class),
    /// An instance method, for this one object only
    Instance(Object),
}

impl HookTarget {
    /// Class objects stand for their class: hooking one hooks class methods.
    fn normalized(&self) -> HookTarget {
        match self {
            HookTarget::Instance(object) => match object.represented_class() {
                Some(class) => HookTarget::ClassMethods(class),
                None => self.clone(),
            },
            other => other.clone(),
        }
    }

    fn metaclass(class: &Class) -> Result<Class> {
        class
            .metaclass()
            .ok_or_else(|| AspectError::Other(format!("{} is a metaclass", class.name())))
    }

    /// Resolves `selector` on the hierarchy this target dispatches through.
    fn lookup(&self, selector: &Selector) -> Result<Method> {
        let class = match self {
            HookTarget::Class(class) => class.clone(),
            HookTarget::ClassMethods(class) => Self::metaclass(class)?,
            HookTarget::Instance(object) => object.class(),
        };
        class
            .lookup_method(selector)
            .ok_or_else(|| AspectError::MethodNotFound {
                selector: selector.name().to_string(),
            })
    }

    fn key(&self, selector: &Selector) -> Option<HookKey> {
        match self {
            HookTarget::Class(class) => Some(HookKey::Class(class.clone(), selector.clone())),
            HookTarget::ClassMethods(class) => class
                .metaclass()
                .map(|meta| HookKey::Class(meta, selector.clone())),
            HookTarget::Instance(object) => Some(HookKey::Instance(object.id(), selector.clone())),
        }
    }
}

impl From<&Class> for HookTarget {
    fn from(class: &Class) -> Self {
        HookTarget::Class(class.clone())
    }
}

impl From<&Object> for HookTarget {
    fn from(object: &Object) -> Self {
        HookTarget::Instance(object.clone())
    }
}

/// Attaches `block` to `selector` on `target`.
///
/// # Errors
///
/// - [`AspectError::MethodNotFound`] if the selector does not resolve on the
///   target's hierarchy
/// - [`AspectError::BlockSignatureMismatch`] if the block does not fit the
///   method
/// - [`AspectError::IdentifierExists`] if `identifier` is already registered
///   for the method
/// - [`AspectError::InsteadSlotOccupied`] for a second Instead registration
/// - [`AspectError::Other`] for an invalid position, an empty identifier or
///   a failure to synthesize the instance subclass
///
/// Nothing is changed when an error is returned.
///
/// # Example
///
/// ```rust
/// use oxaspects::{AspectOptions, Block, HookTarget, hook_method, remove_hook};
/// use oxaspects_rt::{Class, Method, Value};
///
/// let class = Class::new_root("ApiDocGreeter").unwrap();
/// class
///     .add_method(Method::from_fn("greet", "*@:", |_, _, _| Ok(Value::from("hi"))).unwrap())
///     .unwrap();
///
/// let target = HookTarget::from(&class);
/// let log = Block::new("v@", |ctx, _| {
///     println!("about to {}", ctx.selector());
///     Ok(Value::Void)
/// })
/// .unwrap();
///
/// hook_method(&target, "greet", AspectOptions::BEFORE, "log", log).unwrap();
/// assert!(remove_hook(&target, "greet", "log"));
/// ```
pub fn hook_method(
    target: &HookTarget,
    selector: &str,
    options: AspectOptions,
    identifier: &str,
    block: Block,
) -> Result<()> {
    let result = install(&target.normalized(), selector, options, identifier, block);
    match &result {
        Ok(()) => debug!("hooked {} with '{}'", selector, identifier),
        Err(err) => warn!("rejected hook '{}' on {}: {}", identifier, selector, err),
    }
    result
}

fn install(
    target: &HookTarget,
    selector: &str,
    options: AspectOptions,
    identifier: &str,
    block: Block,
) -> Result<()> {
    let position = options.position()?;
    if identifier.is_empty() {
        return Err(AspectError::Other("identifier must not be empty".into()));
    }

    let sel = Selector::from_str(selector).map_err(|_| AspectError::MethodNotFound {
        selector: selector.to_string(),
    })?;
    let method = target.lookup(&sel)?;

    // Checked before any registry or class state is touched.
    let relaxed = options.weak_signature_check();
    block.check_signature(&method.types, position, relaxed)?;

    let info = AspectInfo::new(identifier, position, options.automatic_removal(), block);
    match target {
        HookTarget::Class(class) => registry::add_class_hook(class, class, &method, info, relaxed),
        HookTarget::ClassMethods(class) => {
            registry::add_class_hook(&HookTarget::metaclass(class)?, class, &method, info, relaxed)
        }
        HookTarget::Instance(object) => registry::add_instance_hook(object, &method, info, relaxed),
    }
}

/// Removes the advice `identifier` from `selector` on `target`.
///
/// Returns `false` if no such advice is registered. Removing the last advice
/// of a method restores its original dispatch, and removing an object's last
/// instance hook restores its runtime type.
pub fn remove_hook(target: &HookTarget, selector: &str, identifier: &str) -> bool {
    let Ok(sel) = Selector::from_str(selector) else {
        return false;
    };
    target
        .normalized()
        .key(&sel)
        .is_some_and(|key| registry::remove(&key, identifier))
}

/// Identifiers of the advice on `selector` for `target`: before chain,
/// instead slot, after chain. Empty for unhooked methods.
#[must_use]
pub fn all_identifiers(target: &HookTarget, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::from_str(selector) else {
        return Vec::new();
    };
    target
        .normalized()
        .key(&sel)
        .map(|key| registry::identifiers(&key))
        .unwrap_or_default()
}

/// Hooking operations on classes.
pub trait ClassAspects {
    /// Hooks an instance method for every instance.
    ///
    /// # Errors
    ///
    /// See [`hook_method`].
    fn hook_instance_method(
        &self,
        selector: &str,
        options: AspectOptions,
        identifier: &str,
        block: Block,
    ) -> Result<()>;

    /// Hooks a class method.
    ///
    /// # Errors
    ///
    /// See [`hook_method`].
    fn hook_class_method(
        &self,
        selector: &str,
        options: AspectOptions,
        identifier: &str,
        block: Block,
    ) -> Result<()>;

    /// Removes the class-wide instance-method advice `identifier`.
    fn remove_instance_hook(&self, selector: &str, identifier: &str) -> bool;

    /// Removes the class-method advice `identifier`.
    fn remove_class_hook(&self, selector: &str, identifier: &str) -> bool;

    /// Class-wide instance-method advice on `selector`, in chain order.
    fn instance_hook_identifiers(&self, selector: &str) -> Vec<String>;

    /// Class-method advice on `selector`, in chain order.
    fn class_hook_identifiers(&self, selector: &str) -> Vec<String>;
}

impl ClassAspects for Class {
    fn hook_instance_method(
        &self,
        selector: &str,
        options: AspectOptions,
        identifier: &str,
        block: Block,
    ) -> Result<()> {
        hook_method(&HookTarget::Class(self.clone()), selector, options, identifier, block)
    }

    fn hook_class_method(
        &self,
        selector: &str,
        options: AspectOptions,
        identifier: &str,
        block: Block,
    ) -> Result<()> {
        hook_method(
            &HookTarget::ClassMethods(self.clone()),
            selector,
            options,
            identifier,
            block,
        )
    }

    fn remove_instance_hook(&self, selector: &str, identifier: &str) -> bool {
        remove_hook(&HookTarget::Class(self.clone()), selector, identifier)
    }

    fn remove_class_hook(&self, selector: &str, identifier: &str) -> bool {
        remove_hook(&HookTarget::ClassMethods(self.clone()), selector, identifier)
    }

    fn instance_hook_identifiers(&self, selector: &str) -> Vec<String> {
        all_identifiers(&HookTarget::Class(self.clone()), selector)
    }

    fn class_hook_identifiers(&self, selector: &str) -> Vec<String> {
        all_identifiers(&HookTarget::ClassMethods(self.clone()), selector)
    }
}

/// Hooking operations on single objects.
pub trait ObjectAspects {
    /// Hooks an instance method of this object only.
    ///
    /// # Errors
    ///
    /// See [`hook_method`].
    fn hook_instance_method(
        &self,
        selector: &str,
        options: AspectOptions,
        identifier: &str,
        block: Block,
    ) -> Result<()>;

    /// Removes this object's advice `identifier`.
    fn remove_hook(&self, selector: &str, identifier: &str) -> bool;

    /// This object's own advice on `selector`, in chain order.
    fn hook_identifiers(&self, selector: &str) -> Vec<String>;
}

impl ObjectAspects for Object {
    fn hook_instance_method(
        &self,
        selector: &str,
        options: AspectOptions,
        identifier: &str,
        block: Block,
    ) -> Result<()> {
        hook_method(&HookTarget::Instance(self.clone()), selector, options, identifier, block)
    }

    fn remove_hook(&self, selector: &str, identifier: &str) -> bool {
        remove_hook(&HookTarget::Instance(self.clone()), selector, identifier)
    }

    fn hook_identifiers(&self, selector: &str) -> Vec<String> {
        all_identifiers(&HookTarget::Instance(self.clone()), selector)
    }
}
