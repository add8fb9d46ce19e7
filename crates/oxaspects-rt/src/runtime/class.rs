//! `Class` creation, inheritance and method tables.
//!
//! This module implements the class system with:
//! - `Class` registration by unique name
//! - Single inheritance with cycle detection
//! - A metaclass per class holding its class methods
//! - A class object per class, the receiver of class-method sends
//! - `Method` registration, replacement and cached lookup
//! - Runtime class creation through [`ClassBuilder`]
//!
//! # Architecture
//!
//! `Class`es are **globally registered** and never deallocated. Each class
//! owns its metaclass; the metaclass's superclass is the metaclass of the
//! class's superclass, so class methods are inherited the same way instance
//! methods are.
//!
//! # Method caching
//!
//! Every class keeps a lookup cache stamped with a process-wide method-table
//! epoch. Any table mutation on any class bumps the epoch, which invalidates
//! all caches at once. A subclass can therefore never keep dispatching to an
//! inherited implementation that was replaced on an ancestor.
//!
//! # Thread Safety
//!
//! The registry, method tables and caches are `parking_lot::RwLock`s. No lock
//! is held while an implementation runs.

use crate::error::{Error, Result};
use crate::runtime::encoding::Signature;
use crate::runtime::{Object, Selector, Value};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

type ImpFn = dyn Fn(&Object, &Selector, &[Value]) -> Result<Value> + Send + Sync;

/// `Method` implementation handle.
///
/// An opaque, cloneable callable taking the receiver, the selector (`_cmd`)
/// and the arguments. Cloning shares the same implementation; use
/// [`Imp::ptr_eq`] to ask whether two handles are the same implementation.
///
/// # Example
///
/// ```rust
/// use oxaspects_rt::{Imp, Value};
///
/// let imp = Imp::new(|_obj, _sel, args| Ok(args[0].clone()));
/// let same = imp.clone();
/// let other = Imp::new(|_obj, _sel, _args| Ok(Value::Void));
///
/// assert!(Imp::ptr_eq(&imp, &same));
/// assert!(!Imp::ptr_eq(&imp, &other));
/// ```
#[derive(Clone)]
pub struct Imp(Arc<ImpFn>);

impl Imp {
    /// Wraps a closure as an implementation.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Object, &Selector, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Imp(Arc::new(f))
    }

    /// Calls the implementation directly, without any validation.
    ///
    /// # Errors
    ///
    /// Returns whatever the implementation returns.
    pub fn call(&self, receiver: &Object, selector: &Selector, args: &[Value]) -> Result<Value> {
        (self.0)(receiver, selector, args)
    }

    /// Returns `true` if both handles share the same implementation.
    #[must_use]
    pub fn ptr_eq(a: &Imp, b: &Imp) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&a.0), Arc::as_ptr(&b.0))
    }
}

impl fmt::Debug for Imp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Imp({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

/// `Method` representation with implementation and type encoding.
#[derive(Clone)]
pub struct Method {
    /// `Method` selector
    pub selector: Selector,
    /// Implementation handle
    pub imp: Imp,
    /// Parsed type encoding (e.g. `v@:` for a void method without arguments)
    pub types: Signature,
}

impl Method {
    /// Creates a method from its parts, validating the encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] for malformed encodings.
    pub fn new(selector: Selector, imp: Imp, types: &str) -> Result<Self> {
        Ok(Method {
            selector,
            imp,
            types: Signature::parse(types)?,
        })
    }

    /// Creates a method from a selector name, an encoding and a closure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] or [`Error::InvalidEncoding`].
    ///
    /// ```rust
    /// use oxaspects_rt::{Method, Value};
    ///
    /// let method = Method::from_fn("add:to:", "i@:ii", |_, _, args| {
    ///     Ok(Value::Int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0)))
    /// })
    /// .unwrap();
    /// assert_eq!(method.types.argument_count(), 2);
    /// ```
    pub fn from_fn<F>(name: &str, types: &str, f: F) -> Result<Self>
    where
        F: Fn(&Object, &Selector, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Method::new(Selector::from_str(name)?, Imp::new(f), types)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("selector", &self.selector.name())
            .field("imp", &self.imp)
            .field("types", &self.types.encoding())
            .finish()
    }
}

/// Bumped after every method table mutation on any class.
static METHOD_EPOCH: AtomicU64 = AtomicU64::new(0);

fn bump_epoch() {
    METHOD_EPOCH.fetch_add(1, Ordering::AcqRel);
}

#[derive(Default)]
struct MethodCache {
    epoch: u64,
    entries: FxHashMap<Selector, Method>,
}

pub(crate) struct ClassInner {
    name: Box<str>,
    super_class: Option<Class>,
    /// `None` for metaclasses
    meta: Option<Class>,
    is_meta: bool,
    methods: RwLock<FxHashMap<Selector, Method>>,
    cache: RwLock<MethodCache>,
    /// `None` for metaclasses
    class_object: Option<Object>,
}

/// Global class registry: class name -> class.
static REGISTRY: LazyLock<RwLock<FxHashMap<Box<str>, Class>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// `Class` represents a runtime class definition with methods and inheritance.
///
/// Cloning is cheap; all clones refer to the same class.
///
/// # Example
///
/// ```rust
/// use oxaspects_rt::Class;
///
/// let root = Class::new_root("DocRootClass").unwrap();
/// let subclass = Class::new("DocSubclass", &root).unwrap();
///
/// assert!(subclass.is_subclass_of(&root));
/// assert!(subclass.metaclass().unwrap().is_subclass_of(&root.metaclass().unwrap()));
/// ```
#[derive(Clone)]
pub struct Class {
    pub(crate) inner: Arc<ClassInner>,
}

impl Class {
    /// Creates a new root class (no superclass).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassAlreadyExists`] if the name is taken.
    pub fn new_root(name: &str) -> Result<Self> {
        Class::create(name, None)
    }

    /// Creates a new subclass of `super_class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InheritanceCycle`] if `name` already appears in the
    /// superclass chain and [`Error::ClassAlreadyExists`] if the name is taken.
    pub fn new(name: &str, super_class: &Class) -> Result<Self> {
        let mut current = Some(super_class.clone());
        while let Some(class) = current {
            if class.name() == name {
                return Err(Error::InheritanceCycle);
            }
            current = class.super_class();
        }

        Class::create(name, Some(super_class))
    }

    fn create(name: &str, super_class: Option<&Class>) -> Result<Self> {
        let mut registry = REGISTRY.write();
        if registry.contains_key(name) {
            return Err(Error::ClassAlreadyExists {
                name: name.to_string(),
            });
        }

        let meta = Class {
            inner: Arc::new(ClassInner {
                name: name.into(),
                super_class: super_class.and_then(Class::metaclass),
                meta: None,
                is_meta: true,
                methods: RwLock::new(FxHashMap::default()),
                cache: RwLock::new(MethodCache::default()),
                class_object: None,
            }),
        };

        let inner = Arc::new_cyclic(|weak| ClassInner {
            name: name.into(),
            super_class: super_class.cloned(),
            class_object: Some(Object::class_object(&meta, weak.clone())),
            meta: Some(meta),
            is_meta: false,
            methods: RwLock::new(FxHashMap::default()),
            cache: RwLock::new(MethodCache::default()),
        });

        let class = Class { inner };
        registry.insert(name.into(), class.clone());
        oxaspects_log::trace!("registered class {}", name);
        Ok(class)
    }

    /// Returns the class name. A metaclass shares its class's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn super_class(&self) -> Option<Class> {
        self.inner.super_class.clone()
    }

    /// The metaclass holding this class's class methods; `None` for
    /// metaclasses.
    #[must_use]
    pub fn metaclass(&self) -> Option<Class> {
        self.inner.meta.clone()
    }

    #[must_use]
    pub fn is_metaclass(&self) -> bool {
        self.inner.is_meta
    }

    /// The object that receives class-method sends; `None` for metaclasses.
    #[must_use]
    pub fn class_object(&self) -> Option<Object> {
        self.inner.class_object.clone()
    }

    /// Adds a method to this class's own table, replacing any existing entry
    /// for the same selector.
    ///
    /// # Errors
    ///
    /// This function currently always returns `Ok(())`.
    pub fn add_method(&self, method: Method) -> Result<()> {
        self.inner
            .methods
            .write()
            .insert(method.selector.clone(), method);
        bump_epoch();
        Ok(())
    }

    /// Adds a class method (a method of the metaclass).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SelectorNotFound`] when called on a metaclass.
    pub fn add_class_method(&self, method: Method) -> Result<()> {
        match self.metaclass() {
            Some(meta) => meta.add_method(method),
            None => Err(Error::SelectorNotFound {
                selector: method.selector.name().to_string(),
            }),
        }
    }

    /// Returns the method in this class's own table, ignoring superclasses.
    #[must_use]
    pub fn own_method(&self, selector: &Selector) -> Option<Method> {
        self.inner.methods.read().get(selector).cloned()
    }

    /// Removes a method from this class's own table. Lookup then falls through
    /// to the superclass.
    pub fn remove_method(&self, selector: &Selector) -> Option<Method> {
        let removed = self.inner.methods.write().remove(selector);
        if removed.is_some() {
            bump_epoch();
        }
        removed
    }

    /// Returns the implementation from this class's own table.
    #[must_use]
    pub fn implementation(&self, selector: &Selector) -> Option<Imp> {
        self.inner
            .methods
            .read()
            .get(selector)
            .map(|method| method.imp.clone())
    }

    /// Replaces the implementation of a method in this class's own table and
    /// returns the previous one. The type encoding is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SelectorNotFound`] if this class has no own entry for
    /// `selector`; inherited methods must be replaced on the class that
    /// defines them, or overridden with [`Class::add_method`].
    pub fn set_implementation(&self, selector: &Selector, imp: Imp) -> Result<Imp> {
        let previous = {
            let mut methods = self.inner.methods.write();
            let method = methods
                .get_mut(selector)
                .ok_or_else(|| Error::SelectorNotFound {
                    selector: selector.name().to_string(),
                })?;
            std::mem::replace(&mut method.imp, imp)
        };
        bump_epoch();
        Ok(previous)
    }

    /// Looks up a method by selector, walking the inheritance chain.
    #[must_use]
    pub fn lookup_method(&self, selector: &Selector) -> Option<Method> {
        let mut current = Some(self.clone());
        while let Some(class) = current {
            if let Some(method) = class.own_method(selector) {
                return Some(method);
            }
            current = class.super_class();
        }
        None
    }

    /// Cached lookup used by dispatch.
    pub(crate) fn resolve(&self, selector: &Selector) -> Option<Method> {
        let epoch = METHOD_EPOCH.load(Ordering::Acquire);

        {
            let cache = self.inner.cache.read();
            if cache.epoch == epoch {
                if let Some(method) = cache.entries.get(selector) {
                    return Some(method.clone());
                }
            }
        }

        let method = self.lookup_method(selector)?;

        let mut cache = self.inner.cache.write();
        if cache.epoch < epoch {
            cache.entries.clear();
            cache.epoch = epoch;
        }
        // A newer epoch means this result may already be stale; skip caching.
        if cache.epoch == epoch {
            cache.entries.insert(selector.clone(), method.clone());
        }
        Some(method)
    }

    /// Looks up a method implementation with caching.
    ///
    /// This is the fast path for message dispatch.
    #[must_use]
    pub fn lookup_imp(&self, selector: &Selector) -> Option<Imp> {
        self.resolve(selector).map(|method| method.imp)
    }

    /// Returns `true` if instances respond to `selector`.
    #[must_use]
    pub fn responds_to(&self, selector: &Selector) -> bool {
        self.resolve(selector).is_some()
    }

    /// Checks if this class inherits from the given class. A class is
    /// considered to be a subclass of itself.
    #[must_use]
    pub fn is_subclass_of(&self, class: &Class) -> bool {
        let mut current = Some(self.clone());
        while let Some(candidate) = current {
            if candidate == *class {
                return true;
            }
            current = candidate.super_class();
        }
        false
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name())
            .field("meta", &self.is_metaclass())
            .field("super_class", &self.super_class().map(|s| s.inner.name.clone()))
            .finish_non_exhaustive()
    }
}

/// Looks up a registered class by name.
#[must_use]
pub fn class_from_name(name: &str) -> Option<Class> {
    REGISTRY.read().get(name).cloned()
}

/// Returns every registered class.
#[must_use]
pub fn all_classes() -> Vec<Class> {
    REGISTRY.read().values().cloned().collect()
}

/// Builder for classes created at runtime.
///
/// # Example
///
/// ```rust
/// use oxaspects_rt::{Method, Value, allocate_class};
///
/// let mut builder = allocate_class("DocBuiltClass", None);
/// builder.add_method(Method::from_fn("answer", "i@:", |_, _, _| Ok(Value::Int(42))).unwrap());
/// let class = builder.register().unwrap();
/// assert!(class.own_method(&"answer".parse().unwrap()).is_some());
/// ```
pub struct ClassBuilder {
    name: String,
    superclass: Option<Class>,
    methods: Vec<Method>,
    class_methods: Vec<Method>,
}

impl ClassBuilder {
    #[must_use]
    pub fn new(name: &str, superclass: Option<&Class>) -> Self {
        Self {
            name: name.to_string(),
            superclass: superclass.cloned(),
            methods: Vec::new(),
            class_methods: Vec::new(),
        }
    }

    /// Adds an instance method to the class.
    pub fn add_method(&mut self, method: Method) -> &mut Self {
        self.methods.push(method);
        self
    }

    /// Adds a class method to the class.
    pub fn add_class_method(&mut self, method: Method) -> &mut Self {
        self.class_methods.push(method);
        self
    }

    /// Creates the class and registers its methods.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassAlreadyExists`] or [`Error::InheritanceCycle`].
    pub fn register(self) -> Result<Class> {
        let class = match self.superclass {
            Some(ref superclass) => Class::new(&self.name, superclass)?,
            None => Class::new_root(&self.name)?,
        };

        for method in self.methods {
            class.add_method(method)?;
        }
        for method in self.class_methods {
            class.add_class_method(method)?;
        }

        Ok(class)
    }
}

/// Allocate a class dynamically. Shorthand for [`ClassBuilder::new`].
#[must_use]
pub fn allocate_class(name: &str, superclass: Option<&Class>) -> ClassBuilder {
    ClassBuilder::new(name, superclass)
}
