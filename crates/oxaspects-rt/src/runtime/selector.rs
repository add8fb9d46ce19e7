//! `Selector` interning for the runtime.
//!
//! Each unique method name maps to exactly one interned selector, so
//! comparison is pointer equality and the hash is computed once.
//!
//! # Thread Safety
//!
//! The registry is a `RwLock`ed map. Lookups of already interned names only
//! take the read lock.

use crate::error::{Error, Result};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

struct InternedSelector {
    name: Box<str>,
    /// Precomputed FxHash of `name`
    hash: u64,
}

static REGISTRY: LazyLock<RwLock<FxHashMap<Box<str>, Selector>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// A unique, interned method name.
///
/// # Example
///
/// ```rust
/// use oxaspects_rt::Selector;
/// use std::str::FromStr;
///
/// let sel1 = Selector::from_str("setName:").unwrap();
/// let sel2 = Selector::from_str("setName:").unwrap();
///
/// assert_eq!(sel1, sel2);
/// assert_eq!(sel1.name(), "setName:");
/// ```
#[derive(Clone)]
pub struct Selector {
    inner: Arc<InternedSelector>,
}

impl FromStr for Selector {
    type Err = Error;

    /// Returns the selector for `name`, interning it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] for the empty name.
    fn from_str(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidSelector);
        }

        if let Some(sel) = REGISTRY.read().get(name) {
            return Ok(sel.clone());
        }

        let mut registry = REGISTRY.write();
        // Another thread may have interned it between the two locks.
        if let Some(sel) = registry.get(name) {
            return Ok(sel.clone());
        }

        let sel = Selector {
            inner: Arc::new(InternedSelector {
                name: name.into(),
                hash: fxhash::hash64(name),
            }),
        };
        registry.insert(name.into(), sel.clone());
        Ok(sel)
    }
}

impl Selector {
    /// Returns the selector's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the precomputed hash of the name.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.inner.hash
    }

    /// Number of arguments implied by the name (one per `:`).
    ///
    /// ```rust
    /// use oxaspects_rt::Selector;
    /// use std::str::FromStr;
    ///
    /// assert_eq!(Selector::from_str("insert:at:").unwrap().colon_count(), 2);
    /// ```
    #[must_use]
    pub fn colon_count(&self) -> usize {
        self.inner.name.matches(':').count()
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Selector {}

impl Hash for Selector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.hash);
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("name", &self.name())
            .field("hash", &format_args!("{:#x}", self.hash()))
            .finish()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
