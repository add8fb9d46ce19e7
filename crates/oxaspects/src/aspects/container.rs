//! Hook containers: one per hooked method per class or per object.
//!
//! A container owns the advice chains of one hooked method and knows how to
//! reach the implementation that was in place before the hook. Its
//! [`HookContainer::invoke`] is the body of every trampoline.
//!
//! The original lives in a shared cell. Instance containers share the cell of
//! their table slot, and a cell is re-pointed when the trampoline it forwards
//! to is taken out from underneath it.
//!
//! Chains are guarded by the container's own mutex. A dispatch clones the
//! chains once on entry and runs from that snapshot with no lock held, so
//! advice may hook, unhook or re-enter the hooked method freely. A record
//! removed after the snapshot was taken may still run once in a dispatch that
//! is already in flight.

use crate::aspects::context::InvocationContext;
use crate::aspects::info::AspectInfo;
use crate::aspects::options::Position;
use crate::aspects::registry;
use crate::error::{AspectError, Result};
use oxaspects_log::{debug, trace};
use oxaspects_rt::runtime::dispatch;
use oxaspects_rt::{Class, Imp, Object, Selector, Signature, Value};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Where a container finds the pre-hook implementation.
#[derive(Debug, Clone)]
pub(crate) enum Original {
    /// The hooked class's own implementation, replaced by the trampoline.
    Own(Imp),
    /// The hooked class had no own implementation; resolve the method on the
    /// superclass of this class at call time.
    Super(Class),
}

impl Original {
    pub(crate) fn call(
        &self,
        receiver: &Object,
        selector: &Selector,
        args: &[Value],
    ) -> oxaspects_rt::Result<Value> {
        match self {
            Original::Own(imp) => dispatch::invoke(imp, receiver, selector, args),
            Original::Super(class) => {
                let imp = class
                    .super_class()
                    .and_then(|super_class| super_class.lookup_imp(selector))
                    .ok_or_else(|| oxaspects_rt::Error::NoOriginalImplementation {
                        selector: selector.name().to_string(),
                    })?;
                dispatch::invoke(&imp, receiver, selector, args)
            }
        }
    }
}

/// Shared, re-pointable [`Original`].
pub(crate) type OriginalCell = Arc<RwLock<Original>>;

/// Registry key of a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum HookKey {
    /// Hook on a class (or metaclass) table
    Class(Class, Selector),
    /// Hook on one object, by object id
    Instance(u64, Selector),
}

#[derive(Clone, Default)]
struct Chains {
    before: Vec<Arc<AspectInfo>>,
    instead: Option<Arc<AspectInfo>>,
    after: Vec<Arc<AspectInfo>>,
}

impl Chains {
    fn iter(&self) -> impl Iterator<Item = &Arc<AspectInfo>> {
        self.before
            .iter()
            .chain(self.instead.iter())
            .chain(self.after.iter())
    }

    fn len(&self) -> usize {
        self.before.len() + usize::from(self.instead.is_some()) + self.after.len()
    }
}

pub(crate) struct HookContainer {
    key: HookKey,
    selector: Selector,
    signature: Signature,
    hooked_class: Class,
    stated_class: Class,
    original: OriginalCell,
    chains: Mutex<Chains>,
}

impl HookContainer {
    pub(crate) fn new(
        key: HookKey,
        signature: Signature,
        hooked_class: Class,
        stated_class: Class,
        original: OriginalCell,
    ) -> Self {
        let selector = match &key {
            HookKey::Class(_, selector) | HookKey::Instance(_, selector) => selector.clone(),
        };
        HookContainer {
            key,
            selector,
            signature,
            hooked_class,
            stated_class,
            original,
            chains: Mutex::new(Chains::default()),
        }
    }

    pub(crate) fn key(&self) -> &HookKey {
        &self.key
    }

    pub(crate) fn selector(&self) -> &Selector {
        &self.selector
    }

    pub(crate) fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The class whose table holds the trampoline.
    pub(crate) fn hooked_class(&self) -> &Class {
        &self.hooked_class
    }

    /// The class the caller asked to hook.
    pub(crate) fn stated_class(&self) -> &Class {
        &self.stated_class
    }

    pub(crate) fn is_instance_hook(&self) -> bool {
        matches!(self.key, HookKey::Instance(..))
    }

    /// Snapshot of the current original.
    pub(crate) fn original(&self) -> Original {
        self.original.read().clone()
    }

    pub(crate) fn original_cell(&self) -> &OriginalCell {
        &self.original
    }

    /// Validates and appends a record.
    ///
    /// Nothing changes unless `Ok` is returned.
    pub(crate) fn add_info(&self, info: AspectInfo, relaxed: bool) -> Result<()> {
        info.block()
            .check_signature(&self.signature, info.position(), relaxed)?;

        let mut chains = self.chains.lock();
        if chains
            .iter()
            .any(|existing| existing.identifier() == info.identifier())
        {
            return Err(AspectError::IdentifierExists {
                identifier: info.identifier().to_string(),
            });
        }

        match info.position() {
            Position::Before => chains.before.push(Arc::new(info)),
            Position::After => chains.after.push(Arc::new(info)),
            Position::Instead => {
                if let Some(existing) = &chains.instead {
                    return Err(AspectError::InsteadSlotOccupied {
                        existing: existing.identifier().to_string(),
                    });
                }
                chains.instead = Some(Arc::new(info));
            }
        }
        Ok(())
    }

    /// Removes the record with `identifier` from whichever chain holds it.
    pub(crate) fn remove_info(&self, identifier: &str) -> bool {
        let mut chains = self.chains.lock();

        if let Some(index) = chains
            .before
            .iter()
            .position(|info| info.identifier() == identifier)
        {
            chains.before.remove(index);
            return true;
        }
        if chains
            .instead
            .as_ref()
            .is_some_and(|info| info.identifier() == identifier)
        {
            chains.instead = None;
            return true;
        }
        if let Some(index) = chains
            .after
            .iter()
            .position(|info| info.identifier() == identifier)
        {
            chains.after.remove(index);
            return true;
        }
        false
    }

    /// Identifiers in before, instead, after order.
    pub(crate) fn identifiers(&self) -> Vec<String> {
        self.chains
            .lock()
            .iter()
            .map(|info| info.identifier().to_string())
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.chains.lock().len() == 0
    }

    /// Runs the chains around the original implementation.
    ///
    /// Faults raised by advice or by the original abort the remaining steps
    /// and are returned unchanged.
    pub(crate) fn invoke(
        self: &Arc<Self>,
        receiver: &Object,
        args: &[Value],
    ) -> oxaspects_rt::Result<Value> {
        let chains = self.chains.lock().clone();
        trace!(
            "trampoline {} on object {}: {} before, {} instead, {} after",
            self.selector,
            receiver.id(),
            chains.before.len(),
            usize::from(chains.instead.is_some()),
            chains.after.len()
        );

        let context = InvocationContext::new(Arc::clone(self), receiver.clone(), args.to_vec());

        for info in &chains.before {
            self.run(info, &context)?;
        }

        let ret = match &chains.instead {
            Some(info) => {
                let ret = self.run(info, &context)?;
                if self.signature.returns_void() {
                    Value::Void
                } else {
                    ret
                }
            }
            None => context.invoke_original()?,
        };

        context.set_return_value(ret.clone());
        for info in &chains.after {
            self.run(info, &context)?;
        }

        Ok(ret)
    }

    fn run(
        self: &Arc<Self>,
        info: &AspectInfo,
        context: &InvocationContext,
    ) -> oxaspects_rt::Result<Value> {
        #[cfg(feature = "trace-chains")]
        trace!(
            "running {} advice '{}' for {}",
            info.position(),
            info.identifier(),
            self.selector
        );

        let result = info.block().call(context, context.arguments());
        if info.automatic_removal() && registry::remove_record(self, info.identifier()) {
            debug!(
                "one-shot advice '{}' removed from {}",
                info.identifier(),
                self.selector
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspects::block::Block;
    use std::str::FromStr;

    fn container(name: &str, encoding: &str) -> HookContainer {
        let class = Class::new_root(name).unwrap();
        let sel = Selector::from_str("work").unwrap();
        HookContainer::new(
            HookKey::Class(class.clone(), sel),
            Signature::parse(encoding).unwrap(),
            class.clone(),
            class.clone(),
            Arc::new(RwLock::new(Original::Super(class))),
        )
    }

    fn info(identifier: &str, position: Position) -> AspectInfo {
        let encoding = if position == Position::Instead { "i@" } else { "v@" };
        let block = Block::new(encoding, |_, _| Ok(Value::Int(0))).unwrap();
        AspectInfo::new(identifier, position, false, block)
    }

    #[test]
    fn test_identifiers_in_chain_order() {
        let c = container("ContainerTestOrder", "i@:");
        c.add_info(info("after-1", Position::After), false).unwrap();
        c.add_info(info("before-1", Position::Before), false).unwrap();
        c.add_info(info("instead", Position::Instead), false).unwrap();
        c.add_info(info("before-2", Position::Before), false).unwrap();
        c.add_info(info("after-2", Position::After), false).unwrap();

        assert_eq!(
            c.identifiers(),
            vec!["before-1", "before-2", "instead", "after-1", "after-2"]
        );
    }

    #[test]
    fn test_duplicate_identifier_rejected_across_chains() {
        let c = container("ContainerTestDuplicate", "i@:");
        c.add_info(info("same", Position::Before), false).unwrap();

        assert_eq!(
            c.add_info(info("same", Position::After), false),
            Err(AspectError::IdentifierExists {
                identifier: "same".into()
            })
        );
        assert_eq!(c.identifiers(), vec!["same"]);
    }

    #[test]
    fn test_instead_slot_single_occupant() {
        let c = container("ContainerTestInstead", "i@:");
        c.add_info(info("first", Position::Instead), false).unwrap();

        assert_eq!(
            c.add_info(info("second", Position::Instead), false),
            Err(AspectError::InsteadSlotOccupied {
                existing: "first".into()
            })
        );
        assert_eq!(c.identifiers(), vec!["first"]);
    }

    #[test]
    fn test_signature_mismatch_leaves_chains_untouched() {
        let c = container("ContainerTestMismatch", "v@:i");
        let block = Block::new("v@d", |_, _| Ok(Value::Void)).unwrap();

        let result = c.add_info(AspectInfo::new("bad", Position::Before, false, block), false);
        assert!(matches!(result, Err(AspectError::BlockSignatureMismatch { .. })));
        assert!(c.is_empty());
    }

    #[test]
    fn test_remove_info() {
        let c = container("ContainerTestRemove", "i@:");
        c.add_info(info("a", Position::Before), false).unwrap();
        c.add_info(info("b", Position::Instead), false).unwrap();
        c.add_info(info("c", Position::After), false).unwrap();

        assert!(c.remove_info("b"));
        assert!(!c.remove_info("b"));
        assert_eq!(c.identifiers(), vec!["a", "c"]);

        assert!(c.remove_info("a"));
        assert!(c.remove_info("c"));
        assert!(c.is_empty());
    }

    #[test]
    fn test_missing_original_reported() {
        let c = container("ContainerTestNoOriginal", "i@:");
        let receiver = Object::new(c.hooked_class()).unwrap();

        let err = c
            .original()
            .call(&receiver, c.selector(), &[])
            .unwrap_err();
        assert_eq!(
            err,
            oxaspects_rt::Error::NoOriginalImplementation {
                selector: "work".into()
            }
        );
    }
}
