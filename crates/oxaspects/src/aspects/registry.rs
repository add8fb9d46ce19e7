//! The process-wide hook registry.
//!
//! Maps every hooked (class, selector) and (object, selector) pair to its
//! container, and tracks which synthesized-subclass table entries carry an
//! instance trampoline. Created lazily on first use and never torn down;
//! entries disappear when their last record is removed.
//!
//! A class hook and an instance slot may stack on the same table entry, for
//! example on a foreign subclass. Each layer remembers the trampoline it
//! installed; taking a layer out either restores the entry, if the layer is
//! on top, or re-points the layer above it at what it had replaced.
//!
//! Lock order is registry first, then a container's chain lock or an
//! original cell. None of them is held while advice or an original
//! implementation runs.

use crate::aspects::container::{HookContainer, HookKey, Original, OriginalCell};
use crate::aspects::info::AspectInfo;
use crate::aspects::strategy;
use crate::error::Result;
use fxhash::FxHashMap;
use oxaspects_log::{debug, warn};
use oxaspects_rt::{Class, Imp, Method, Object, Selector};
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock};

struct ClassHook {
    container: Arc<HookContainer>,
    /// What was written to the table entry
    trampoline: Imp,
}

struct InstanceHook {
    /// Kept alive until its last instance hook is removed
    object: Object,
    container: Arc<HookContainer>,
}

/// A table entry holding an instance trampoline.
struct InstanceSlot {
    /// Objects with a container for this selector
    holders: usize,
    /// What the trampoline runs for receivers without a container; shared
    /// with every instance container of the slot
    fallback: OriginalCell,
    trampoline: Imp,
}

#[derive(Default)]
struct HookRegistry {
    class_hooks: FxHashMap<HookKey, ClassHook>,
    instance_hooks: FxHashMap<HookKey, InstanceHook>,
    instance_slots: FxHashMap<HookKey, InstanceSlot>,
}

static REGISTRY: LazyLock<RwLock<HookRegistry>> =
    LazyLock::new(|| RwLock::new(HookRegistry::default()));

/// Pre-hook implementation of `selector` in `class`'s own table.
fn original_of(class: &Class, selector: &Selector) -> Original {
    match class.implementation(selector) {
        Some(imp) => Original::Own(imp),
        None => Original::Super(class.clone()),
    }
}

/// Points `class`'s entry for `method` at `trampoline`.
fn install(class: &Class, method: &Method, original: &Original, trampoline: Imp) -> Result<()> {
    match original {
        Original::Own(_) => {
            class.set_implementation(&method.selector, trampoline)?;
        }
        Original::Super(_) => class.add_method(Method {
            selector: method.selector.clone(),
            imp: trampoline,
            types: method.types.clone(),
        })?,
    }
    Ok(())
}

/// Undoes [`install`] for the layer on top of the entry.
fn restore(class: &Class, selector: &Selector, original: &Original) {
    match original {
        Original::Own(imp) => {
            if let Err(err) = class.set_implementation(selector, imp.clone()) {
                warn!(
                    "could not restore {} on {}: {}",
                    selector,
                    class.name(),
                    err
                );
            }
        }
        Original::Super(_) => {
            class.remove_method(selector);
        }
    }
}

fn class_trampoline(container: &Arc<HookContainer>) -> Imp {
    let container = Arc::clone(container);
    Imp::new(move |receiver, _, args| container.invoke(receiver, args))
}

fn instance_trampoline(fallback: OriginalCell) -> Imp {
    Imp::new(move |receiver, selector, args| {
        let key = HookKey::Instance(receiver.id(), selector.clone());
        let container = REGISTRY
            .read()
            .instance_hooks
            .get(&key)
            .map(|hook| Arc::clone(&hook.container));

        match container {
            Some(container) => container.invoke(receiver, args),
            None => {
                let original = fallback.read().clone();
                original.call(receiver, selector, args)
            }
        }
    })
}

/// Adds a record to the class-wide container of `method` on `hooked`,
/// creating the container and installing its trampoline on first use.
pub(crate) fn add_class_hook(
    hooked: &Class,
    stated: &Class,
    method: &Method,
    info: AspectInfo,
    relaxed: bool,
) -> Result<()> {
    let key = HookKey::Class(hooked.clone(), method.selector.clone());
    let mut registry = REGISTRY.write();

    if let Some(hook) = registry.class_hooks.get(&key) {
        return hook.container.add_info(info, relaxed);
    }

    let original = original_of(hooked, &method.selector);
    let container = Arc::new(HookContainer::new(
        key.clone(),
        method.types.clone(),
        hooked.clone(),
        stated.clone(),
        Arc::new(RwLock::new(original.clone())),
    ));
    container.add_info(info, relaxed)?;

    let trampoline = class_trampoline(&container);
    install(hooked, method, &original, trampoline.clone())?;
    debug!(
        "installed trampoline for {} on {}{}",
        method.selector,
        hooked.name(),
        if hooked.is_metaclass() { " (class method)" } else { "" }
    );

    registry.class_hooks.insert(
        key,
        ClassHook {
            container,
            trampoline,
        },
    );
    Ok(())
}

/// Adds a record to `object`'s own container for `method`, retargeting the
/// object on its first instance hook.
pub(crate) fn add_instance_hook(
    object: &Object,
    method: &Method,
    info: AspectInfo,
    relaxed: bool,
) -> Result<()> {
    // Resolved before locking: asking an object for its class is a message
    // send. The object's tag is only trusted again under the lock, see below.
    let target = strategy::instance_target(object)?;

    let key = HookKey::Instance(object.id(), method.selector.clone());
    let mut registry = REGISTRY.write();

    if let Some(hook) = registry.instance_hooks.get(&key) {
        return hook.container.add_info(info, relaxed);
    }

    let slot_key = HookKey::Class(target.hooked_class.clone(), method.selector.clone());
    let fallback = match registry.instance_slots.get(&slot_key) {
        Some(slot) => Arc::clone(&slot.fallback),
        None => Arc::new(RwLock::new(original_of(
            &target.hooked_class,
            &method.selector,
        ))),
    };

    let container = Arc::new(HookContainer::new(
        key.clone(),
        method.types.clone(),
        target.hooked_class.clone(),
        target.stated_class.clone(),
        Arc::clone(&fallback),
    ));
    container.add_info(info, relaxed)?;

    if !registry.instance_slots.contains_key(&slot_key) {
        let trampoline = instance_trampoline(Arc::clone(&fallback));
        let original = fallback.read().clone();
        install(&target.hooked_class, method, &original, trampoline.clone())?;
        debug!(
            "installed instance trampoline for {} on {}",
            method.selector,
            target.hooked_class.name()
        );
        registry.instance_slots.insert(
            slot_key.clone(),
            InstanceSlot {
                holders: 0,
                fallback,
                trampoline,
            },
        );
    }
    if let Some(slot) = registry.instance_slots.get_mut(&slot_key) {
        slot.holders += 1;
    }

    // A concurrent removal may have restored the object since the target
    // was resolved; retargeting is a no-op when it still carries the subclass.
    if target.retarget {
        strategy::retarget(object, &target.hooked_class);
    }

    registry.instance_hooks.insert(
        key,
        InstanceHook {
            object: object.clone(),
            container,
        },
    );
    Ok(())
}

/// Removes the record `identifier` from the container registered under
/// `key`.
pub(crate) fn remove(key: &HookKey, identifier: &str) -> bool {
    REGISTRY.write().remove_locked(key, identifier, None)
}

/// Removes a record from `container`, provided it is still the container
/// registered under its key.
pub(crate) fn remove_record(container: &Arc<HookContainer>, identifier: &str) -> bool {
    REGISTRY
        .write()
        .remove_locked(container.key(), identifier, Some(container))
}

/// Identifiers registered under `key`, in chain order.
pub(crate) fn identifiers(key: &HookKey) -> Vec<String> {
    let registry = REGISTRY.read();
    let identifiers = match key {
        HookKey::Class(..) => registry
            .class_hooks
            .get(key)
            .map(|hook| hook.container.identifiers()),
        HookKey::Instance(..) => registry
            .instance_hooks
            .get(key)
            .map(|hook| hook.container.identifiers()),
    };
    identifiers.unwrap_or_default()
}

impl HookRegistry {
    fn remove_locked(
        &mut self,
        key: &HookKey,
        identifier: &str,
        expected: Option<&Arc<HookContainer>>,
    ) -> bool {
        let container = match key {
            HookKey::Class(..) => self.class_hooks.get(key).map(|hook| &hook.container),
            HookKey::Instance(..) => self.instance_hooks.get(key).map(|hook| &hook.container),
        };
        let Some(container) = container else {
            return false;
        };
        if expected.is_some_and(|expected| !Arc::ptr_eq(expected, container)) {
            return false;
        }
        if !container.remove_info(identifier) {
            return false;
        }
        if container.is_empty() {
            self.tear_down(key);
        }
        true
    }

    fn tear_down(&mut self, key: &HookKey) {
        match key {
            HookKey::Class(class, selector) => {
                if let Some(hook) = self.class_hooks.remove(key) {
                    self.unlink(key, &hook.trampoline, &hook.container.original());
                    debug!("removed trampoline for {} on {}", selector, class.name());
                }
            }
            HookKey::Instance(id, selector) => {
                let Some(hook) = self.instance_hooks.remove(key) else {
                    return;
                };
                let hooked = hook.container.hooked_class();
                self.release_slot(hooked, selector);

                let still_hooked = self
                    .instance_hooks
                    .keys()
                    .any(|other| matches!(other, HookKey::Instance(other_id, _) if other_id == id));
                if !still_hooked && strategy::is_synthesized(hooked) {
                    strategy::restore(&hook.object, hooked, hook.container.stated_class());
                }
            }
        }
    }

    fn release_slot(&mut self, hooked: &Class, selector: &Selector) {
        let slot_key = HookKey::Class(hooked.clone(), selector.clone());
        let Some(slot) = self.instance_slots.get_mut(&slot_key) else {
            return;
        };
        slot.holders = slot.holders.saturating_sub(1);
        if slot.holders == 0 {
            if let Some(slot) = self.instance_slots.remove(&slot_key) {
                let original = slot.fallback.read().clone();
                self.unlink(&slot_key, &slot.trampoline, &original);
                debug!(
                    "removed instance trampoline for {} on {}",
                    selector,
                    hooked.name()
                );
            }
        }
    }

    /// Takes the layer that wrote `installed` out of the table entry named by
    /// `key`. The layer itself must already be gone from the registry.
    fn unlink(&self, key: &HookKey, installed: &Imp, original: &Original) {
        let HookKey::Class(class, selector) = key else {
            return;
        };

        let current = class.implementation(selector);
        if current.is_some_and(|imp| Imp::ptr_eq(&imp, installed)) {
            restore(class, selector, original);
            return;
        }

        // another layer was installed on top and forwards to ours
        let above = self
            .class_hooks
            .get(key)
            .map(|hook| hook.container.original_cell())
            .into_iter()
            .chain(self.instance_slots.get(key).map(|slot| &slot.fallback));
        for cell in above {
            let mut forward = cell.write();
            if matches!(&*forward, Original::Own(imp) if Imp::ptr_eq(imp, installed)) {
                *forward = original.clone();
                debug!(
                    "re-pointed layer above {} on {} past the removed trampoline",
                    selector,
                    class.name()
                );
                return;
            }
        }

        warn!(
            "{} on {} was replaced outside the hook registry; leaving it",
            selector,
            class.name()
        );
    }
}
