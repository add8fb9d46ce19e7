//! Synthesized subclasses for instance-only hooks.
//!
//! Hooking one object must not change any other instance of its class. The
//! object is therefore retargeted to a private subclass of its class,
//! `_OxAspects_<Name>`, whose method table carries the instance trampolines.
//! The subclass overrides `class` to report the original class, so the
//! object's apparent type is unchanged.
//!
//! One subclass is synthesized per original class and reused for every
//! hooked instance of it. Subclasses are never unregistered: a retargeted
//! instance may still reference one.

use fxhash::FxHashMap;
use oxaspects_log::debug;
use oxaspects_rt::{Class, Method, Object, Value, allocate_class};
use parking_lot::Mutex;
use std::sync::LazyLock;

/// Name prefix of synthesized subclasses.
pub const SUBCLASS_PREFIX: &str = "_OxAspects_";

/// Original class -> synthesized subclass
static SUBCLASSES: LazyLock<Mutex<FxHashMap<Class, Class>>> =
    LazyLock::new(|| Mutex::new(FxHashMap::default()));

/// How an instance hook reaches its target class.
#[derive(Debug, Clone)]
pub(crate) struct InstanceTarget {
    /// Class whose table receives the instance trampoline
    pub(crate) hooked_class: Class,
    /// Class the object reports
    pub(crate) stated_class: Class,
    /// The object must carry `hooked_class` once the hook is registered.
    /// Set for synthesized subclasses even when the object already carries
    /// one, since a concurrent removal may restore it in the meantime.
    pub(crate) retarget: bool,
}

/// Returns `true` if `class` was synthesized by this module.
#[must_use]
pub fn is_synthesized(class: &Class) -> bool {
    class.name().starts_with(SUBCLASS_PREFIX)
        && class
            .super_class()
            .is_some_and(|original| SUBCLASSES.lock().get(&original) == Some(class))
}

/// Decides which class an instance hook on `object` patches.
pub(crate) fn instance_target(object: &Object) -> oxaspects_rt::Result<InstanceTarget> {
    let runtime = object.class();

    if is_synthesized(&runtime) {
        let stated = runtime.super_class().unwrap_or_else(|| runtime.clone());
        return Ok(InstanceTarget {
            hooked_class: runtime,
            stated_class: stated,
            retarget: true,
        });
    }

    let apparent = object.apparent_class();
    if apparent != runtime {
        // retargeted by someone else; hook their subclass in place
        debug!(
            "object {} already retargeted to {}, hooking it in place",
            object.id(),
            runtime.name()
        );
        return Ok(InstanceTarget {
            hooked_class: runtime,
            stated_class: apparent,
            retarget: false,
        });
    }

    Ok(InstanceTarget {
        hooked_class: subclass_for(&runtime)?,
        stated_class: runtime,
        retarget: true,
    })
}

/// Returns the synthesized subclass of `original`, creating it on first use.
///
/// # Errors
///
/// Returns the runtime error if the subclass cannot be registered, for
/// example because its name is already taken.
pub fn subclass_for(original: &Class) -> oxaspects_rt::Result<Class> {
    let mut subclasses = SUBCLASSES.lock();
    if let Some(subclass) = subclasses.get(original) {
        return Ok(subclass.clone());
    }

    let reported = original.clone();
    let mut builder = allocate_class(&format!("{SUBCLASS_PREFIX}{}", original.name()), Some(original));
    builder.add_method(Method::from_fn("class", "#@:", move |_, _, _| {
        Ok(Value::Class(reported.clone()))
    })?);
    let subclass = builder.register()?;

    debug!("synthesized {} for {}", subclass.name(), original.name());
    subclasses.insert(original.clone(), subclass.clone());
    Ok(subclass)
}

/// Points `object` at `subclass` unless it already is.
pub(crate) fn retarget(object: &Object, subclass: &Class) {
    if object.class() != *subclass {
        let previous = object.set_class(subclass);
        debug!(
            "retargeted object {} from {} to {}",
            object.id(),
            previous.name(),
            subclass.name()
        );
    }
}

/// Points `object` back at `original` if it still carries `subclass`.
pub(crate) fn restore(object: &Object, subclass: &Class, original: &Class) {
    if object.class() == *subclass {
        object.set_class(original);
        debug!("restored object {} to {}", object.id(), original.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subclass_cached_per_class() {
        let class = Class::new_root("StrategyTestCached").unwrap();
        let first = subclass_for(&class).unwrap();
        let second = subclass_for(&class).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name(), "_OxAspects_StrategyTestCached");
        assert_eq!(first.super_class(), Some(class));
        assert!(is_synthesized(&first));
    }

    #[test]
    fn test_subclass_reports_original_class() {
        let class = Class::new_root("StrategyTestReport").unwrap();
        let obj = Object::new(&class).unwrap();

        let target = instance_target(&obj).unwrap();
        assert!(target.retarget);
        assert_eq!(target.stated_class, class);

        retarget(&obj, &target.hooked_class);
        assert_eq!(obj.class(), target.hooked_class);
        assert_eq!(obj.apparent_class(), class);

        restore(&obj, &target.hooked_class, &class);
        assert_eq!(obj.class(), class);
    }

    #[test]
    fn test_retargeted_object_keeps_its_subclass() {
        let class = Class::new_root("StrategyTestTwice").unwrap();
        let obj = Object::new(&class).unwrap();
        let subclass = subclass_for(&class).unwrap();
        obj.set_class(&subclass);

        let target = instance_target(&obj).unwrap();
        assert!(target.retarget);
        assert_eq!(target.hooked_class, subclass);
        assert_eq!(target.stated_class, class);

        retarget(&obj, &target.hooked_class);
        assert_eq!(obj.class(), subclass);
    }

    #[test]
    fn test_retarget_after_concurrent_restore() {
        let class = Class::new_root("StrategyTestRestored").unwrap();
        let obj = Object::new(&class).unwrap();
        let subclass = subclass_for(&class).unwrap();
        obj.set_class(&subclass);

        let target = instance_target(&obj).unwrap();
        // the last hook went away between resolving and registering
        restore(&obj, &subclass, &class);
        assert_eq!(obj.class(), class);

        assert!(target.retarget);
        retarget(&obj, &target.hooked_class);
        assert_eq!(obj.class(), subclass);
    }

    #[test]
    fn test_foreign_subclass_hooked_in_place() {
        let class = Class::new_root("StrategyTestForeign").unwrap();
        let reported = class.clone();
        let mut builder = allocate_class("ForeignNotifying_StrategyTestForeign", Some(&class));
        builder.add_method(
            Method::from_fn("class", "#@:", move |_, _, _| Ok(Value::Class(reported.clone())))
                .unwrap(),
        );
        let foreign = builder.register().unwrap();

        let obj = Object::new(&class).unwrap();
        obj.set_class(&foreign);

        let target = instance_target(&obj).unwrap();
        assert!(!target.retarget);
        assert_eq!(target.hooked_class, foreign);
        assert_eq!(target.stated_class, class);
        assert!(!is_synthesized(&foreign));
    }

    #[test]
    fn test_name_collision_is_an_error() {
        let class = Class::new_root("StrategyTestTaken").unwrap();
        Class::new_root("_OxAspects_StrategyTestTaken").unwrap();

        assert!(subclass_for(&class).is_err());
    }
}
