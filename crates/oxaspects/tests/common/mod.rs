// Shared fixtures for engine integration tests
//
// Class names are process-wide, so every test passes its own name.

#![allow(dead_code)]

use oxaspects::Block;
use oxaspects_rt::{Class, MessageArgs, Method, Object, Selector, Value, allocate_class};
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fresh shared counter
pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// A shared call log
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn sel(name: &str) -> Selector {
    Selector::from_str(name).expect("Failed to create test selector")
}

/// Class `name` with `greet -> "hi"`; the original bumps `calls`
pub fn greeter(name: &str, calls: &Arc<AtomicUsize>) -> Class {
    let class = Class::new_root(name).expect("Failed to create test class");
    let calls = Arc::clone(calls);
    class
        .add_method(
            Method::from_fn("greet", "*@:", move |_, _, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::from("hi"))
            })
            .expect("Failed to create greet"),
        )
        .expect("Failed to add greet");
    class
}

/// Class `name` with `greet -> "hi"` recording `"original"` in `log`
pub fn traced_greeter(name: &str, log: &Trace) -> Class {
    let class = Class::new_root(name).expect("Failed to create test class");
    let log = Arc::clone(log);
    class
        .add_method(
            Method::from_fn("greet", "*@:", move |_, _, _| {
                log.lock().push("original".into());
                Ok(Value::from("hi"))
            })
            .expect("Failed to create greet"),
        )
        .expect("Failed to add greet");
    class
}

/// `greet` sent to `obj`, unwrapped to its string
pub fn greet(obj: &Object) -> String {
    obj.send_message(&sel("greet"), &MessageArgs::none())
        .expect("greet failed")
        .as_str()
        .expect("greet returned a non-string")
        .to_string()
}

/// `v@` block bumping `counter`
pub fn counting_block(counter: &Arc<AtomicUsize>) -> Block {
    let counter = Arc::clone(counter);
    Block::new("v@", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Void)
    })
    .expect("Failed to create block")
}

/// `v@` block recording `entry` in `log`
pub fn tracing_block(log: &Trace, entry: &str) -> Block {
    let log = Arc::clone(log);
    let entry = entry.to_string();
    Block::new("v@", move |_, _| {
        log.lock().push(entry.clone());
        Ok(Value::Void)
    })
    .expect("Failed to create block")
}

/// `*@` block returning `value` without calling the original
pub fn replacing_block(value: &str) -> Block {
    let value = value.to_string();
    Block::new("*@", move |_, _| Ok(Value::from(value.as_str()))).expect("Failed to create block")
}

/// Subclass `name` of `base` that reports `base` as its class, the way a
/// key-value observing runtime retargets objects
pub fn observing_subclass(name: &str, base: &Class) -> Class {
    let reported = base.clone();
    let mut builder = allocate_class(name, Some(base));
    builder.add_method(
        Method::from_fn("class", "#@:", move |_, _, _| Ok(Value::Class(reported.clone())))
            .expect("Failed to create class override"),
    );
    builder.register().expect("Failed to register subclass")
}
