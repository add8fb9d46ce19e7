// Common test utilities for runtime integration tests
//
// Class names are global, so every fixture takes a unique name from its
// caller.

#![allow(dead_code)]

use oxaspects_rt::{Class, Method, Selector, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Creates a root class with the given name
pub fn create_test_class(name: &str) -> Class {
    Class::new_root(name).expect("Failed to create test class")
}

/// Creates a test selector from a string
pub fn sel(name: &str) -> Selector {
    Selector::from_str(name).expect("Failed to create test selector")
}

/// Creates an `i@:` method returning a constant
pub fn int_method(name: &str, value: i32) -> Method {
    Method::from_fn(name, "i@:", move |_, _, _| Ok(Value::Int(value)))
        .expect("Failed to create test method")
}

/// Creates a `v@:` method bumping `counter` on every call
pub fn counting_method(name: &str, counter: Arc<AtomicUsize>) -> Method {
    Method::from_fn(name, "v@:", move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Void)
    })
    .expect("Failed to create test method")
}

/// A fresh shared counter
pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}
