// Dispatch racing hook registration and removal

mod common;

use common::{counter, greeter};
use oxaspects::aspects::strategy;
use oxaspects::{AspectOptions, Block, ClassAspects, ObjectAspects};
use oxaspects_rt::{MessageArgs, Method, Object, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[test]
fn test_dispatch_while_hooks_change() {
    let class = greeter("ConcurrencyChurn", &counter());
    let obj = Object::new(&class).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let obj = obj.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let sel = common::sel("greet");
                while !done.load(Ordering::SeqCst) {
                    let reply = obj.send_message(&sel, &MessageArgs::none()).unwrap();
                    let text = reply.as_str().unwrap();
                    assert!(text == "hi" || text == "bye", "unexpected reply {text}");
                }
            })
        })
        .collect();

    for round in 0..200 {
        let id = format!("swap-{round}");
        class
            .hook_instance_method("greet", AspectOptions::INSTEAD, &id, common::replacing_block("bye"))
            .unwrap();
        class
            .hook_instance_method("greet", AspectOptions::BEFORE, "noise", common::counting_block(&counter()))
            .unwrap();
        assert!(class.remove_instance_hook("greet", &id));
        assert!(class.remove_instance_hook("greet", "noise"));
    }

    done.store(true, Ordering::SeqCst);
    for caller in callers {
        caller.join().unwrap();
    }

    assert!(class.instance_hook_identifiers("greet").is_empty());
    assert_eq!(common::greet(&obj), "hi");
}

#[test]
fn test_concurrent_instance_hooks() {
    let class = greeter("ConcurrencyInstances", &counter());

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let class = class.clone();
            thread::spawn(move || {
                let obj = Object::new(&class).unwrap();
                let reply = format!("obj-{i}");
                obj.hook_instance_method("greet", AspectOptions::INSTEAD, "mine", common::replacing_block(&reply))
                    .unwrap();
                for _ in 0..50 {
                    assert_eq!(common::greet(&obj), reply);
                }
                assert!(obj.remove_hook("greet", "mine"));
                assert_eq!(obj.class(), class);
                assert_eq!(common::greet(&obj), "hi");
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let fresh = Object::new(&class).unwrap();
    assert_eq!(common::greet(&fresh), "hi");
}

#[test]
fn test_one_shot_runs_once_under_contention() {
    let class = greeter("ConcurrencyOneShot", &counter());
    let obj = Object::new(&class).unwrap();
    let hits = counter();

    class
        .hook_instance_method(
            "greet",
            AspectOptions::BEFORE | AspectOptions::AUTOMATIC_REMOVAL,
            "once",
            common::counting_block(&hits),
        )
        .unwrap();

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let obj = obj.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    assert_eq!(
                        obj.send_message(&common::sel("greet"), &MessageArgs::none())
                            .unwrap(),
                        Value::from("hi")
                    );
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }

    // dispatches already in flight may have run it before removal landed
    assert!(common::count(&hits) >= 1);
    assert!(common::count(&hits) <= 4);
    assert!(class.instance_hook_identifiers("greet").is_empty());
}

#[test]
fn test_instance_hook_added_while_last_one_is_removed() {
    let class = greeter("ConcurrencyRetarget", &counter());
    class
        .add_method(Method::from_fn("wave", "i@:", |_, _, _| Ok(Value::Int(1))).unwrap())
        .unwrap();
    let wave = common::sel("wave");

    for _ in 0..500 {
        let obj = Object::new(&class).unwrap();
        obj.hook_instance_method("greet", AspectOptions::BEFORE, "a", common::counting_block(&counter()))
            .unwrap();

        let remover = {
            let obj = obj.clone();
            thread::spawn(move || assert!(obj.remove_hook("greet", "a")))
        };
        let block = Block::new("i@", |_, _| Ok(Value::Int(2))).unwrap();
        obj.hook_instance_method("wave", AspectOptions::INSTEAD, "b", block)
            .unwrap();
        remover.join().unwrap();

        assert_eq!(obj.hook_identifiers("wave"), vec!["b"]);
        assert!(strategy::is_synthesized(&obj.class()));
        assert_eq!(
            obj.send_message(&wave, &MessageArgs::none()).unwrap(),
            Value::Int(2)
        );

        assert!(obj.remove_hook("wave", "b"));
        assert_eq!(obj.class(), class);
    }
}

#[test]
fn test_class_hook_churn_under_instance_hook() {
    let base = greeter("ConcurrencyLayeredBase", &counter());
    let foreign = common::observing_subclass("ConcurrencyLayeredForeign", &base);
    let obj = Object::new(&base).unwrap();
    obj.set_class(&foreign);
    obj.hook_instance_method("greet", AspectOptions::INSTEAD, "swap", common::replacing_block("bye"))
        .unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let obj = obj.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    assert_eq!(common::greet(&obj), "bye");
                }
            })
        })
        .collect();

    for _ in 0..200 {
        foreign
            .hook_instance_method("greet", AspectOptions::BEFORE, "noise", common::counting_block(&counter()))
            .unwrap();
        assert!(foreign.remove_instance_hook("greet", "noise"));
    }

    done.store(true, Ordering::SeqCst);
    for caller in callers {
        caller.join().unwrap();
    }

    assert_eq!(common::greet(&obj), "bye");
    assert!(obj.remove_hook("greet", "swap"));
    assert_eq!(common::greet(&obj), "hi");
    assert!(foreign.own_method(&common::sel("greet")).is_none());
}
