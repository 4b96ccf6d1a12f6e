use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};
use vireo_core::{ComponentDefinition, ComponentOptions, Instance, Scope, config};
use vireo_dom::{Listener, Normalization, VNode, VNodeData};

type Log = Rc<RefCell<Vec<String>>>;

fn bare() -> Instance {
    config::reset();
    config::set_silent(true);
    Instance::new(&ComponentDefinition::base(), ComponentOptions::new())
}

fn recorder(log: &Log, label: &'static str) -> Listener {
    let log = Rc::clone(log);
    Listener::new(move |args: &[Value]| {
        let args: Vec<String> = args.iter().map(Value::to_string).collect();
        log.borrow_mut().push(format!("{label}({})", args.join(",")));
    })
}

#[test]
fn emit_calls_listeners_in_registration_order() {
    let vm = bare();
    let log: Log = Rc::default();
    vm.on("save", recorder(&log, "a")).on("save", recorder(&log, "b"));
    vm.emit("save", &[json!(1), json!("x")]);
    assert_eq!(*log.borrow(), vec!["a(1,\"x\")", "b(1,\"x\")"]);
    assert!(vm.has_listeners("save"));
    assert!(!vm.has_listeners("load"));
}

#[test]
fn once_listeners_fire_a_single_time() {
    let vm = bare();
    let log: Log = Rc::default();
    vm.once("ready", recorder(&log, "once"));
    vm.emit("ready", &[]);
    vm.emit("ready", &[]);
    assert_eq!(*log.borrow(), vec!["once()"]);
    assert!(!vm.has_listeners("ready"));
}

#[test]
fn once_listeners_can_be_removed_by_the_original_listener() {
    let vm = bare();
    let log: Log = Rc::default();
    let listener = recorder(&log, "once");
    vm.once("ready", listener.clone());
    vm.off(Some("ready"), Some(&listener));
    vm.emit("ready", &[]);
    assert!(log.borrow().is_empty());
}

#[test]
fn off_removes_by_listener_event_or_all() {
    let vm = bare();
    let log: Log = Rc::default();
    let a = recorder(&log, "a");
    vm.on("x", a.clone()).on("x", recorder(&log, "b")).on("y", recorder(&log, "c"));

    vm.off(Some("x"), Some(&a));
    vm.emit("x", &[]);
    assert_eq!(*log.borrow(), vec!["b()"]);

    vm.off(Some("x"), None);
    vm.emit("x", &[]);
    vm.emit("y", &[]);
    assert_eq!(*log.borrow(), vec!["b()", "c()"]);

    vm.off(None, None);
    vm.emit("y", &[]);
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn handlers_may_unregister_during_emit() {
    let vm = bare();
    let log: Log = Rc::default();
    let weak = vm.downgrade();
    let sink = Rc::clone(&log);
    vm.on(
        "tick",
        Listener::new(move |_| {
            sink.borrow_mut().push("first".into());
            if let Some(vm) = weak.upgrade() {
                vm.off(Some("tick"), None);
            }
        }),
    );
    vm.on("tick", recorder(&log, "second"));
    vm.emit("tick", &[]);
    vm.emit("tick", &[]);
    assert_eq!(*log.borrow(), vec!["first", "second()"]);
}

#[test]
fn placeholder_listeners_reach_the_parent_method() {
    config::reset();
    config::set_silent(true);
    let base = ComponentDefinition::base();
    let picker = base.extend(ComponentOptions::new().name("picker"));
    let page = base.extend(
        ComponentOptions::new()
            .component("picker", picker)
            .data(|_| Ok(json!({ "picked": null, "closed": 0 })))
            .method("onPick", |vm, args| {
                vm.set("picked", args.first().cloned().unwrap_or_default());
                Ok(Value::Null)
            })
            .method("close", |vm, _args| {
                let closed = vm.get("closed").and_then(|v| v.as_i64()).unwrap_or(0);
                vm.set("closed", json!(closed + 1));
                Ok(Value::Null)
            })
            .render(|vm: &Instance| {
                let scope = Scope::root();
                vm.c(
                    "picker",
                    VNodeData::new()
                        .on("pick", vm.listener(&scope, "onPick($event)"))
                        .on("~close", vm.listener(&scope, "close")),
                    vec![],
                    Normalization::None,
                )
            }),
    );
    let vm = Instance::new(&page, ComponentOptions::new());
    let VNode::Component(placeholder) = vm.render() else {
        panic!("expected a component placeholder");
    };
    let child = vm.create_child(&placeholder).expect("child");
    assert!(child.listeners().contains_key("pick"));

    child.emit("pick", &[json!({ "id": 7 })]);
    assert_eq!(vm.get("picked"), Some(json!({ "id": 7 })));

    child.emit("close", &[]);
    child.emit("close", &[]);
    assert_eq!(vm.get("closed"), Some(json!(1)));
}
