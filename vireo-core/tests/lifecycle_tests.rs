use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use vireo_core::{ComponentDefinition, ComponentOptions, Instance, LifecycleHook, Scope, config};
use vireo_dom::{Child, Listener, Normalization, Rendered, VNode, VNodeData, text};

type Log = Rc<RefCell<Vec<String>>>;

fn collect_warnings() -> Log {
    config::reset();
    let seen: Log = Rc::default();
    let sink = Rc::clone(&seen);
    config::set_warn_handler(move |msg, _trace| sink.borrow_mut().push(msg.to_string()));
    seen
}

fn record(log: &Log, hook: LifecycleHook) -> impl Fn(&Instance) -> anyhow::Result<()> + 'static {
    let log = Rc::clone(log);
    move |_vm: &Instance| {
        log.borrow_mut().push(hook.to_string());
        Ok(())
    }
}

fn greeting(vm: &Instance) -> Rendered {
    let scope = Scope::root();
    vm.root(Child::from(vm.c(
        "p",
        VNodeData::new(),
        vec![Child::from(vm.to_display(&vm.resolve_in(&scope, "msg")))],
        Normalization::None,
    )))
}

#[test]
fn init_runs_hooks_around_state() {
    let _warnings = collect_warnings();
    let log: Log = Rc::default();
    let seen_before = Rc::clone(&log);
    let seen_after = Rc::clone(&log);
    let def = ComponentDefinition::base().extend(
        ComponentOptions::new()
            .data(|_| Ok(json!({ "msg": "hello" })))
            .hook(LifecycleHook::BeforeCreate, move |vm: &Instance| {
                // state is not initialized yet
                seen_before
                    .borrow_mut()
                    .push(format!("beforeCreate:{}", vm.data().contains_key("msg")));
                Ok(())
            })
            .hook(LifecycleHook::Created, move |vm: &Instance| {
                seen_after
                    .borrow_mut()
                    .push(format!("created:{}", vm.get("msg").unwrap_or_default()));
                Ok(())
            })
            .hook(LifecycleHook::BeforeMount, record(&log, LifecycleHook::BeforeMount))
            .hook(LifecycleHook::Mounted, record(&log, LifecycleHook::Mounted))
            .render(greeting),
    );

    let vm = Instance::new(&def, ComponentOptions::new().el("#app"));

    assert_eq!(
        *log.borrow(),
        vec!["beforeCreate:false", "created:\"hello\"", "beforeMount", "mounted"]
    );
    assert!(vm.is_mounted());
    assert_eq!(vm.el().as_deref(), Some("#app"));
    let vnode = vm.vnode().expect("mounted tree");
    assert_eq!(vnode.tag(), Some("p"));
    assert_eq!(vnode.children()[0].text(), Some("hello"));
}

#[test]
fn instance_without_el_is_not_mounted() {
    let _warnings = collect_warnings();
    let log: Log = Rc::default();
    let def = ComponentDefinition::base().extend(
        ComponentOptions::new()
            .hook(LifecycleHook::Mounted, record(&log, LifecycleHook::Mounted))
            .render(|vm: &Instance| vm.root(Child::from(text("x")))),
    );
    let vm = Instance::new(&def, ComponentOptions::new());
    assert!(!vm.is_mounted());
    assert!(vm.vnode().is_none());
    assert!(log.borrow().is_empty());

    vm.mount(None);
    assert!(vm.is_mounted());
    assert_eq!(*log.borrow(), vec!["mounted"]);
}

#[test]
fn mounting_without_render_warns() {
    let warnings = collect_warnings();
    let def = ComponentDefinition::base().extend(ComponentOptions::new());
    let vm = Instance::new(&def, ComponentOptions::new().el("#app"));
    assert!(vm.vnode().is_some_and(|v| v.is_empty()));
    if cfg!(debug_assertions) {
        assert!(
            warnings
                .borrow()
                .iter()
                .any(|w| w.contains("template or render function not defined"))
        );
    }

    let warnings = collect_warnings();
    let with_template = ComponentDefinition::base().extend(ComponentOptions::new().template("<div></div>"));
    Instance::new(&with_template, ComponentOptions::new().el("#app"));
    if cfg!(debug_assertions) {
        assert!(warnings.borrow().iter().any(|w| w.contains("runtime-only build")));
    }
}

#[test]
fn hook_events_are_emitted_when_listened_for() {
    let _warnings = collect_warnings();
    let def = ComponentDefinition::base().extend(
        ComponentOptions::new().render(|vm: &Instance| vm.root(Child::from(text("x")))),
    );
    let vm = Instance::new(&def, ComponentOptions::new());
    let fired: Log = Rc::default();
    let sink = Rc::clone(&fired);
    vm.on(
        "hook:mounted",
        Listener::new(move |_| sink.borrow_mut().push("mounted".into())),
    );
    vm.mount(None);
    assert_eq!(*fired.borrow(), vec!["mounted"]);
}

#[test]
fn multiple_roots_render_empty_with_warning() {
    let warnings = collect_warnings();
    let def = ComponentDefinition::base().extend(ComponentOptions::new().render(|vm: &Instance| {
        vm.root(Child::List(vec![
            Child::from(vm.c("a", VNodeData::new(), vec![], Normalization::None)),
            Child::from(vm.c("b", VNodeData::new(), vec![], Normalization::None)),
        ]))
    }));
    let vm = Instance::new(&def, ComponentOptions::new());
    assert!(vm.render().is_empty());
    if cfg!(debug_assertions) {
        assert!(
            warnings
                .borrow()
                .iter()
                .any(|w| w.starts_with("Multiple root nodes returned from render function"))
        );
    }
}

#[test]
fn force_update_runs_update_hooks_when_mounted() {
    let _warnings = collect_warnings();
    let log: Log = Rc::default();
    let def = ComponentDefinition::base().extend(
        ComponentOptions::new()
            .data(|_| Ok(json!({ "msg": "one" })))
            .hook(LifecycleHook::BeforeUpdate, record(&log, LifecycleHook::BeforeUpdate))
            .hook(LifecycleHook::Updated, record(&log, LifecycleHook::Updated))
            .render(greeting),
    );
    let vm = Instance::new(&def, ComponentOptions::new());
    vm.force_update();
    assert!(log.borrow().is_empty());

    vm.mount(None);
    vm.set("msg", json!("two"));
    vm.force_update();
    assert_eq!(*log.borrow(), vec!["beforeUpdate", "updated"]);
    let vnode = vm.vnode().expect("tree");
    assert_eq!(vnode.children()[0].text(), Some("two"));
}

#[test]
fn destroy_tears_down_children_first_and_unlinks() {
    let _warnings = collect_warnings();
    let log: Log = Rc::default();
    let base = ComponentDefinition::base();
    let child_log = Rc::clone(&log);
    let child = base.extend(
        ComponentOptions::new()
            .name("leaf")
            .hook(LifecycleHook::Destroyed, move |_vm: &Instance| {
                child_log.borrow_mut().push("leaf destroyed".into());
                Ok(())
            })
            .render(|vm: &Instance| vm.root(Child::from(text("leaf")))),
    );
    let parent_log = Rc::clone(&log);
    let parent = base.extend(
        ComponentOptions::new()
            .name("tree")
            .component("leaf", child)
            .hook(LifecycleHook::BeforeDestroy, move |_vm: &Instance| {
                parent_log.borrow_mut().push("tree beforeDestroy".into());
                Ok(())
            })
            .hook(LifecycleHook::Destroyed, record(&log, LifecycleHook::Destroyed))
            .render(|vm: &Instance| vm.c("leaf", VNodeData::new(), vec![], Normalization::None)),
    );
    let root = Instance::new(&parent, ComponentOptions::new().el("#app"));
    let Some(VNode::Component(placeholder)) = root.vnode() else {
        panic!("expected a component placeholder");
    };
    let kid = root.create_child(&placeholder).expect("child instance");
    assert_eq!(kid.parent(), Some(root.clone()));
    assert_eq!(kid.root_instance(), root);
    assert_eq!(root.children(), vec![kid.clone()]);

    let fired: Log = Rc::default();
    let sink = Rc::clone(&fired);
    root.on("ping", Listener::new(move |_| sink.borrow_mut().push("ping".into())));

    root.destroy();
    assert_eq!(
        *log.borrow(),
        vec!["tree beforeDestroy", "leaf destroyed", "destroyed"]
    );
    assert!(root.is_destroyed());
    assert!(kid.is_destroyed());
    assert!(root.children().is_empty());
    assert!(root.vnode().is_none());

    // listeners are gone after teardown
    root.emit("ping", &[]);
    assert!(fired.borrow().is_empty());

    // a second destroy is a no-op
    root.destroy();
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn destroying_a_child_removes_it_from_its_parent() {
    let _warnings = collect_warnings();
    let base = ComponentDefinition::base();
    let child = base.extend(ComponentOptions::new().name("leaf"));
    let parent = base.extend(
        ComponentOptions::new()
            .component("leaf", child)
            .render(|vm: &Instance| vm.c("leaf", VNodeData::new(), vec![], Normalization::None)),
    );
    let root = Instance::new(&parent, ComponentOptions::new());
    let VNode::Component(placeholder) = root.render() else {
        panic!("expected a component placeholder");
    };
    let kid = root.create_child(&placeholder).expect("child instance");
    kid.destroy();
    assert!(root.children().is_empty());
    assert!(!root.is_destroyed());
}

#[test]
fn hook_errors_reach_the_error_handler() {
    let _warnings = collect_warnings();
    let errors: Log = Rc::default();
    let sink = Rc::clone(&errors);
    config::set_error_handler(move |err, _vm, info| {
        sink.borrow_mut().push(format!("{info}: {err}"))
    });
    let def = ComponentDefinition::base().extend(
        ComponentOptions::new().hook(LifecycleHook::Created, |_vm: &Instance| {
            Err(anyhow::anyhow!("boom"))
        }),
    );
    Instance::new(&def, ComponentOptions::new());
    assert_eq!(*errors.borrow(), vec!["created hook: boom"]);
}

#[test]
fn error_captured_can_stop_propagation() {
    let _warnings = collect_warnings();
    let errors: Log = Rc::default();
    let global = Rc::clone(&errors);
    config::set_error_handler(move |err, _vm, _info| global.borrow_mut().push(format!("global: {err}")));

    let base = ComponentDefinition::base();
    let child = base.extend(
        ComponentOptions::new()
            .name("faulty")
            .hook(LifecycleHook::Created, |_vm: &Instance| Err(anyhow::anyhow!("child failed"))),
    );
    let captured = Rc::clone(&errors);
    let parent = base.extend(
        ComponentOptions::new()
            .component("faulty", child)
            .error_captured(move |err, vm, info| {
                captured.borrow_mut().push(format!(
                    "captured {info} from {}: {err}",
                    vm.options().name.clone().unwrap_or_default()
                ));
                false
            })
            .render(|vm: &Instance| vm.c("faulty", VNodeData::new(), vec![], Normalization::None)),
    );
    let root = Instance::new(&parent, ComponentOptions::new());
    let VNode::Component(placeholder) = root.render() else {
        panic!("expected a component placeholder");
    };
    root.create_child(&placeholder);
    assert_eq!(
        *errors.borrow(),
        vec!["captured created hook from faulty: child failed"]
    );
}
