use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Value, json};
use vireo_core::{ComponentDefinition, ComponentOptions, Instance, ReadTracker, Scope, config, resolve_slots};
use vireo_dom::{
    Child, ContextId, Normalization, Rendered, ScopedSlot, VNode, VNodeData, h, text,
};

type Log = Rc<RefCell<Vec<String>>>;

fn collect_warnings() -> Log {
    config::reset();
    let seen: Log = Rc::default();
    let sink = Rc::clone(&seen);
    config::set_warn_handler(move |msg, _trace| sink.borrow_mut().push(msg.to_string()));
    seen
}

fn warned(log: &Log, needle: &str) -> bool {
    !cfg!(debug_assertions) || log.borrow().iter().any(|w| w.contains(needle))
}

fn instance(options: ComponentOptions) -> Instance {
    Instance::new(&ComponentDefinition::base().extend(options), ComponentOptions::new())
}

fn texts(children: &[Child]) -> Vec<String> {
    children
        .iter()
        .map(|c| match c {
            Child::Text(t) => t.clone(),
            other => format!("{other:?}"),
        })
        .collect()
}

#[test]
fn expressions_resolve_against_scope_then_instance() {
    let _warnings = collect_warnings();
    let vm = instance(
        ComponentOptions::new()
            .data(|_| Ok(json!({ "item": "data", "user": { "tags": ["a", "b"] } })))
            .computed("count", |_| json!(2)),
    );
    let scope = Scope::root().with("item", json!("scoped"));
    assert_eq!(vm.resolve_in(&scope, "item"), json!("scoped"));
    assert_eq!(vm.resolve("item"), json!("data"));
    assert_eq!(vm.resolve("user.tags[1]"), json!("b"));
    assert_eq!(vm.resolve("user.tags.length"), json!(2));
    assert_eq!(vm.resolve("!count"), json!(false));
    assert_eq!(vm.resolve("$data.item"), json!("data"));
    assert_eq!(vm.to_display(&json!({ "a": 1 })), "{\n  \"a\": 1\n}");
    assert_eq!(vm.to_display(&Value::Null), "");
}

#[test]
fn undeclared_properties_warn_during_render() {
    let warnings = collect_warnings();
    let vm = instance(ComponentOptions::new());
    assert_eq!(vm.resolve("ghost"), Value::Null);
    assert!(warned(
        &warnings,
        "Property or method \"ghost\" is not defined on the instance but referenced during render."
    ));

    assert_eq!(vm.resolve("a +"), Value::Null);
    assert!(warned(&warnings, "invalid expression \"a +\""));
}

#[test]
fn render_list_iterates_every_source_kind() {
    let _warnings = collect_warnings();
    let vm = instance(ComponentOptions::new());
    let item = |v: Value, k: Value, i: usize| Child::from(format!("{i}:{k}={v}"));

    assert_eq!(
        texts(&vm.render_list(&json!(["x", "y"]), item)),
        vec!["0:0=\"x\"", "1:1=\"y\""]
    );
    assert_eq!(texts(&vm.render_list(&json!({ "k": 1 }), item)), vec!["0:\"k\"=1"]);
    assert_eq!(texts(&vm.render_list(&json!(2), item)), vec!["0:0=1", "1:1=2"]);
    assert_eq!(texts(&vm.render_list(&json!("ab"), item)), vec!["0:0=\"a\"", "1:1=\"b\""]);
    assert!(vm.render_list(&Value::Null, item).is_empty());
}

#[test]
fn v_for_scopes_shadow_instance_data() {
    let _warnings = collect_warnings();
    let vm = instance(
        ComponentOptions::new()
            .data(|_| Ok(json!({ "items": ["a", "b"], "item": "outer" })))
            .render(|vm: &Instance| {
                let scope = Scope::root();
                let rows = vm.render_list(&vm.resolve_in(&scope, "items"), |item, _key, index| {
                    let scope = scope.with("item", item).with("index", Value::from(index));
                    Child::from(vm.c(
                        "li",
                        VNodeData::new().key(vm.resolve_in(&scope, "index")),
                        vec![Child::from(vm.to_display(&vm.resolve_in(&scope, "item")))],
                        Normalization::None,
                    ))
                });
                vm.c("ul", VNodeData::new(), vec![Child::from(rows)], Normalization::Simple)
            }),
    );
    let tree = vm.render();
    let items: Vec<&str> = tree.children().iter().filter_map(|li| li.children()[0].text()).collect();
    assert_eq!(items, vec!["a", "b"]);
}

#[test]
fn static_trees_render_once() {
    let warnings = collect_warnings();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let vm = instance(ComponentOptions::new().static_render(move |vm: &Instance| {
        counter.set(counter.get() + 1);
        vm.c("footer", VNodeData::new(), vec![Child::from("static")], Normalization::None)
    }));
    let first = vm.static_tree(0);
    let second = vm.static_tree(0);
    assert_eq!(first, second);
    assert_eq!(first.as_node().and_then(VNode::tag), Some("footer"));
    assert_eq!(calls.get(), 1);

    assert!(vm.static_tree(3).is_empty());
    assert!(warned(&warnings, "Missing static render function 3."));
}

#[test]
fn root_collapses_single_children() {
    let _warnings = collect_warnings();
    let vm = instance(ComponentOptions::new());
    assert_eq!(vm.root(Child::from("hi")), Rendered::Node(text("hi")));
    assert!(vm.root(Child::Empty).is_empty());
    assert_eq!(
        vm.root(Child::List(vec![Child::Empty, Child::from("only")])),
        Rendered::Node(text("only"))
    );
}

fn slot_host(children: impl Fn(&Instance) -> Vec<Child> + 'static, data: VNodeData) -> (Instance, Instance) {
    let base = ComponentDefinition::base();
    let card = base.extend(ComponentOptions::new().name("card"));
    let page = base.extend(ComponentOptions::new().component("card", card).render(move |vm: &Instance| {
        vm.c("card", data.clone(), children(vm), Normalization::Simple)
    }));
    let vm = Instance::new(&page, ComponentOptions::new());
    let VNode::Component(placeholder) = vm.render() else {
        panic!("expected a component placeholder");
    };
    let child = vm.create_child(&placeholder).expect("child");
    (vm, child)
}

#[test]
fn slots_are_grouped_by_name() {
    let _warnings = collect_warnings();
    let (_page, card) = slot_host(
        |vm| {
            vec![
                Child::from(vm.c(
                    "h1",
                    VNodeData::new().slot("header").set("slot", "header"),
                    vec![Child::from("Title")],
                    Normalization::None,
                )),
                Child::from(vm.c(
                    "template",
                    VNodeData::new().slot("footer"),
                    vec![Child::from("a"), Child::from("b")],
                    Normalization::None,
                )),
                Child::from("body"),
                Child::from("  "),
            ]
        },
        VNodeData::new(),
    );
    let slots = card.slots();
    let header = &slots["header"];
    assert_eq!(header.len(), 1);
    assert_eq!(header[0].tag(), Some("h1"));
    assert!(header[0].data().is_some_and(|d| !d.attrs.contains_key("slot")));
    assert_eq!(slots["footer"].len(), 2);
    assert_eq!(slots["default"].len(), 2);

    let content = card.render_slot("header", vec![Child::from("fallback")]);
    assert!(matches!(content, Child::List(ref nodes) if nodes.len() == 1));
    let fallback = card.render_slot("missing", vec![Child::from("fallback")]);
    assert_eq!(fallback, Child::List(vec![Child::from("fallback")]));
}

#[test]
fn whitespace_only_slots_are_dropped() {
    let slots = resolve_slots(&[text("  "), VNode::empty()], None);
    assert!(slots.is_empty());
}

#[test]
fn slot_names_from_other_contexts_fall_back_to_default() {
    let foreign = VNode::Element {
        tag: "p".into(),
        data: Some(VNodeData::new().slot("header")),
        children: vec![],
        ns: None,
        context: Some(ContextId(999_999)),
    };
    let slots = resolve_slots(&[foreign, h("span", (), vec![])], Some(ContextId(1)));
    assert_eq!(slots.keys().collect::<Vec<_>>(), vec!["default"]);
    assert_eq!(slots["default"].len(), 2);
}

#[test]
fn scoped_slots_come_from_the_placeholder() {
    let _warnings = collect_warnings();
    let slot = ScopedSlot::new(|_props| vec![text("scoped")]);
    let (_page, card) = slot_host(|_| vec![], VNodeData::new().scoped_slot("row", slot));
    card.render();
    assert!(card.scoped_slots().contains_key("row"));
    assert_eq!(
        card.render_slot("row", vec![]),
        Child::List(vec![Child::Node(text("scoped"))])
    );
}

#[test]
fn unknown_attributes_become_attrs() {
    let _warnings = collect_warnings();
    let (_page, card) = slot_host(|_| vec![], VNodeData::new().set("title", "hint"));
    assert_eq!(card.attrs().get("title"), Some(&json!("hint")));
    assert_eq!(card.resolve("$attrs.title"), json!("hint"));
}

#[derive(Default)]
struct CountingTracker {
    reads: Cell<usize>,
}

impl ReadTracker for CountingTracker {
    fn mark_read(&self, _value: &Value) {
        self.reads.set(self.reads.get() + 1);
    }
}

#[test]
fn style_objects_are_read_deeply() {
    let _warnings = collect_warnings();
    let vm = instance(ComponentOptions::new().render(|vm: &Instance| {
        vm.c(
            "div",
            VNodeData::new().style(json!({ "color": "red", "margin": { "top": 1 } })),
            vec![],
            Normalization::None,
        )
    }));
    let tracker = Rc::new(CountingTracker::default());
    vm.set_read_tracker(tracker.clone());
    vm.render();
    // root object, both entries, and the nested entry
    assert_eq!(tracker.reads.get(), 4);
}

#[test]
fn filters_resolve_by_any_spelling() {
    let warnings = collect_warnings();
    let vm = instance(ComponentOptions::new().filter("toUpper", |v, _args| {
        json!(v.as_str().unwrap_or_default().to_uppercase())
    }));
    let filter = vm.resolve_filter("to-upper").expect("filter");
    assert_eq!((filter.0)(&json!("abc"), &[]), json!("ABC"));
    assert!(vm.resolve_filter("nope").is_none());
    assert!(warned(&warnings, "Failed to resolve filter: nope"));
}

#[test]
fn invalid_handlers_warn() {
    let warnings = collect_warnings();
    let vm = instance(ComponentOptions::new());
    vm.listener(&Scope::root(), "missing").call(&[]);
    assert!(warned(&warnings, "method \"missing\" is not defined"));
    vm.listener(&Scope::root(), "a + b").call(&[]);
    assert!(warned(&warnings, "Invalid handler for event: \"a + b\""));
}
