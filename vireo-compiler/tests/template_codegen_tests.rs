use vireo_compiler::compile;

fn render(src: &str) -> String {
    let out = compile(src);
    assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
    syn::parse_file(&out.render).expect("generated render is valid Rust");
    out.render
}

#[test]
fn codegen_div_with_text() {
    let rs = render("<div>hi</div>");
    assert!(rs.contains("pub fn render(vm: &vireo_core::Instance) -> vireo_dom::Rendered"));
    assert!(rs.contains("use vireo_dom::*;"));
    assert!(rs.contains(r#"vm.c("div", VNodeData::new(), vec![Child::from(text("hi"))], Normalization::None)"#));
}

#[test]
fn codegen_interpolation() {
    let rs = render("<p>Hello {{name}}</p>");
    println!("-- GENERATED RS --\n{}\n-- END RS --", rs);
    assert!(rs.contains(r#"text("Hello ")"#));
    assert!(rs.contains(r#"text(vm.to_display(&vm.resolve_in(&scope, "name")))"#));
}

#[test]
fn codegen_attrs() {
    let rs = render(r#"<input class="x" :value="count" @input="onInput"/>"#);
    assert!(rs.contains(r#".static_class("x")"#));
    assert!(rs.contains(r#".dom_prop("value", vm.resolve_in(&scope, "count"))"#));
    assert!(rs.contains(r#".on("input", vm.listener(&scope, "onInput"))"#));
}

#[test]
fn codegen_modifiers() {
    let rs = render(r#"<my-button :label.prop="l" @click.native="go"></my-button>"#);
    assert!(rs.contains(r#"vm.c("my-button""#));
    assert!(rs.contains(r#".dom_prop("label", vm.resolve_in(&scope, "l"))"#));
    assert!(rs.contains(r#".native_on("click", vm.listener(&scope, "go"))"#));
}

#[test]
fn codegen_v_for_binds_aliases() {
    let out = compile(r#"<ul><li v-for="(item, key, i) in items" :key="key">{{ i }}: {{ item }}</li></ul>"#);
    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let rs = out.render;
    assert!(rs.contains(r#"vm.render_list(&vm.resolve_in(&scope, "items"), |item, key, index|"#));
    assert!(rs.contains(r#"let scope = scope.with("item", item).with("key", key).with("i", Value::from(index));"#));
    assert!(rs.contains(r#".key(vm.resolve_in(&scope, "key"))"#));
    assert!(rs.contains("Normalization::Simple"));
    syn::parse_file(&rs).unwrap();
}

#[test]
fn component_lists_without_keys_get_a_tip() {
    let out = compile(r#"<div><todo-item v-for="t in todos"></todo-item></div>"#);
    assert!(out.errors.is_empty());
    if cfg!(debug_assertions) {
        assert_eq!(
            out.tips,
            vec![r#"<todo-item v-for="t in todos">: component lists rendered with v-for should have explicit keys."#]
        );
    }
}

#[test]
fn invalid_v_for_is_an_error() {
    let out = compile(r#"<div><p v-for="items">x</p></div>"#);
    assert!(out.errors.iter().any(|e| e == "Invalid v-for expression: items"));
    assert!(out.render.contains("Child::Empty"));
}

#[test]
fn static_subtrees_are_hoisted() {
    let out = compile(r#"<div><ul class="menu"><li>a</li><li>b</li></ul><p>{{ msg }}</p></div>"#);
    assert!(out.errors.is_empty());
    assert_eq!(out.static_render_fns.len(), 1);
    assert!(out.render.contains("Child::from(vm.static_tree(0))"));
    let hoisted = &out.static_render_fns[0];
    assert!(hoisted.contains("pub fn static_render_0(vm: &vireo_core::Instance)"));
    assert!(hoisted.contains(r#".static_class("menu")"#));
    syn::parse_file(hoisted).unwrap();
}

#[test]
fn slots_and_templates() {
    let rs = render(
        r#"<div><slot name="header"><h1>Default</h1></slot><template v-if="ok"><b>a</b><i>b</i></template></div>"#,
    );
    assert!(rs.contains(r#"vm.render_slot("header", vec!["#));
    assert!(rs.contains("Child::List(vec!["));
    assert!(rs.contains("Normalization::Simple"));
}

#[test]
fn dynamic_component() {
    let rs = render(r#"<div><component :is="view" :title="t"></component></div>"#);
    assert!(rs.contains(r#"vm.c(TagRef::Dynamic(vm.resolve_in(&scope, "view"))"#));
    assert!(!rs.contains(r#"bind("is""#));
}

#[test]
fn built_in_and_runtime_directives() {
    let rs = render(r#"<div><p v-text="msg"></p><span v-html="raw"></span><i v-show="on"></i><b v-cloak>x</b></div>"#);
    assert!(rs.contains(r#".dom_prop("textContent", Value::from(vm.to_display(&vm.resolve_in(&scope, "msg"))))"#));
    assert!(rs.contains(r#".dom_prop("innerHTML""#));
    assert!(rs.contains(r#"VNodeDirective { name: "show".into(), value: Some(vm.resolve_in(&scope, "on")), expression: Some("on".into()), arg: None, modifiers: vec![] }"#));
    assert!(!rs.contains(r#"name: "cloak""#));
}

#[test]
fn empty_template_falls_back_to_div() {
    let out = compile("");
    assert!(out.errors.is_empty());
    assert!(out.render.contains(r#"vm.c("div", VNodeData::new(), vec![], Normalization::None)"#));
}
