//! Turns the optimized AST into Rust render-function source targeting
//! `vireo_core::Instance` and the `vireo_dom` builders.

use lazy_static::lazy_static;
use regex::Regex;

use crate::options::CompilerOptions;
use crate::template_ast::{AttrKind, Element, Node, TemplateAttr};

lazy_static! {
    static ref FOR_ALIAS: Regex =
        Regex::new(r"(?s)^\s*(.*?)\s+(?:in|of)\s+(.*?)\s*$").expect("for alias pattern");
    static ref FOR_ITERATOR: Regex =
        Regex::new(r",([^,}\]]*)(?:,([^,}\]]*))?$").expect("for iterator pattern");
}

/// Directives consumed by the compiler itself.
const STRUCTURAL_DIRECTIVES: &[&str] = &["if", "else-if", "else", "for", "slot", "pre", "once"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenResult {
    pub render: String,
    pub static_render_fns: Vec<String>,
}

/// `v-for="(alias, iterator1, iterator2) in source"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForExpr {
    pub source: String,
    pub alias: String,
    pub iterator1: Option<String>,
    pub iterator2: Option<String>,
}

impl ForExpr {
    pub fn parse(exp: &str) -> Option<ForExpr> {
        let caps = FOR_ALIAS.captures(exp)?;
        let source = caps[2].trim().to_string();
        let lhs = caps[1].trim();
        let lhs = lhs.strip_prefix('(').unwrap_or(lhs);
        let lhs = lhs.strip_suffix(')').unwrap_or(lhs);

        let (alias, iterator1, iterator2) = match FOR_ITERATOR.captures(lhs) {
            Some(it) => {
                let alias = lhs[..it.get(0).map_or(lhs.len(), |m| m.start())].trim();
                let it1 = it.get(1).map(|m| m.as_str().trim().to_string());
                let it2 = it.get(2).map(|m| m.as_str().trim().to_string());
                (alias.to_string(), it1, it2)
            }
            None => (lhs.trim().to_string(), None, None),
        };
        if source.is_empty() || alias.is_empty() {
            return None;
        }
        Some(ForExpr {
            source,
            alias,
            iterator1,
            iterator2,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Processed {
    for_done: bool,
    if_done: bool,
    static_done: bool,
}

struct CodegenState<'a> {
    options: &'a CompilerOptions,
    warn: &'a mut dyn FnMut(String, bool),
    static_render_fns: Vec<String>,
}

pub fn generate(
    roots: &[Node],
    options: &CompilerOptions,
    warn: &mut dyn FnMut(String, bool),
) -> CodegenResult {
    let mut state = CodegenState {
        options,
        warn,
        static_render_fns: Vec::new(),
    };
    let body = state
        .gen_nodes(roots)
        .into_iter()
        .next()
        .unwrap_or_else(|| {
            r#"Child::from(vm.c("div", VNodeData::new(), vec![], Normalization::None))"#.to_string()
        });
    CodegenResult {
        render: wrap_render_fn("render", &body),
        static_render_fns: state.static_render_fns,
    }
}

fn wrap_render_fn(name: &str, body: &str) -> String {
    format!(
        r#"#[allow(unused_variables)]
pub fn {name}(vm: &vireo_core::Instance) -> vireo_dom::Rendered {{
    use vireo_dom::*;
    let scope = vireo_core::Scope::root();
    vm.root({body})
}}"#
    )
}

impl CodegenState<'_> {
    /// One `Child` expression per node; `v-if` chains collapse into one.
    fn gen_nodes(&mut self, nodes: &[Node]) -> Vec<String> {
        let mut out = Vec::with_capacity(nodes.len());
        let mut i = 0;
        while i < nodes.len() {
            match &nodes[i] {
                Node::Element(el) if el.has_directive("if") && !el.has_directive("for") => {
                    let mut branches = vec![el];
                    i += 1;
                    while let Some(Node::Element(next)) = nodes.get(i) {
                        if !next.is_conditional_branch() {
                            break;
                        }
                        branches.push(next);
                        i += 1;
                        if next.has_directive("else") {
                            break;
                        }
                    }
                    out.push(self.gen_if_chain(&branches));
                }
                node => {
                    out.push(self.gen_node(node));
                    i += 1;
                }
            }
        }
        out
    }

    fn gen_node(&mut self, node: &Node) -> String {
        match node {
            Node::Element(el) => self.gen_element(el, Processed::default()),
            Node::Text(t) => format!("Child::from(text({}))", string_lit(t)),
            Node::Interpolation(expr) => {
                format!("Child::from(text(vm.to_display(&{})))", binding(expr))
            }
            Node::Comment(c) => format!("Child::from(VNode::Comment({}.into()))", string_lit(c)),
        }
    }

    fn gen_element(&mut self, el: &Element, done: Processed) -> String {
        if el.static_root && !done.static_done {
            return self.gen_static(el, done);
        }
        if el.has_directive("for") && !done.for_done {
            return self.gen_for(el, done);
        }
        if let Some(cond) = el.directive("if").filter(|_| !done.if_done) {
            let body = self.gen_element(el, Processed { if_done: true, ..done });
            return format!(
                "if is_truthy(&{}) {{ {body} }} else {{ Child::Empty }}",
                binding(cond.value_str())
            );
        }
        match el.tag.as_str() {
            "template" => format!("Child::List(vec![{}])", self.gen_nodes(&el.children).join(", ")),
            "slot" => self.gen_slot(el),
            _ => self.gen_create(el),
        }
    }

    fn gen_if_chain(&mut self, branches: &[&Element]) -> String {
        let mut code = String::new();
        for (n, branch) in branches.iter().enumerate() {
            let body = self.gen_element(
                branch,
                Processed {
                    if_done: true,
                    ..Processed::default()
                },
            );
            let cond = branch
                .directive("if")
                .or_else(|| branch.directive("else-if"));
            match cond {
                Some(cond) => {
                    if n > 0 {
                        code.push_str(" else ");
                    }
                    code.push_str(&format!(
                        "if is_truthy(&{}) {{ {body} }}",
                        binding(cond.value_str())
                    ));
                }
                None => code.push_str(&format!(" else {{ {body} }}")),
            }
        }
        if !branches.last().is_some_and(|b| b.has_directive("else")) {
            code.push_str(" else { Child::Empty }");
        }
        code
    }

    fn gen_static(&mut self, el: &Element, done: Processed) -> String {
        let body = self.gen_element(
            el,
            Processed {
                static_done: true,
                ..done
            },
        );
        let index = self.static_render_fns.len();
        self.static_render_fns
            .push(wrap_render_fn(&format!("static_render_{index}"), &body));
        format!("Child::from(vm.static_tree({index}))")
    }

    fn gen_for(&mut self, el: &Element, done: Processed) -> String {
        let exp = el.directive("for").map(TemplateAttr::value_str).unwrap_or("");
        let Some(for_exp) = ForExpr::parse(exp) else {
            (self.warn)(format!("Invalid v-for expression: {exp}"), false);
            return "Child::Empty".to_string();
        };

        let is_component = el.tag != "slot"
            && el.tag != "template"
            && !(self.options.is_reserved_tag)(&el.tag);
        if cfg!(debug_assertions) && is_component && el.binding("key").is_none() {
            (self.warn)(
                format!(
                    "<{} v-for=\"{exp}\">: component lists rendered with v-for should have explicit keys.",
                    el.tag
                ),
                true,
            );
        }

        let mut scope = format!(".with({}, item)", string_lit(&for_exp.alias));
        let key = match &for_exp.iterator1 {
            Some(name) => {
                scope.push_str(&format!(".with({}, key)", string_lit(name)));
                "key"
            }
            None => "_key",
        };
        let index = match &for_exp.iterator2 {
            Some(name) => {
                scope.push_str(&format!(
                    ".with({}, Value::from(index))",
                    string_lit(name)
                ));
                "index"
            }
            None => "_index",
        };
        let body = self.gen_element(
            el,
            Processed {
                for_done: true,
                ..done
            },
        );
        format!(
            "Child::List(vm.render_list(&{}, |item, {key}, {index}| {{ let scope = scope{scope}; {body} }}))",
            binding(&for_exp.source)
        )
    }

    fn gen_slot(&mut self, el: &Element) -> String {
        let name = el
            .static_attr("name")
            .map(TemplateAttr::value_str)
            .unwrap_or("default");
        let fallback = self.gen_nodes(&el.children).join(", ");
        format!(
            "Child::from(vm.render_slot({}, vec![{fallback}]))",
            string_lit(name)
        )
    }

    fn gen_create(&mut self, el: &Element) -> String {
        let tag = if el.tag == "component" {
            match (el.binding("is"), el.static_attr("is")) {
                (Some(is), _) => format!("TagRef::Dynamic({})", binding(is.value_str())),
                (None, Some(is)) => string_lit(is.value_str()),
                (None, None) => string_lit(&el.tag),
            }
        } else {
            string_lit(&el.tag)
        };
        let data = self.gen_data(el);
        let children = self.gen_nodes(&el.children).join(", ");
        format!(
            "Child::from(vm.c({tag}, {data}, vec![{children}], Normalization::{}))",
            normalization_type(&el.children)
        )
    }

    fn gen_data(&mut self, el: &Element) -> String {
        let mut data = String::from("VNodeData::new()");
        let is_dynamic_component = el.tag == "component";

        if let Some(key) = el.binding("key") {
            data.push_str(&format!(".key({})", binding(key.value_str())));
        } else if let Some(key) = el.static_attr("key") {
            data.push_str(&format!(".key(Value::from({}))", string_lit(key.value_str())));
        }
        if let Some(r) = el.static_attr("ref") {
            data.push_str(&format!(".reference({})", string_lit(r.value_str())));
        }
        if let Some(slot) = el.static_attr("slot") {
            data.push_str(&format!(".slot({})", string_lit(slot.value_str())));
        }

        // directives first; platform handlers may contribute data entries
        for dir in el.attrs.iter().filter(|a| a.kind == AttrKind::Directive) {
            if STRUCTURAL_DIRECTIVES.contains(&dir.name.as_str()) {
                continue;
            }
            match self.options.directives.get(&dir.name) {
                Some(handler) => {
                    let code = handler(el, dir);
                    data.push_str(&code.data);
                    if code.needs_runtime {
                        data.push_str(&runtime_directive(dir));
                    }
                }
                None => data.push_str(&runtime_directive(dir)),
            }
        }

        for module in &self.options.modules {
            data.push_str(&module.gen_data(el));
        }

        let attr_type = el.static_attr("type").map(TemplateAttr::value_str);
        for a in &el.attrs {
            let reserved = matches!(a.name.as_str(), "key" | "ref" | "slot")
                || (is_dynamic_component && a.name == "is");
            match a.kind {
                AttrKind::Static if !reserved => {
                    data.push_str(&format!(
                        ".set({}, {})",
                        string_lit(&a.name),
                        string_lit(a.value_str())
                    ));
                }
                AttrKind::Bind if !reserved => {
                    let method = if a.has_modifier("prop")
                        || (self.options.must_use_prop)(&el.tag, attr_type, &a.name)
                    {
                        "dom_prop"
                    } else {
                        "bind"
                    };
                    data.push_str(&format!(
                        ".{method}({}, {})",
                        string_lit(&a.name),
                        binding(a.value_str())
                    ));
                }
                AttrKind::On => {
                    let method = if a.has_modifier("native") {
                        "native_on"
                    } else {
                        "on"
                    };
                    data.push_str(&format!(
                        ".{method}({}, vm.listener(&scope, {}))",
                        string_lit(&a.name),
                        string_lit(a.value_str())
                    ));
                }
                _ => {}
            }
        }
        data
    }
}

fn runtime_directive(dir: &TemplateAttr) -> String {
    let (value, expression) = match &dir.value {
        Some(v) => (
            format!("Some({})", binding(v)),
            format!("Some({}.into())", string_lit(v)),
        ),
        None => ("None".to_string(), "None".to_string()),
    };
    let arg = match &dir.arg {
        Some(arg) => format!("Some({}.into())", string_lit(arg)),
        None => "None".to_string(),
    };
    let modifiers = dir
        .modifiers
        .iter()
        .map(|m| format!("{}.into()", string_lit(m)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        ".directive(VNodeDirective {{ name: {}.into(), value: {value}, expression: {expression}, arg: {arg}, modifiers: vec![{modifiers}] }})",
        string_lit(&dir.name)
    )
}

/// Children that may expand into several nodes need flattening.
fn normalization_type(children: &[Node]) -> &'static str {
    let needs_flattening = children.iter().any(|c| {
        c.as_element().is_some_and(|el| {
            el.has_directive("for") || el.tag == "template" || el.tag == "slot"
        })
    });
    if needs_flattening { "Simple" } else { "None" }
}

/// Expression reading `expr` in the current render scope.
pub fn binding(expr: &str) -> String {
    format!("vm.resolve_in(&scope, {})", string_lit(expr.trim()))
}

pub fn string_lit(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}
