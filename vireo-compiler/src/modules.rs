//! Compiler modules: per-element hooks that lift attributes into
//! `module_data` while building the AST and emit the matching data entries
//! during code generation.

use std::fmt;

use crate::template_ast::{AttrKind, Element};
use crate::template_codegen::{binding, string_lit};

pub trait CompilerModule {
    fn name(&self) -> &str;

    /// `module_data` keys that do not stop an element from being static.
    fn static_keys(&self) -> &[&'static str] {
        &[]
    }

    /// Runs when an element is closed, in module order.
    fn transform_node(&self, _el: &mut Element) {}

    /// Builder calls appended to the element's `VNodeData` expression.
    fn gen_data(&self, _el: &Element) -> String {
        String::new()
    }
}

impl fmt::Debug for dyn CompilerModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompilerModule({})", self.name())
    }
}

/// Comma-joined static keys of all modules.
pub fn gen_static_keys(modules: &[std::rc::Rc<dyn CompilerModule>]) -> String {
    modules
        .iter()
        .flat_map(|m| m.static_keys().iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// `class` and `:class`.
#[derive(Debug, Default)]
pub struct ClassModule;

impl CompilerModule for ClassModule {
    fn name(&self) -> &str {
        "class"
    }

    fn static_keys(&self) -> &[&'static str] {
        &["staticClass"]
    }

    fn transform_node(&self, el: &mut Element) {
        if let Some(attr) = el.take_attr(AttrKind::Static, "class") {
            let class = attr
                .value_str()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            el.module_data.insert("staticClass".into(), class);
        }
        if let Some(attr) = el.take_attr(AttrKind::Bind, "class") {
            el.module_data
                .insert("classBinding".into(), attr.value_str().trim().to_string());
        }
    }

    fn gen_data(&self, el: &Element) -> String {
        let mut data = String::new();
        if let Some(class) = el.module_data.get("staticClass") {
            data.push_str(&format!(".static_class({})", string_lit(class)));
        }
        if let Some(expr) = el.module_data.get("classBinding") {
            data.push_str(&format!(".class({})", binding(expr)));
        }
        data
    }
}

/// `style` and `:style`.
#[derive(Debug, Default)]
pub struct StyleModule;

impl CompilerModule for StyleModule {
    fn name(&self) -> &str {
        "style"
    }

    fn static_keys(&self) -> &[&'static str] {
        &["staticStyle"]
    }

    fn transform_node(&self, el: &mut Element) {
        if let Some(attr) = el.take_attr(AttrKind::Static, "style") {
            el.module_data
                .insert("staticStyle".into(), normalize_style_text(attr.value_str()));
        }
        if let Some(attr) = el.take_attr(AttrKind::Bind, "style") {
            el.module_data
                .insert("styleBinding".into(), attr.value_str().trim().to_string());
        }
    }

    fn gen_data(&self, el: &Element) -> String {
        let mut data = String::new();
        if let Some(style) = el.module_data.get("staticStyle") {
            data.push_str(&format!(".static_style({})", string_lit(style)));
        }
        if let Some(expr) = el.module_data.get("styleBinding") {
            data.push_str(&format!(".style({})", binding(expr)));
        }
        data
    }
}

/// `color: red ;  ;width:1px` -> `color:red;width:1px`
fn normalize_style_text(text: &str) -> String {
    text.split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let (prop, value) = (prop.trim(), value.trim());
            (!prop.is_empty()).then(|| format!("{prop}:{value}"))
        })
        .collect::<Vec<_>>()
        .join(";")
}
