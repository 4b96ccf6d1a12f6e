//! Compile-time directive handlers.

use crate::template_ast::{Element, TemplateAttr};
use crate::template_codegen::binding;

/// What a compile-time directive contributes to the element's data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveCode {
    /// Builder calls appended to the `VNodeData` expression.
    pub data: String,
    /// Whether the directive must also be attached to the node at runtime.
    pub needs_runtime: bool,
}

pub type DirectiveHandler = fn(&Element, &TemplateAttr) -> DirectiveCode;

/// `v-text`
pub fn text(_el: &Element, dir: &TemplateAttr) -> DirectiveCode {
    DirectiveCode {
        data: format!(
            r#".dom_prop("textContent", Value::from(vm.to_display(&{})))"#,
            binding(dir.value_str())
        ),
        needs_runtime: false,
    }
}

/// `v-html`
pub fn html(_el: &Element, dir: &TemplateAttr) -> DirectiveCode {
    DirectiveCode {
        data: format!(
            r#".dom_prop("innerHTML", Value::from(vm.to_display(&{})))"#,
            binding(dir.value_str())
        ),
        needs_runtime: false,
    }
}

/// `v-cloak` only matters before compilation.
pub fn cloak(_el: &Element, _dir: &TemplateAttr) -> DirectiveCode {
    DirectiveCode::default()
}
