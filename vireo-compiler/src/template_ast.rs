use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttrKind {
    Static,    // class="app"
    Bind,      // :value="count"
    On,        // @click="increment"
    Directive, // v-if="show"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateAttr {
    /// Attribute, bound property, event or directive name, without prefix.
    pub name: String,
    pub value: Option<String>,
    pub kind: AttrKind,
    /// `v-dir:arg`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    /// Name as written in the template.
    pub raw_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl TemplateAttr {
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn has_modifier(&self, m: &str) -> bool {
        self.modifiers.iter().any(|x| x == m)
    }

    /// Attribute as written, for diagnostics.
    pub fn raw(&self) -> String {
        match &self.value {
            Some(v) => format!("{}=\"{}\"", self.raw_name, v),
            None => self.raw_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<TemplateAttr>,
    pub children: Vec<Node>,
    pub self_closing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
    /// Entries lifted out of `attrs` by compiler modules, keyed by the name
    /// the module registers (e.g. `staticClass`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub module_data: BTreeMap<String, String>,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub static_root: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            ns: None,
            module_data: BTreeMap::new(),
            is_static: false,
            static_root: false,
            span: None,
        }
    }

    pub fn directive(&self, name: &str) -> Option<&TemplateAttr> {
        self.attrs
            .iter()
            .find(|a| a.kind == AttrKind::Directive && a.name == name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }

    pub fn static_attr(&self, name: &str) -> Option<&TemplateAttr> {
        self.attrs
            .iter()
            .find(|a| a.kind == AttrKind::Static && a.name == name)
    }

    pub fn binding(&self, name: &str) -> Option<&TemplateAttr> {
        self.attrs
            .iter()
            .find(|a| a.kind == AttrKind::Bind && a.name == name)
    }

    /// Removes and returns the first attribute matching `kind` and `name`.
    pub fn take_attr(&mut self, kind: AttrKind, name: &str) -> Option<TemplateAttr> {
        let pos = self
            .attrs
            .iter()
            .position(|a| a.kind == kind && a.name == name)?;
        Some(self.attrs.remove(pos))
    }

    pub fn is_conditional_branch(&self) -> bool {
        self.has_directive("else-if") || self.has_directive("else")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "node", rename_all = "lowercase")]
pub enum Node {
    Element(Element),
    Text(String),
    Interpolation(String), // {{ expr }}
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_whitespace_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}
