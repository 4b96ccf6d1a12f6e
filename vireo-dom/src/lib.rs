//! Virtual node model and element factory.
//!
//! A render pass builds a fresh tree of [`VNode`]s through [`create_element`];
//! the patch algorithm that consumes the tree lives elsewhere.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub mod create_element;
pub mod expr;
pub mod normalize;
pub mod platform;

pub use create_element::{
    ComponentCtor, CtorRef, DataArg, FunctionalCall, RenderContext, TagRef, camelize, capitalize,
    create_component, create_element, hyphenate, resolve_asset,
};
pub use expr::{Expr, ExprError, is_truthy, to_display};
pub use normalize::{Normalization, apply_ns, normalize_children, simple_normalize_children};
pub use serde_json::{Map, Value, json};

/// Identity of the component instance that rendered a node.
///
/// This is a non-owning back-reference: it names the instance by uid and
/// never keeps it alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Element {
        tag: String,
        data: Option<VNodeData>,
        children: Vec<VNode>,
        ns: Option<String>,
        context: Option<ContextId>,
    },
    /// Placeholder for a child component at its usage site.
    Component(ComponentVNode),
    Text(String),
    /// Comment node. An empty comment doubles as the empty placeholder.
    Comment(String),
}

impl VNode {
    pub fn empty() -> Self {
        VNode::Comment(String::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, VNode::Comment(t) if t.is_empty())
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element { tag, .. } => Some(tag),
            VNode::Component(c) => Some(&c.tag),
            VNode::Text(_) | VNode::Comment(_) => None,
        }
    }

    pub fn ns(&self) -> Option<&str> {
        match self {
            VNode::Element { ns, .. } => ns.as_deref(),
            VNode::Component(c) => c.ns.as_deref(),
            VNode::Text(_) | VNode::Comment(_) => None,
        }
    }

    pub fn data(&self) -> Option<&VNodeData> {
        match self {
            VNode::Element { data, .. } => data.as_ref(),
            VNode::Component(c) => Some(&c.data),
            VNode::Text(_) | VNode::Comment(_) => None,
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children,
            VNode::Component(c) => &c.children,
            VNode::Text(_) | VNode::Comment(_) => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            VNode::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Whitespace-only text or a comment.
    pub fn is_whitespace(&self) -> bool {
        match self {
            VNode::Text(t) => t.trim().is_empty(),
            VNode::Comment(_) => true,
            _ => false,
        }
    }
}

/// Component placeholder produced by [`create_component`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentVNode {
    /// `vue-component-<cid>[-<name>]`
    pub tag: String,
    pub ctor: CtorRef,
    pub data: VNodeData,
    pub ns: Option<String>,
    pub context: Option<ContextId>,
    pub props_data: Map<String, Value>,
    pub listeners: BTreeMap<String, Vec<Listener>>,
    /// Render children handed to the component as slot content.
    pub children: Vec<VNode>,
    /// Tag the component was referenced by in the parent template.
    pub component_tag: Option<String>,
}

/// Event callback attached through `on`/`native_on`.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&[Value])>);

impl Listener {
    pub fn new(f: impl Fn(&[Value]) + 'static) -> Self {
        Listener(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) {
        (self.0)(args)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener")
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Slot content function invoked by the child with slot props.
#[derive(Clone)]
pub struct ScopedSlot(Rc<dyn Fn(&Value) -> Vec<VNode>>);

impl ScopedSlot {
    pub fn new(f: impl Fn(&Value) -> Vec<VNode> + 'static) -> Self {
        ScopedSlot(Rc::new(f))
    }

    pub fn call(&self, props: &Value) -> Vec<VNode> {
        (self.0)(props)
    }
}

impl fmt::Debug for ScopedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScopedSlot")
    }
}

impl PartialEq for ScopedSlot {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VNodeDirective {
    pub name: String,
    pub value: Option<Value>,
    pub expression: Option<String>,
    pub arg: Option<String>,
    pub modifiers: Vec<String>,
}

/// Attribute, event and directive bag of a node.
///
/// Must be allocated fresh on every render; see [`VNodeData::mark_observed`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VNodeData {
    pub key: Option<Value>,
    pub is: Option<TagRef>,
    pub slot: Option<String>,
    pub reference: Option<String>,
    pub attrs: BTreeMap<String, Value>,
    pub dom_props: BTreeMap<String, Value>,
    pub static_class: Option<String>,
    pub class: Option<Value>,
    pub static_style: Option<String>,
    pub style: Option<Value>,
    pub on: BTreeMap<String, Vec<Listener>>,
    pub native_on: BTreeMap<String, Vec<Listener>>,
    pub directives: Vec<VNodeDirective>,
    pub scoped_slots: BTreeMap<String, ScopedSlot>,
    observed: bool,
}

impl VNodeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static attribute.
    pub fn set(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.attrs.insert(k.into(), Value::String(v.into()));
        self
    }

    /// Bound attribute.
    pub fn bind(mut self, k: impl Into<String>, v: Value) -> Self {
        self.attrs.insert(k.into(), v);
        self
    }

    pub fn dom_prop(mut self, k: impl Into<String>, v: Value) -> Self {
        self.dom_props.insert(k.into(), v);
        self
    }

    pub fn key(mut self, key: Value) -> Self {
        self.key = Some(key);
        self
    }

    pub fn is(mut self, tag: impl Into<TagRef>) -> Self {
        self.is = Some(tag.into());
        self
    }

    pub fn slot(mut self, name: impl Into<String>) -> Self {
        self.slot = Some(name.into());
        self
    }

    pub fn reference(mut self, name: impl Into<String>) -> Self {
        self.reference = Some(name.into());
        self
    }

    pub fn static_class(mut self, class: impl Into<String>) -> Self {
        self.static_class = Some(class.into());
        self
    }

    pub fn class(mut self, class: Value) -> Self {
        self.class = Some(class);
        self
    }

    pub fn static_style(mut self, style: impl Into<String>) -> Self {
        self.static_style = Some(style.into());
        self
    }

    pub fn style(mut self, style: Value) -> Self {
        self.style = Some(style);
        self
    }

    pub fn on(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.on.entry(event.into()).or_default().push(listener);
        self
    }

    pub fn native_on(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.native_on.entry(event.into()).or_default().push(listener);
        self
    }

    pub fn directive(mut self, directive: VNodeDirective) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn scoped_slot(mut self, name: impl Into<String>, slot: ScopedSlot) -> Self {
        self.scoped_slots.insert(name.into(), slot);
        self
    }

    /// Flags this bag as owned by the reactivity system. The element factory
    /// refuses observed data.
    pub fn mark_observed(&mut self) {
        self.observed = true;
    }

    pub fn is_observed(&self) -> bool {
        self.observed
    }
}

// Allow concise data creation
impl From<()> for VNodeData {
    fn from(_: ()) -> Self {
        VNodeData::default()
    }
}
impl From<Vec<(&str, &str)>> for VNodeData {
    fn from(v: Vec<(&str, &str)>) -> Self {
        let mut d = VNodeData::new();
        for (k, v) in v {
            d.attrs.insert(k.to_string(), Value::String(v.to_string()));
        }
        d
    }
}

/// A child as handed to the element factory, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Node(VNode),
    /// Primitive content, rendered as a text node.
    Text(String),
    /// Nested sequence, e.g. the output of a `v-for`.
    List(Vec<Child>),
    /// Default scoped slot when passed as the first child.
    Slot(ScopedSlot),
    /// `null`, `undefined` and booleans render nothing.
    Empty,
}

impl Child {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Null | Value::Bool(_) => Child::Empty,
            Value::String(s) => Child::Text(s.clone()),
            Value::Number(n) => Child::Text(n.to_string()),
            Value::Array(items) => Child::List(items.iter().map(Child::from_value).collect()),
            Value::Object(_) => Child::Text(to_display(v)),
        }
    }
}

impl From<VNode> for Child {
    fn from(v: VNode) -> Self {
        Child::Node(v)
    }
}
impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Text(s.to_string())
    }
}
impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Text(s)
    }
}
impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Child::Text(n.to_string())
    }
}
impl From<f64> for Child {
    fn from(n: f64) -> Self {
        Child::Text(n.to_string())
    }
}
impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Child::Empty
    }
}
impl From<Vec<VNode>> for Child {
    fn from(v: Vec<VNode>) -> Self {
        Child::List(v.into_iter().map(Child::Node).collect())
    }
}
impl From<Vec<Child>> for Child {
    fn from(v: Vec<Child>) -> Self {
        Child::List(v)
    }
}
impl From<ScopedSlot> for Child {
    fn from(s: ScopedSlot) -> Self {
        Child::Slot(s)
    }
}
impl From<Rendered> for Child {
    fn from(r: Rendered) -> Self {
        match r {
            Rendered::Node(n) => Child::Node(n),
            Rendered::Many(list) => list.into(),
        }
    }
}

/// Output of the element factory and of render functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Node(VNode),
    Many(Vec<VNode>),
}

impl Rendered {
    pub fn empty() -> Self {
        Rendered::Node(VNode::empty())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Rendered::Node(v) if v.is_empty())
    }

    pub fn as_node(&self) -> Option<&VNode> {
        match self {
            Rendered::Node(v) => Some(v),
            Rendered::Many(_) => None,
        }
    }

    pub fn into_node(self) -> Option<VNode> {
        match self {
            Rendered::Node(v) => Some(v),
            Rendered::Many(_) => None,
        }
    }
}

impl From<VNode> for Rendered {
    fn from(v: VNode) -> Self {
        Rendered::Node(v)
    }
}

/// Plain element without a rendering context.
pub fn h(tag: impl Into<String>, data: impl Into<VNodeData>, children: Vec<VNode>) -> VNode {
    VNode::Element {
        tag: tag.into(),
        data: Some(data.into()),
        children,
        ns: None,
        context: None,
    }
}
pub fn text(t: impl Into<String>) -> VNode {
    VNode::Text(t.into())
}
