use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::normalize::{Normalization, apply_ns, into_vnodes, normalize_children, simple_normalize_children};
use crate::platform;
use crate::{Child, ComponentVNode, ContextId, Rendered, VNode, VNodeData};

/// Component definition as seen by the element factory.
///
/// The component runtime implements this for its definitions; the factory
/// only needs identity, naming and declared props.
pub trait ComponentCtor: fmt::Debug {
    fn cid(&self) -> u32;
    fn name(&self) -> Option<String>;
    fn prop_names(&self) -> Vec<String>;

    fn is_functional(&self) -> bool {
        false
    }

    /// Renders a functional component in place. Only called when
    /// [`ComponentCtor::is_functional`] is true.
    fn render_functional(&self, _call: FunctionalCall<'_>) -> Option<Rendered> {
        None
    }
}

pub struct FunctionalCall<'a> {
    pub props: Map<String, Value>,
    pub data: VNodeData,
    pub children: Vec<VNode>,
    pub parent: &'a dyn RenderContext,
}

/// Shared handle to a component definition, compared by identity.
#[derive(Clone)]
pub struct CtorRef(pub Rc<dyn ComponentCtor>);

impl CtorRef {
    pub fn new(ctor: Rc<dyn ComponentCtor>) -> Self {
        CtorRef(ctor)
    }
}

impl std::ops::Deref for CtorRef {
    type Target = dyn ComponentCtor;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for CtorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CtorRef(cid={})", self.0.cid())
    }
}

impl PartialEq for CtorRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

/// What a render call asks for: a tag name, a component, or a runtime value
/// (`:is` bindings) that still has to be resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum TagRef {
    Html(String),
    Component(CtorRef),
    Dynamic(Value),
}

impl TagRef {
    /// Collapses `Dynamic` and drops falsy tags.
    fn resolved(self) -> Option<TagRef> {
        match self {
            TagRef::Html(t) if t.is_empty() => None,
            TagRef::Dynamic(Value::String(t)) if !t.is_empty() => Some(TagRef::Html(t)),
            TagRef::Dynamic(_) => None,
            other => Some(other),
        }
    }
}

impl From<&str> for TagRef {
    fn from(t: &str) -> Self {
        TagRef::Html(t.to_string())
    }
}
impl From<String> for TagRef {
    fn from(t: String) -> Self {
        TagRef::Html(t)
    }
}
impl From<CtorRef> for TagRef {
    fn from(c: CtorRef) -> Self {
        TagRef::Component(c)
    }
}
impl From<Value> for TagRef {
    fn from(v: Value) -> Self {
        TagRef::Dynamic(v)
    }
}

/// Third argument of [`create_element`]: either the data bag or, when the
/// caller skipped it, the children.
#[derive(Debug, Clone, PartialEq)]
pub enum DataArg {
    Data(VNodeData),
    Children(Vec<Child>),
    Primitive(Value),
    None,
}

impl From<VNodeData> for DataArg {
    fn from(d: VNodeData) -> Self {
        DataArg::Data(d)
    }
}
impl From<Option<VNodeData>> for DataArg {
    fn from(d: Option<VNodeData>) -> Self {
        d.map_or(DataArg::None, DataArg::Data)
    }
}
impl From<()> for DataArg {
    fn from(_: ()) -> Self {
        DataArg::None
    }
}
impl From<Vec<Child>> for DataArg {
    fn from(c: Vec<Child>) -> Self {
        DataArg::Children(c)
    }
}
impl From<&str> for DataArg {
    fn from(s: &str) -> Self {
        DataArg::Primitive(Value::String(s.to_string()))
    }
}

/// The instance a render function runs against.
pub trait RenderContext {
    fn context_id(&self) -> ContextId;

    /// Namespace of the placeholder node this context renders for.
    fn placeholder_ns(&self) -> Option<String>;

    /// Looks the tag up in the context's component registry.
    fn resolve_component(&self, tag: &str) -> Option<CtorRef>;

    /// Read-marking capability: registers a dependency on every nested
    /// property of `value` for the rendering owner.
    fn mark_read(&self, value: &Value);

    fn warn(&self, msg: &str);

    fn is_reserved_tag(&self, tag: &str) -> bool {
        platform::is_reserved_tag(tag)
    }

    fn get_tag_namespace(&self, tag: &str) -> Option<String> {
        platform::get_tag_namespace(tag).map(str::to_string)
    }
}

/// Builds a node for `tag`.
///
/// `data` may carry the children when the caller has no data bag; any
/// `children` passed alongside are then ignored. `always_normalize` forces
/// [`Normalization::Always`].
pub fn create_element(
    context: &dyn RenderContext,
    tag: Option<TagRef>,
    data: impl Into<DataArg>,
    children: Option<Vec<Child>>,
    normalization: Normalization,
    always_normalize: bool,
) -> Rendered {
    let (data, children) = match data.into() {
        DataArg::Data(d) => (Some(d), children),
        DataArg::None => (None, children),
        DataArg::Children(c) => (None, Some(c)),
        DataArg::Primitive(v) => (None, Some(vec![Child::from_value(&v)])),
    };
    let normalization = if always_normalize {
        Normalization::Always
    } else {
        normalization
    };
    create_element_inner(context, tag, data, children, normalization)
}

fn create_element_inner(
    context: &dyn RenderContext,
    tag: Option<TagRef>,
    mut data: Option<VNodeData>,
    children: Option<Vec<Child>>,
    normalization: Normalization,
) -> Rendered {
    if let Some(d) = &data {
        if d.is_observed() {
            if cfg!(debug_assertions) {
                context.warn(&format!(
                    "Avoid using observed data object as vnode data: {d:?}\n\
                     Always create fresh vnode data objects in each render!"
                ));
            }
            return Rendered::empty();
        }
    }
    // object syntax in v-bind
    let tag = match data.as_ref().and_then(|d| d.is.clone()) {
        Some(is) => Some(is),
        None => tag,
    };
    // `:is` bound to a falsy value
    let Some(tag) = tag.and_then(TagRef::resolved) else {
        return Rendered::empty();
    };

    if cfg!(debug_assertions) {
        if let Some(key) = data.as_ref().and_then(|d| d.key.as_ref()) {
            if !is_primitive(key) && !is_host_binding(key) {
                context.warn(
                    "Avoid using non-primitive value as key, use string/number value instead.",
                );
            }
        }
    }

    let mut children = children.unwrap_or_default();
    if let Some(Child::Slot(slot)) = children.first() {
        let slot = slot.clone();
        data.get_or_insert_with(VNodeData::default)
            .scoped_slots
            .insert("default".to_string(), slot);
        children.clear();
    }
    let children = match normalization {
        Normalization::Always => normalize_children(children),
        Normalization::Simple => simple_normalize_children(children),
        Normalization::None => into_vnodes(children),
    };

    let (rendered, ns) = match tag {
        TagRef::Html(tag) => {
            let ns = context
                .placeholder_ns()
                .or_else(|| context.get_tag_namespace(&tag));
            let rendered = if context.is_reserved_tag(&tag) {
                Some(Rendered::Node(element(
                    platform::parse_platform_tag_name(&tag).to_string(),
                    data,
                    children,
                    context,
                )))
            } else if let Some(ctor) = context.resolve_component(&tag) {
                create_component(ctor, data, context, children, Some(tag))
            } else {
                // unknown or unlisted namespaced elements; a parent may still
                // assign the namespace when it normalizes children
                trace!(tag = %tag, "creating element for unknown tag");
                Some(Rendered::Node(element(tag, data, children, context)))
            };
            (rendered, ns)
        }
        TagRef::Component(ctor) => (create_component(ctor, data, context, children, None), None),
        TagRef::Dynamic(_) => (None, None),
    };

    match rendered {
        Some(Rendered::Many(list)) => Rendered::Many(list),
        Some(Rendered::Node(mut vnode)) => {
            if let Some(ns) = ns {
                apply_ns(&mut vnode, Some(ns), false);
            }
            if let Some(data) = vnode.data() {
                register_deep_bindings(data, context);
            }
            Rendered::Node(vnode)
        }
        None => Rendered::empty(),
    }
}

fn element(
    tag: String,
    data: Option<VNodeData>,
    children: Vec<VNode>,
    context: &dyn RenderContext,
) -> VNode {
    VNode::Element {
        tag,
        data,
        children,
        ns: None,
        context: Some(context.context_id()),
    }
}

fn is_primitive(v: &Value) -> bool {
    !matches!(v, Value::Object(_) | Value::Array(_))
}

fn is_host_binding(v: &Value) -> bool {
    matches!(v, Value::Object(m) if m.contains_key("@binding"))
}

// Style and class objects are often mutated by a child component; reading
// them here makes the owner re-render even though the render itself never
// touched the nested properties.
fn register_deep_bindings(data: &VNodeData, context: &dyn RenderContext) {
    if let Some(style @ (Value::Object(_) | Value::Array(_))) = &data.style {
        context.mark_read(style);
    }
    if let Some(class @ (Value::Object(_) | Value::Array(_))) = &data.class {
        context.mark_read(class);
    }
}

/// Builds the placeholder node for a component usage.
///
/// Functional components render in place and may yield several nodes.
pub fn create_component(
    ctor: CtorRef,
    data: Option<VNodeData>,
    context: &dyn RenderContext,
    children: Vec<VNode>,
    tag: Option<String>,
) -> Option<Rendered> {
    let mut data = data.unwrap_or_default();
    let props_data = extract_props(&mut data, &ctor.prop_names());

    if ctor.is_functional() {
        return ctor.render_functional(FunctionalCall {
            props: props_data,
            data,
            children,
            parent: context,
        });
    }

    // component listeners are emitted by the child, native ones go to the
    // root element
    let listeners = std::mem::take(&mut data.on);
    data.on = std::mem::take(&mut data.native_on);

    let name = ctor.name().or_else(|| tag.clone());
    let vtag = match &name {
        Some(name) => format!("vue-component-{}-{}", ctor.cid(), name),
        None => format!("vue-component-{}", ctor.cid()),
    };
    Some(Rendered::Node(VNode::Component(ComponentVNode {
        tag: vtag,
        ctor,
        data,
        ns: None,
        context: Some(context.context_id()),
        props_data,
        listeners,
        children,
        component_tag: tag,
    })))
}

/// Pulls declared props out of `attrs` (removing them) and `dom_props`
/// (keeping them). Hyphenated spellings are accepted.
fn extract_props(data: &mut VNodeData, prop_names: &[String]) -> Map<String, Value> {
    let mut res = Map::new();
    for key in prop_names {
        let alt = hyphenate(key);
        if let Some(v) = lookup(&data.dom_props, key, &alt) {
            res.insert(key.clone(), v.clone());
            continue;
        }
        let hit = if data.attrs.contains_key(key) {
            Some(key.clone())
        } else if data.attrs.contains_key(&alt) {
            Some(alt)
        } else {
            None
        };
        if let Some(v) = hit.and_then(|k| data.attrs.remove(&k)) {
            res.insert(key.clone(), v);
        }
    }
    res
}

fn lookup<'a>(map: &'a BTreeMap<String, Value>, key: &str, alt: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| map.get(alt))
}

/// Resolves a registered asset by `id`, its camelized form, or the
/// capitalized camelized form.
pub fn resolve_asset<'a, T>(assets: &'a BTreeMap<String, T>, id: &str) -> Option<&'a T> {
    if let Some(hit) = assets.get(id) {
        return Some(hit);
    }
    let camelized = camelize(id);
    if let Some(hit) = assets.get(&camelized) {
        return Some(hit);
    }
    assets.get(&capitalize(&camelized))
}

pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for ch in s.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn hyphenate(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, ch) in s.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camelize_and_capitalize() {
        assert_eq!(camelize("my-button"), "myButton");
        assert_eq!(capitalize("myButton"), "MyButton");
        assert_eq!(hyphenate("myButton"), "my-button");
    }

    #[test]
    fn resolve_asset_tries_all_spellings() {
        let mut assets = BTreeMap::new();
        assets.insert("MyButton".to_string(), 1);
        assets.insert("fancyInput".to_string(), 2);
        assert_eq!(resolve_asset(&assets, "my-button"), Some(&1));
        assert_eq!(resolve_asset(&assets, "fancy-input"), Some(&2));
        assert_eq!(resolve_asset(&assets, "nope"), None);
    }

    #[test]
    fn extract_props_prefers_dom_props_and_strips_attrs() {
        let mut data = VNodeData::new()
            .set("user-name", "ada")
            .set("title", "x")
            .dom_prop("count", Value::from(3));
        let props = extract_props(&mut data, &["userName".into(), "count".into()]);
        assert_eq!(props.get("userName"), Some(&Value::from("ada")));
        assert_eq!(props.get("count"), Some(&Value::from(3)));
        assert!(!data.attrs.contains_key("user-name"));
        assert!(data.attrs.contains_key("title"));
        assert!(data.dom_props.contains_key("count"));
    }
}
