//! Render state and the API compiled render functions call.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use vireo_dom::expr::split_args;
use vireo_dom::{
    Child, ContextId, CtorRef, DataArg, Expr, Listener, Normalization, RenderContext, Rendered,
    ScopedSlot, TagRef, VNode, VNodeData, normalize_children, resolve_asset,
};

use crate::debug::{invoke_with_error_handling, warn};
use crate::instance::Instance;
use crate::observer::traverse;
use crate::options::Filter;
use crate::state::is_reserved;

#[derive(Default)]
pub(crate) struct RenderState {
    pub(crate) el: Option<String>,
    pub(crate) vnode: Option<VNode>,
    pub(crate) static_trees: Vec<Option<Rendered>>,
    pub(crate) slots: BTreeMap<String, Vec<VNode>>,
    pub(crate) scoped_slots: BTreeMap<String, ScopedSlot>,
    pub(crate) attrs: BTreeMap<String, Value>,
    pub(crate) listeners: BTreeMap<String, Vec<Listener>>,
}

/// Local names introduced by `v-for` and event handlers, innermost first.
#[derive(Clone, Default)]
pub struct Scope(Option<Rc<Frame>>);

struct Frame {
    name: String,
    value: Value,
    parent: Scope,
}

impl Scope {
    pub fn root() -> Scope {
        Scope(None)
    }

    pub fn with(&self, name: &str, value: Value) -> Scope {
        Scope(Some(Rc::new(Frame {
            name: name.to_string(),
            value,
            parent: self.clone(),
        })))
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut frame = self.0.as_deref();
        while let Some(f) = frame {
            if f.name == name {
                return Some(&f.value);
            }
            frame = f.parent.0.as_deref();
        }
        None
    }
}

pub(crate) fn init_render(vm: &Instance) {
    let placeholder = vm.0.parent_vnode.as_ref();
    let context = placeholder.and_then(|p| p.context);
    let mut state = vm.0.render_state.borrow_mut();
    state.vnode = None;
    state.static_trees.clear();
    state.slots = resolve_slots(&vm.0.render_children, context);
    state.scoped_slots.clear();
    state.attrs = placeholder.map(|p| p.data.attrs.clone()).unwrap_or_default();
    state.listeners = vm.0.parent_listeners.clone();
}

/// Groups render children into named slots. A `slot` name is honored only
/// on nodes rendered by the same context as the placeholder; slots holding
/// nothing but whitespace are dropped.
pub fn resolve_slots(children: &[VNode], context: Option<ContextId>) -> BTreeMap<String, Vec<VNode>> {
    let mut slots: BTreeMap<String, Vec<VNode>> = BTreeMap::new();
    for child in children {
        let mut child = child.clone();
        let node_context = match &child {
            VNode::Element { context, .. } => *context,
            VNode::Component(c) => c.context,
            VNode::Text(_) | VNode::Comment(_) => None,
        };
        let name = match &mut child {
            VNode::Element { data: Some(data), .. } => {
                data.attrs.remove("slot");
                data.slot.clone()
            }
            VNode::Component(c) => {
                c.data.attrs.remove("slot");
                c.data.slot.clone()
            }
            _ => None,
        };
        match name {
            Some(name) if node_context == context => {
                let slot = slots.entry(name).or_default();
                if child.tag() == Some("template") {
                    slot.extend(child.children().iter().cloned());
                } else {
                    slot.push(child);
                }
            }
            _ => slots.entry("default".into()).or_default().push(child),
        }
    }
    slots.retain(|_, nodes| !nodes.iter().all(VNode::is_whitespace));
    slots
}

impl RenderContext for Instance {
    fn context_id(&self) -> ContextId {
        ContextId(self.uid())
    }

    fn placeholder_ns(&self) -> Option<String> {
        self.0.parent_vnode.as_ref().and_then(|p| p.ns.clone())
    }

    fn resolve_component(&self, tag: &str) -> Option<CtorRef> {
        resolve_asset(&self.options().components, tag).map(|d| d.as_ctor())
    }

    fn mark_read(&self, value: &Value) {
        let tracker = self.0.read_tracker.borrow().clone();
        if let Some(tracker) = tracker {
            traverse(value, &mut |v| tracker.mark_read(v));
        }
    }

    fn warn(&self, msg: &str) {
        warn(msg, Some(self));
    }
}

impl Instance {
    /// Runs the render function and returns its single root.
    pub fn render(&self) -> VNode {
        if let Some(placeholder) = &self.0.parent_vnode {
            self.0.render_state.borrow_mut().scoped_slots = placeholder.data.scoped_slots.clone();
        }
        let Some(render) = self.options().render.clone() else {
            return VNode::empty();
        };
        match (render.0)(self) {
            Rendered::Node(vnode) => vnode,
            Rendered::Many(mut nodes) if nodes.len() == 1 => nodes.remove(0),
            Rendered::Many(_) => {
                warn(
                    "Multiple root nodes returned from render function. Render function should \
                     return a single root node.",
                    Some(self),
                );
                VNode::empty()
            }
        }
    }

    /// Root child of a compiled render function as its result.
    pub fn root(&self, child: Child) -> Rendered {
        match child {
            Child::Node(node) => Rendered::Node(node),
            Child::Text(t) => Rendered::Node(VNode::Text(t)),
            Child::Empty | Child::Slot(_) => Rendered::empty(),
            Child::List(items) => {
                let mut nodes = normalize_children(items);
                match nodes.len() {
                    0 => Rendered::empty(),
                    1 => Rendered::Node(nodes.remove(0)),
                    _ => Rendered::Many(nodes),
                }
            }
        }
    }

    /// Element factory for compiled templates.
    pub fn c(
        &self,
        tag: impl Into<TagRef>,
        data: VNodeData,
        children: Vec<Child>,
        normalization: Normalization,
    ) -> Rendered {
        vireo_dom::create_element(self, Some(tag.into()), data, Some(children), normalization, false)
    }

    /// Element factory for hand-written render functions; children are
    /// always fully normalized.
    pub fn create_element(
        &self,
        tag: Option<TagRef>,
        data: impl Into<DataArg>,
        children: Option<Vec<Child>>,
    ) -> Rendered {
        vireo_dom::create_element(self, tag, data, children, Normalization::Always, true)
    }

    /// Hoisted static subtree `index`, rendered once and reused.
    pub fn static_tree(&self, index: usize) -> Rendered {
        if let Some(Some(tree)) = self.0.render_state.borrow().static_trees.get(index) {
            return tree.clone();
        }
        let Some(render) = self.options().static_render_fns.get(index).cloned() else {
            warn(&format!("Missing static render function {index}."), Some(self));
            return Rendered::empty();
        };
        let tree = (render.0)(self);
        let mut state = self.0.render_state.borrow_mut();
        if state.static_trees.len() <= index {
            state.static_trees.resize(index + 1, None);
        }
        state.static_trees[index] = Some(tree.clone());
        tree
    }

    /// Content for `<slot name>`: the parent's scoped slot, its plain slot
    /// content, or the fallback.
    pub fn render_slot(&self, name: &str, fallback: Vec<Child>) -> Child {
        let scoped = self.0.render_state.borrow().scoped_slots.get(name).cloned();
        if let Some(slot) = scoped {
            let nodes = slot.call(&Value::Object(Map::new()));
            if !nodes.is_empty() {
                return Child::from(nodes);
            }
        }
        let nodes = self.0.render_state.borrow().slots.get(name).cloned();
        match nodes {
            Some(nodes) if !nodes.is_empty() => Child::from(nodes),
            _ => Child::List(fallback),
        }
    }

    /// `v-for` over arrays, objects (value, key), numbers (1..=n) and
    /// strings (characters).
    pub fn render_list(&self, source: &Value, mut item: impl FnMut(Value, Value, usize) -> Child) -> Vec<Child> {
        match source {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| item(v.clone(), Value::from(i), i))
                .collect(),
            Value::Object(map) => map
                .iter()
                .enumerate()
                .map(|(i, (k, v))| item(v.clone(), Value::from(k.as_str()), i))
                .collect(),
            Value::Number(n) => {
                let count = n.as_u64().unwrap_or(0) as usize;
                (0..count).map(|i| item(Value::from(i + 1), Value::from(i), i)).collect()
            }
            Value::String(s) => s
                .chars()
                .enumerate()
                .map(|(i, ch)| item(Value::from(ch.to_string()), Value::from(i), i))
                .collect(),
            Value::Null | Value::Bool(_) => Vec::new(),
        }
    }

    /// Evaluates a template expression against the scope, then the
    /// instance.
    pub fn resolve_in(&self, scope: &Scope, expr: &str) -> Value {
        match Expr::parse(expr) {
            Ok(parsed) => parsed.eval(&|name: &str| self.lookup_in(scope, name)),
            Err(err) => {
                warn(
                    &format!("Error in render: invalid expression \"{expr}\": {err}"),
                    Some(self),
                );
                Value::Null
            }
        }
    }

    pub fn resolve(&self, expr: &str) -> Value {
        self.resolve_in(&Scope::root(), expr)
    }

    pub fn to_display(&self, value: &Value) -> String {
        vireo_dom::to_display(value)
    }

    /// Event listener for a `v-on` handler: a method name, or a call whose
    /// arguments may use `$event`.
    pub fn listener(&self, scope: &Scope, handler: &str) -> Listener {
        let vm = self.downgrade();
        let scope = scope.clone();
        let handler = handler.trim().to_string();
        Listener::new(move |args| {
            if let Some(vm) = vm.upgrade() {
                vm.invoke_handler(&scope, &handler, args);
            }
        })
    }

    fn invoke_handler(&self, scope: &Scope, handler: &str, args: &[Value]) {
        let event = args.first().cloned().unwrap_or(Value::Null);
        let scope = scope.with("$event", event);
        if let Some((name, arg_src)) = split_call(handler) {
            let call_args: Vec<Value> = split_args(arg_src)
                .into_iter()
                .map(|arg| self.resolve_in(&scope, arg.trim()))
                .collect();
            self.call_handler(name, &call_args);
        } else if is_identifier(handler) {
            self.call_handler(handler, args);
        } else {
            warn(&format!("Invalid handler for event: \"{handler}\""), Some(self));
        }
    }

    fn call_handler(&self, name: &str, args: &[Value]) {
        match self.method(name) {
            Some(method) => {
                invoke_with_error_handling(|| (method.0)(self, args), Some(self), "v-on handler");
            }
            None => warn(
                &format!("Invalid handler for event: method \"{name}\" is not defined"),
                Some(self),
            ),
        }
    }

    fn lookup_in(&self, scope: &Scope, name: &str) -> Option<Value> {
        if let Some(v) = scope.lookup(name) {
            return Some(v.clone());
        }
        match name {
            "$data" => return Some(Value::Object(self.data())),
            "$props" => return Some(Value::Object(self.props())),
            "$attrs" => return Some(Value::Object(self.attrs().into_iter().collect())),
            _ => {}
        }
        let found = self.get(name);
        if found.is_none() && self.0.render_proxy {
            self.warn_non_present(name);
        }
        found
    }

    fn warn_non_present(&self, key: &str) {
        let in_data = self.0.state.borrow().data.contains_key(key);
        if in_data && is_reserved(key) {
            warn(
                &format!(
                    "Property \"{key}\" must be accessed with \"$data.{key}\" because properties \
                     starting with \"$\" or \"_\" are not proxied on the instance to prevent \
                     conflicts with internals."
                ),
                Some(self),
            );
        } else if !key.starts_with('_') {
            warn(
                &format!(
                    "Property or method \"{key}\" is not defined on the instance but referenced \
                     during render. Make sure that this property is declared, either in the data \
                     option or as a prop."
                ),
                Some(self),
            );
        }
    }

    pub fn slots(&self) -> BTreeMap<String, Vec<VNode>> {
        self.0.render_state.borrow().slots.clone()
    }

    pub fn scoped_slots(&self) -> BTreeMap<String, ScopedSlot> {
        self.0.render_state.borrow().scoped_slots.clone()
    }

    /// Placeholder attributes that were not declared as props.
    pub fn attrs(&self) -> BTreeMap<String, Value> {
        self.0.render_state.borrow().attrs.clone()
    }

    /// Component listeners attached by the parent.
    pub fn listeners(&self) -> BTreeMap<String, Vec<Listener>> {
        self.0.render_state.borrow().listeners.clone()
    }

    pub fn resolve_filter(&self, id: &str) -> Option<Filter> {
        let found = resolve_asset(&self.options().filters, id).cloned();
        if found.is_none() {
            warn(&format!("Failed to resolve filter: {id}"), Some(self));
        }
        found
    }
}

/// `name(args)` into its callee and the argument source.
fn split_call(handler: &str) -> Option<(&str, &str)> {
    let open = handler.find('(')?;
    let inner = handler.strip_suffix(')')?;
    let name = handler[..open].trim();
    is_identifier(name).then(|| (name, &inner[open + 1..]))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_shadows_outer_names() {
        let outer = Scope::root().with("item", Value::from(1));
        let inner = outer.with("item", Value::from(2)).with("i", Value::from(0));
        assert_eq!(inner.lookup("item"), Some(&Value::from(2)));
        assert_eq!(outer.lookup("item"), Some(&Value::from(1)));
        assert_eq!(inner.lookup("missing"), None);
    }

    #[test]
    fn handler_calls_are_split() {
        assert_eq!(split_call("select(item, $event)"), Some(("select", "item, $event")));
        assert_eq!(split_call("go()"), Some(("go", "")));
        assert_eq!(split_call("a.b(1)"), None);
        assert_eq!(split_call("go"), None);
    }
}
