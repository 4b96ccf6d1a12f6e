//! Component instances and their initialization.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info, info_span};
use vireo_dom::{ComponentVNode, FunctionalCall, Listener, Rendered, VNode};

use crate::config;
use crate::debug::warn;
use crate::definition::ComponentDefinition;
use crate::events::{Handler, init_events};
use crate::inject::{init_injections, init_provide};
use crate::lifecycle::{LifecycleHook, LifecycleState, call_hook, init_lifecycle};
use crate::merge::merge_options;
use crate::observer::ReadTracker;
use crate::options::{ComponentOptions, InternalComponentOptions};
use crate::render::{RenderState, init_render};
use crate::state::{State, init_props, init_state};

thread_local! {
    static NEXT_UID: Cell<u64> = const { Cell::new(0) };
}

fn next_uid() -> u64 {
    NEXT_UID.with(|n| {
        let uid = n.get();
        n.set(uid + 1);
        uid
    })
}

/// A live component instance. Cloning shares the instance.
#[derive(Clone)]
pub struct Instance(pub(crate) Rc<InstanceInner>);

/// Non-owning handle, used for parent links and listener closures.
#[derive(Clone)]
pub struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.0.upgrade().map(Instance)
    }
}

pub(crate) struct InstanceInner {
    pub(crate) uid: u64,
    pub(crate) managed: bool,
    pub(crate) definition: ComponentDefinition,
    pub(crate) options: Rc<ComponentOptions>,
    pub(crate) self_ref: Weak<InstanceInner>,
    /// Warn on undeclared property access during render.
    pub(crate) render_proxy: bool,

    pub(crate) parent_vnode: Option<ComponentVNode>,
    pub(crate) props_data: Option<Map<String, Value>>,
    pub(crate) parent_listeners: BTreeMap<String, Vec<Listener>>,
    pub(crate) render_children: Vec<VNode>,
    pub(crate) component_tag: Option<String>,

    pub(crate) lifecycle: RefCell<LifecycleState>,
    pub(crate) events: RefCell<BTreeMap<String, Vec<Handler>>>,
    pub(crate) has_hook_event: Cell<bool>,
    pub(crate) render_state: RefCell<RenderState>,
    pub(crate) state: RefCell<State>,
    pub(crate) injections: RefCell<Map<String, Value>>,
    pub(crate) provided: RefCell<Map<String, Value>>,
    pub(crate) read_tracker: RefCell<Option<Rc<dyn ReadTracker>>>,
}

/// Where an instance sits: the fields a parent hands its child.
#[derive(Default)]
struct Placement {
    parent: Option<Instance>,
    parent_vnode: Option<ComponentVNode>,
    props_data: Option<Map<String, Value>>,
    parent_listeners: BTreeMap<String, Vec<Listener>>,
    render_children: Vec<VNode>,
    component_tag: Option<String>,
}

impl Instance {
    /// Creates a root instance of `definition`, merging `options` over the
    /// definition's resolved options.
    pub fn new(definition: &ComponentDefinition, options: ComponentOptions) -> Instance {
        let uid = next_uid();
        let span = info_span!("init", uid);
        let _enter = span.enter();
        let started = config::get().performance.then(Instant::now);

        let placement = Placement {
            props_data: options.props_data.clone(),
            ..Default::default()
        };
        let merged = merge_options(&definition.resolve_options(), &options, true);
        let vm = Instance::build(uid, definition, Rc::new(merged), placement);
        vm.init(started)
    }

    /// Creates a child during its parent's render pass. The definition's
    /// options are shared as they are; only the placement is per instance.
    pub fn new_internal(definition: &ComponentDefinition, options: InternalComponentOptions) -> Instance {
        let uid = next_uid();
        let span = info_span!("init", uid);
        let _enter = span.enter();
        let started = config::get().performance.then(Instant::now);

        let InternalComponentOptions {
            parent,
            parent_vnode,
            render,
            static_render_fns,
        } = options;
        let mut merged = definition.options();
        if render.is_some() || static_render_fns.is_some() {
            let mut owned = ComponentOptions::clone(&merged);
            if let Some(render) = render {
                owned.render = Some(render);
            }
            if let Some(fns) = static_render_fns {
                owned.static_render_fns = fns;
            }
            merged = Rc::new(owned);
        }
        let placement = Placement {
            parent: Some(parent),
            props_data: Some(parent_vnode.props_data.clone()),
            parent_listeners: parent_vnode.listeners.clone(),
            render_children: parent_vnode.children.clone(),
            component_tag: parent_vnode.component_tag.clone(),
            parent_vnode: Some(parent_vnode),
        };
        let vm = Instance::build(uid, definition, merged, placement);
        vm.init(started)
    }

    /// Instantiates the component behind a placeholder rendered by this
    /// instance.
    pub fn create_child(&self, placeholder: &ComponentVNode) -> Option<Instance> {
        let Some(definition) = ComponentDefinition::lookup(placeholder.ctor.cid()) else {
            warn(
                &format!("Unknown component definition: {}", placeholder.tag),
                Some(self),
            );
            return None;
        };
        Some(Instance::new_internal(
            &definition,
            InternalComponentOptions {
                parent: self.clone(),
                parent_vnode: placeholder.clone(),
                render: None,
                static_render_fns: None,
            },
        ))
    }

    /// Renders a functional component. No lifecycle, events or state beyond
    /// validated props.
    pub(crate) fn functional(definition: &ComponentDefinition, call: FunctionalCall<'_>) -> Rendered {
        let placement = Placement {
            props_data: Some(call.props),
            render_children: call.children,
            ..Default::default()
        };
        let vm = Instance::build(next_uid(), definition, definition.resolve_options(), placement);
        init_render(&vm);
        {
            let mut render_state = vm.0.render_state.borrow_mut();
            render_state.attrs = call.data.attrs;
            render_state.listeners = call.data.on;
            render_state.scoped_slots = call.data.scoped_slots;
        }
        init_props(&vm);
        match vm.options().render.clone() {
            Some(render) => (render.0)(&vm),
            None => Rendered::empty(),
        }
    }

    fn build(
        uid: u64,
        definition: &ComponentDefinition,
        options: Rc<ComponentOptions>,
        placement: Placement,
    ) -> Instance {
        let Placement {
            parent,
            parent_vnode,
            props_data,
            parent_listeners,
            render_children,
            component_tag,
        } = placement;
        let vm = Instance(Rc::new_cyclic(|self_ref| InstanceInner {
            uid,
            managed: true,
            definition: definition.clone(),
            options,
            self_ref: self_ref.clone(),
            render_proxy: cfg!(debug_assertions),
            parent_vnode,
            props_data,
            parent_listeners,
            render_children,
            component_tag,
            lifecycle: RefCell::default(),
            events: RefCell::default(),
            has_hook_event: Cell::new(false),
            render_state: RefCell::default(),
            state: RefCell::default(),
            injections: RefCell::default(),
            provided: RefCell::default(),
            read_tracker: RefCell::default(),
        }));
        init_lifecycle(&vm, parent.as_ref());
        vm
    }

    fn init(self, started: Option<Instant>) -> Instance {
        init_events(&self);
        init_render(&self);
        call_hook(&self, LifecycleHook::BeforeCreate);
        init_injections(&self);
        init_state(&self);
        init_provide(&self);
        call_hook(&self, LifecycleHook::Created);

        if let Some(started) = started {
            info!(
                uid = self.uid(),
                component = %crate::debug::format_component_name(&self),
                elapsed_us = started.elapsed().as_micros() as u64,
                "init"
            );
        }
        debug!(uid = self.uid(), "initialized");

        let el = self.options().el.clone();
        if let Some(el) = el {
            self.mount(Some(&el));
        }
        self
    }

    pub fn uid(&self) -> u64 {
        self.0.uid
    }

    /// Always true: instances are managed by the runtime and never treated
    /// as plain data.
    pub fn is_managed(&self) -> bool {
        self.0.managed
    }

    /// The resolved options this instance runs under.
    pub fn options(&self) -> &ComponentOptions {
        &self.0.options
    }

    pub fn definition(&self) -> &ComponentDefinition {
        &self.0.definition
    }

    /// The instance itself, as a fresh handle.
    pub fn self_ref(&self) -> Option<Instance> {
        self.0.self_ref.upgrade().map(Instance)
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance(Rc::downgrade(&self.0))
    }

    /// Placeholder node this instance renders for, if it is a child.
    pub fn parent_vnode(&self) -> Option<&ComponentVNode> {
        self.0.parent_vnode.as_ref()
    }

    pub fn component_tag(&self) -> Option<&str> {
        self.0.component_tag.as_deref()
    }

    pub fn el(&self) -> Option<String> {
        self.0.render_state.borrow().el.clone()
    }

    /// Tree recorded by the last mount or update.
    pub fn vnode(&self) -> Option<VNode> {
        self.0.render_state.borrow().vnode.clone()
    }

    pub fn set_read_tracker(&self, tracker: Rc<dyn ReadTracker>) {
        *self.0.read_tracker.borrow_mut() = Some(tracker);
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("uid", &self.0.uid)
            .field("name", &self.0.options.name)
            .finish_non_exhaustive()
    }
}
