//! Component options: the flat configuration one instance runs under.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use vireo_dom::{ComponentVNode, Rendered, VNodeDirective};

use crate::definition::ComponentDefinition;
use crate::instance::Instance;
use crate::lifecycle::LifecycleHook;

/// Declares a shared callback type compared by identity.
macro_rules! callback {
    ($(#[$meta:meta])* $name:ident: $($sig:tt)+) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(pub Rc<dyn $($sig)+>);

        impl $name {
            pub fn new<F>(f: F) -> Self
            where
                F: $($sig)+ + 'static,
            {
                $name(Rc::new(f))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Rc::ptr_eq(&self.0, &other.0)
            }
        }
    };
}

callback!(
    /// Lifecycle hook.
    Hook: Fn(&Instance) -> anyhow::Result<()>
);
callback!(
    /// `data` and `provide` factories; must produce an object.
    DataFn: Fn(&Instance) -> anyhow::Result<Value>
);
callback!(Method: Fn(&Instance, &[Value]) -> anyhow::Result<Value>);
callback!(ComputedFn: Fn(&Instance) -> Value);
callback!(
    /// Called with the new and the previous value.
    WatchHandler: Fn(&Instance, &Value, &Value) -> anyhow::Result<()>
);
callback!(
    /// Sees errors raised in descendants; returning `false` stops
    /// propagation.
    ErrorCapturedHook: Fn(&anyhow::Error, &Instance, &str) -> bool
);
callback!(RenderFn: Fn(&Instance) -> Rendered);
callback!(Filter: Fn(&Value, &[Value]) -> Value);
callback!(PropValidator: Fn(&Value) -> bool);
callback!(DefaultFactory: Fn() -> Value);
callback!(DirectiveHook: Fn(&VNodeDirective));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl PropType {
    pub fn name(self) -> &'static str {
        match self {
            PropType::String => "String",
            PropType::Number => "Number",
            PropType::Boolean => "Boolean",
            PropType::Array => "Array",
            PropType::Object => "Object",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            PropType::String => value.is_string(),
            PropType::Number => value.is_number(),
            PropType::Boolean => value.is_boolean(),
            PropType::Array => value.is_array(),
            PropType::Object => value.is_object(),
        }
    }
}

/// Default of a prop or an injection.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Value(Value),
    /// Object and array defaults should come from a factory so instances do
    /// not share them.
    Factory(DefaultFactory),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Factory(f) => (f.0)(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropOptions {
    /// Accepted types; empty accepts anything.
    pub types: Vec<PropType>,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub validator: Option<PropValidator>,
}

impl PropOptions {
    pub fn of(ty: PropType) -> Self {
        PropOptions {
            types: vec![ty],
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    pub fn default_factory(mut self, f: impl Fn() -> Value + 'static) -> Self {
        self.default = Some(DefaultValue::Factory(DefaultFactory::new(f)));
        self
    }

    pub fn validator(mut self, f: impl Fn(&Value) -> bool + 'static) -> Self {
        self.validator = Some(PropValidator::new(f));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InjectOptions {
    /// Provide key to look up; defaults to the local name.
    pub from: String,
    pub default: Option<DefaultValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Watcher {
    pub handler: WatchHandler,
    pub immediate: bool,
}

impl Watcher {
    pub fn new(handler: impl Fn(&Instance, &Value, &Value) -> anyhow::Result<()> + 'static) -> Self {
        Watcher {
            handler: WatchHandler::new(handler),
            immediate: false,
        }
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }
}

/// Hooks of a runtime directive, run by the patch step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directive {
    pub bind: Option<DirectiveHook>,
    pub inserted: Option<DirectiveHook>,
    pub update: Option<DirectiveHook>,
    pub unbind: Option<DirectiveHook>,
}

/// Configuration of a component, before and after merging.
///
/// As given to [`ComponentDefinition::extend`] or [`Instance::new`] it holds
/// one layer; after [`crate::merge_options`] it is the flat result of every
/// layer, with `extends` and `mixins` already applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentOptions {
    pub name: Option<String>,
    /// Mount target; instance creation only.
    pub el: Option<String>,
    /// Prop values; instance creation only.
    pub props_data: Option<Map<String, Value>>,
    pub data: Option<DataFn>,
    pub props: BTreeMap<String, PropOptions>,
    pub methods: BTreeMap<String, Method>,
    pub computed: BTreeMap<String, ComputedFn>,
    pub watch: BTreeMap<String, Vec<Watcher>>,
    pub hooks: BTreeMap<LifecycleHook, Vec<Hook>>,
    pub error_captured: Vec<ErrorCapturedHook>,
    pub components: BTreeMap<String, ComponentDefinition>,
    pub directives: BTreeMap<String, Directive>,
    pub filters: BTreeMap<String, Filter>,
    pub provide: Option<DataFn>,
    pub inject: BTreeMap<String, InjectOptions>,
    pub render: Option<RenderFn>,
    pub static_render_fns: Vec<RenderFn>,
    pub template: Option<String>,
    pub functional: bool,
    pub delimiters: Option<(String, String)>,
    pub extends: Option<Box<ComponentOptions>>,
    pub mixins: Vec<ComponentOptions>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn el(mut self, el: impl Into<String>) -> Self {
        self.el = Some(el.into());
        self
    }

    pub fn props_data(mut self, props: Map<String, Value>) -> Self {
        self.props_data = Some(props);
        self
    }

    pub fn data(mut self, f: impl Fn(&Instance) -> anyhow::Result<Value> + 'static) -> Self {
        self.data = Some(DataFn::new(f));
        self
    }

    pub fn prop(mut self, name: impl Into<String>, prop: PropOptions) -> Self {
        self.props.insert(name.into(), prop);
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Instance, &[Value]) -> anyhow::Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Method::new(f));
        self
    }

    pub fn computed(mut self, name: impl Into<String>, f: impl Fn(&Instance) -> Value + 'static) -> Self {
        self.computed.insert(name.into(), ComputedFn::new(f));
        self
    }

    pub fn watch(mut self, expr: impl Into<String>, watcher: Watcher) -> Self {
        self.watch.entry(expr.into()).or_default().push(watcher);
        self
    }

    pub fn hook(mut self, hook: LifecycleHook, f: impl Fn(&Instance) -> anyhow::Result<()> + 'static) -> Self {
        self.hooks.entry(hook).or_default().push(Hook::new(f));
        self
    }

    pub fn error_captured(
        mut self,
        f: impl Fn(&anyhow::Error, &Instance, &str) -> bool + 'static,
    ) -> Self {
        self.error_captured.push(ErrorCapturedHook::new(f));
        self
    }

    pub fn component(mut self, id: impl Into<String>, definition: ComponentDefinition) -> Self {
        self.components.insert(id.into(), definition);
        self
    }

    pub fn directive(mut self, id: impl Into<String>, directive: Directive) -> Self {
        self.directives.insert(id.into(), directive);
        self
    }

    pub fn filter(mut self, id: impl Into<String>, f: impl Fn(&Value, &[Value]) -> Value + 'static) -> Self {
        self.filters.insert(id.into(), Filter::new(f));
        self
    }

    pub fn provide(mut self, f: impl Fn(&Instance) -> anyhow::Result<Value> + 'static) -> Self {
        self.provide = Some(DataFn::new(f));
        self
    }

    pub fn inject(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.inject.insert(
            name.clone(),
            InjectOptions {
                from: name,
                default: None,
            },
        );
        self
    }

    pub fn inject_with(mut self, name: impl Into<String>, options: InjectOptions) -> Self {
        self.inject.insert(name.into(), options);
        self
    }

    pub fn render(mut self, f: impl Fn(&Instance) -> Rendered + 'static) -> Self {
        self.render = Some(RenderFn::new(f));
        self
    }

    pub fn static_render(mut self, f: impl Fn(&Instance) -> Rendered + 'static) -> Self {
        self.static_render_fns.push(RenderFn::new(f));
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn functional(mut self) -> Self {
        self.functional = true;
        self
    }

    pub fn extends(mut self, parent: ComponentOptions) -> Self {
        self.extends = Some(Box::new(parent));
        self
    }

    pub fn mixin(mut self, mixin: ComponentOptions) -> Self {
        self.mixins.push(mixin);
        self
    }

    pub fn hooks_of(&self, hook: LifecycleHook) -> &[Hook] {
        self.hooks.get(&hook).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Options for a child created by its parent's render pass.
///
/// Initialization takes these fields as they are and shares the
/// definition's resolved options instead of merging.
#[derive(Debug, Clone)]
pub struct InternalComponentOptions {
    pub parent: Instance,
    pub parent_vnode: ComponentVNode,
    /// Inline render function overriding the definition's.
    pub render: Option<RenderFn>,
    pub static_render_fns: Option<Vec<RenderFn>>,
}
