//! Props, methods, data, computed properties and watchers.
//!
//! Values live in plain maps; there is no dependency tracking. Watchers are
//! re-evaluated synchronously after [`Instance::set`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use vireo_dom::{Expr, hyphenate};

use crate::debug::{invoke_with_error_handling, warn};
use crate::instance::Instance;
use crate::options::{ComputedFn, DefaultValue, Method, PropOptions, PropType, Watcher};

#[derive(Default)]
pub(crate) struct State {
    pub(crate) props: Map<String, Value>,
    pub(crate) data: Map<String, Value>,
    pub(crate) methods: BTreeMap<String, Method>,
    pub(crate) computed: BTreeMap<String, ComputedFn>,
    pub(crate) watchers: Vec<ActiveWatcher>,
    next_watcher: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

#[derive(Clone)]
pub(crate) struct ActiveWatcher {
    id: WatcherId,
    source: String,
    expr: Expr,
    watcher: Watcher,
    value: Value,
}

/// Names starting with `$` or `_` belong to the runtime.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with('$') || key.starts_with('_')
}

fn is_reserved_attribute(key: &str) -> bool {
    matches!(key, "key" | "ref" | "slot" | "slot-scope" | "is")
}

pub(crate) fn init_state(vm: &Instance) {
    init_props(vm);
    init_methods(vm);
    init_data(vm);
    init_computed(vm);
    init_watch(vm);
}

pub(crate) fn init_props(vm: &Instance) {
    let props_data = vm.0.props_data.clone().unwrap_or_default();
    let mut props = Map::new();
    for (key, prop) in &vm.options().props {
        let value = validate_prop(key, prop, &props_data, vm);
        if cfg!(debug_assertions) {
            let hyphenated = hyphenate(key);
            if is_reserved_attribute(&hyphenated) {
                warn(
                    &format!(
                        "\"{hyphenated}\" is a reserved attribute and cannot be used as component prop."
                    ),
                    Some(vm),
                );
            }
        }
        props.insert(key.clone(), value);
    }
    vm.0.state.borrow_mut().props = props;
}

/// Value of prop `key`: the passed value with boolean casting applied, or
/// the default. Undefined props are `null`.
pub fn validate_prop(
    key: &str,
    prop: &PropOptions,
    props_data: &Map<String, Value>,
    vm: &Instance,
) -> Value {
    let absent = !props_data.contains_key(key);
    let mut value = props_data.get(key).cloned();
    if let Some(bool_index) = prop.types.iter().position(|t| *t == PropType::Boolean) {
        if absent && prop.default.is_none() {
            value = Some(Value::Bool(false));
        } else if let Some(Value::String(s)) = &value {
            // `<c disabled>` and `<c disabled="disabled">`
            if s.is_empty() || *s == hyphenate(key) {
                let string_index = prop.types.iter().position(|t| *t == PropType::String);
                if string_index.is_none_or(|si| bool_index < si) {
                    value = Some(Value::Bool(true));
                }
            }
        }
    }
    let value = match value {
        Some(v) => v,
        None => prop_default(key, prop, vm),
    };
    if cfg!(debug_assertions) {
        assert_prop(key, prop, &value, absent, vm);
    }
    value
}

fn prop_default(key: &str, prop: &PropOptions, vm: &Instance) -> Value {
    let Some(default) = &prop.default else {
        return Value::Null;
    };
    if let DefaultValue::Value(Value::Object(_) | Value::Array(_)) = default {
        warn(
            &format!(
                "Invalid default value for prop \"{key}\": Props with type Object/Array must use \
                 a factory function to return the default value."
            ),
            Some(vm),
        );
    }
    default.produce()
}

fn assert_prop(key: &str, prop: &PropOptions, value: &Value, absent: bool, vm: &Instance) {
    if prop.required && absent {
        warn(&format!("Missing required prop: \"{key}\""), Some(vm));
        return;
    }
    if value.is_null() && !prop.required {
        return;
    }
    if !prop.types.is_empty() && !prop.types.iter().any(|t| t.matches(value)) {
        let expected: Vec<&str> = prop.types.iter().map(|t| t.name()).collect();
        warn(
            &format!(
                "Invalid prop: type check failed for prop \"{key}\". Expected {}, got {} with value {value}.",
                expected.join(", "),
                type_name(value),
            ),
            Some(vm),
        );
        return;
    }
    if let Some(validator) = &prop.validator {
        if !(validator.0)(value) {
            warn(
                &format!("Invalid prop: custom validator check failed for prop \"{key}\"."),
                Some(vm),
            );
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

fn init_methods(vm: &Instance) {
    let options = vm.options();
    if cfg!(debug_assertions) {
        for key in options.methods.keys() {
            if options.props.contains_key(key) {
                warn(
                    &format!("Method \"{key}\" has already been defined as a prop."),
                    Some(vm),
                );
            }
            if is_reserved(key) {
                warn(
                    &format!(
                        "Method \"{key}\" conflicts with an existing instance method. Avoid \
                         defining component methods that start with _ or $."
                    ),
                    Some(vm),
                );
            }
        }
    }
    vm.0.state.borrow_mut().methods = options.methods.clone();
}

fn init_data(vm: &Instance) {
    let data = match &vm.options().data {
        Some(f) => invoke_with_error_handling(|| (f.0)(vm), Some(vm), "data()")
            .unwrap_or_else(|| Value::Object(Map::new())),
        None => Value::Object(Map::new()),
    };
    let data = match data {
        Value::Object(map) => map,
        _ => {
            warn("data functions should return an object.", Some(vm));
            Map::new()
        }
    };
    if cfg!(debug_assertions) {
        let options = vm.options();
        for key in data.keys() {
            if options.methods.contains_key(key) {
                warn(
                    &format!("Method \"{key}\" has already been defined as a data property."),
                    Some(vm),
                );
            }
            if options.props.contains_key(key) {
                warn(
                    &format!(
                        "The data property \"{key}\" is already declared as a prop. Use prop \
                         default value instead."
                    ),
                    Some(vm),
                );
            }
        }
    }
    vm.0.state.borrow_mut().data = data;
}

fn init_computed(vm: &Instance) {
    let options = vm.options();
    let mut installed = BTreeMap::new();
    for (key, getter) in &options.computed {
        let clash = {
            let state = vm.0.state.borrow();
            if state.data.contains_key(key) {
                Some("in data")
            } else if state.props.contains_key(key) {
                Some("as a prop")
            } else if state.methods.contains_key(key) {
                Some("as a method")
            } else {
                None
            }
        };
        match clash {
            None => {
                installed.insert(key.clone(), getter.clone());
            }
            Some(place) => warn(
                &format!("The computed property \"{key}\" is already defined {place}."),
                Some(vm),
            ),
        }
    }
    vm.0.state.borrow_mut().computed = installed;
}

fn init_watch(vm: &Instance) {
    for (expr, watchers) in &vm.options().watch {
        for watcher in watchers {
            vm.watch(expr, watcher.clone());
        }
    }
}

enum Target {
    Data,
    Prop,
    Missing,
}

impl Instance {
    /// Reads a declared name: props first, then data, computed properties
    /// and injections.
    pub fn get(&self, key: &str) -> Option<Value> {
        let computed = {
            let state = self.0.state.borrow();
            if let Some(v) = state.props.get(key) {
                return Some(v.clone());
            }
            if !is_reserved(key) {
                if let Some(v) = state.data.get(key) {
                    return Some(v.clone());
                }
            }
            state.computed.get(key).cloned()
        };
        if let Some(getter) = computed {
            return Some((getter.0)(self));
        }
        self.0.injections.borrow().get(key).cloned()
    }

    /// Writes a data property (or, with a warning, a prop) and runs the
    /// watchers whose value changed.
    pub fn set(&self, key: &str, value: Value) {
        let target = {
            let state = self.0.state.borrow();
            if state.data.contains_key(key) {
                Target::Data
            } else if state.props.contains_key(key) {
                Target::Prop
            } else {
                Target::Missing
            }
        };
        match target {
            Target::Data => {
                self.0.state.borrow_mut().data.insert(key.to_string(), value);
            }
            Target::Prop => {
                warn(
                    &format!(
                        "Avoid mutating a prop directly since the value will be overwritten \
                         whenever the parent component re-renders. Instead, use a data or \
                         computed property based on the prop's value. Prop being mutated: \
                         \"{key}\""
                    ),
                    Some(self),
                );
                self.0.state.borrow_mut().props.insert(key.to_string(), value);
            }
            Target::Missing => {
                warn(
                    &format!(
                        "Avoid adding properties to an instance at runtime - declare \"{key}\" \
                         upfront in the data option."
                    ),
                    Some(self),
                );
                return;
            }
        }
        self.run_watchers();
    }

    pub fn data(&self) -> Map<String, Value> {
        self.0.state.borrow().data.clone()
    }

    pub fn props(&self) -> Map<String, Value> {
        self.0.state.borrow().props.clone()
    }

    pub fn method(&self, name: &str) -> Option<Method> {
        self.0.state.borrow().methods.get(name).cloned()
    }

    /// Calls method `name`. Failures go to the error handler.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        let Some(method) = self.method(name) else {
            warn(&format!("Method \"{name}\" is not defined."), Some(self));
            return None;
        };
        invoke_with_error_handling(
            || (method.0)(self, args),
            Some(self),
            &format!("method \"{name}\""),
        )
    }

    /// Watches a path expression such as `user.name`.
    pub fn watch(&self, source: &str, watcher: Watcher) -> Option<WatcherId> {
        let Ok(expr) = Expr::parse(source) else {
            warn(
                &format!(
                    "Failed watching path: \"{source}\" Watcher only accepts simple dot-delimited \
                     paths. For full control, use a function instead."
                ),
                Some(self),
            );
            return None;
        };
        let value = expr.eval(&|name: &str| self.get(name));
        let id = {
            let mut state = self.0.state.borrow_mut();
            let id = WatcherId(state.next_watcher);
            state.next_watcher += 1;
            state.watchers.push(ActiveWatcher {
                id,
                source: source.to_string(),
                expr,
                watcher: watcher.clone(),
                value: value.clone(),
            });
            id
        };
        if watcher.immediate {
            invoke_with_error_handling(
                || (watcher.handler.0)(self, &value, &Value::Null),
                Some(self),
                &format!("callback for immediate watcher \"{source}\""),
            );
        }
        Some(id)
    }

    pub fn unwatch(&self, id: WatcherId) {
        self.0.state.borrow_mut().watchers.retain(|w| w.id != id);
    }

    fn run_watchers(&self) {
        let watchers = self.0.state.borrow().watchers.clone();
        for active in watchers {
            let value = active.expr.eval(&|name: &str| self.get(name));
            if value == active.value {
                continue;
            }
            {
                let mut state = self.0.state.borrow_mut();
                match state.watchers.iter_mut().find(|w| w.id == active.id) {
                    Some(w) => w.value = value.clone(),
                    // unwatched by an earlier callback
                    None => continue,
                }
            }
            invoke_with_error_handling(
                || (active.watcher.handler.0)(self, &value, &active.value),
                Some(self),
                &format!("callback for watcher \"{}\"", active.source),
            );
        }
    }
}
