//! Option merge strategies.
//!
//! Layers are merged parent first: the result of merging a definition chain
//! is the oldest ancestor overlaid by each descendant, then by the options
//! an instance was created with.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::Value;
use vireo_dom::platform;

use crate::debug::warn;
use crate::lifecycle::LifecycleHook;
use crate::options::{ComponentOptions, DataFn, Hook};

/// Merges `child` over `parent`.
///
/// `child.extends` and `child.mixins` are applied to `parent` first, so
/// they sit between the two layers. `for_instance` is set when `child` holds
/// the options of an instance being created.
pub fn merge_options(parent: &ComponentOptions, child: &ComponentOptions, for_instance: bool) -> ComponentOptions {
    if cfg!(debug_assertions) {
        for name in child.components.keys() {
            validate_component_name(name);
        }
    }

    let mut base = Cow::Borrowed(parent);
    if let Some(extends) = &child.extends {
        base = Cow::Owned(merge_options(&base, extends, for_instance));
    }
    for mixin in &child.mixins {
        base = Cow::Owned(merge_options(&base, mixin, for_instance));
    }
    let parent = &*base;

    if !for_instance {
        if child.el.is_some() {
            warn_instance_only("el");
        }
        if child.props_data.is_some() {
            warn_instance_only("propsData");
        }
    }

    ComponentOptions {
        name: child.name.clone().or_else(|| parent.name.clone()),
        el: child.el.clone().or_else(|| parent.el.clone()),
        props_data: child.props_data.clone().or_else(|| parent.props_data.clone()),
        data: merge_data_fn(parent.data.as_ref(), child.data.as_ref()),
        props: extend(&parent.props, &child.props),
        methods: extend(&parent.methods, &child.methods),
        computed: extend(&parent.computed, &child.computed),
        watch: merge_watch(&parent.watch, &child.watch),
        hooks: merge_hooks(&parent.hooks, &child.hooks),
        error_captured: concat_unique(&parent.error_captured, &child.error_captured),
        components: extend(&parent.components, &child.components),
        directives: extend(&parent.directives, &child.directives),
        filters: extend(&parent.filters, &child.filters),
        provide: merge_data_fn(parent.provide.as_ref(), child.provide.as_ref()),
        inject: extend(&parent.inject, &child.inject),
        render: child.render.clone().or_else(|| parent.render.clone()),
        static_render_fns: if child.static_render_fns.is_empty() {
            parent.static_render_fns.clone()
        } else {
            child.static_render_fns.clone()
        },
        template: child.template.clone().or_else(|| parent.template.clone()),
        functional: child.functional || parent.functional,
        delimiters: child.delimiters.clone().or_else(|| parent.delimiters.clone()),
        extends: None,
        mixins: Vec::new(),
    }
}

fn warn_instance_only(key: &str) {
    warn(
        &format!("option \"{key}\" can only be used during instance creation with the `new` keyword."),
        None,
    );
}

/// Parent entries overridden key by key.
fn extend<T: Clone>(parent: &BTreeMap<String, T>, child: &BTreeMap<String, T>) -> BTreeMap<String, T> {
    let mut res = parent.clone();
    res.extend(child.iter().map(|(k, v)| (k.clone(), v.clone())));
    res
}

fn merge_watch<T: Clone>(
    parent: &BTreeMap<String, Vec<T>>,
    child: &BTreeMap<String, Vec<T>>,
) -> BTreeMap<String, Vec<T>> {
    let mut res = parent.clone();
    for (key, watchers) in child {
        res.entry(key.clone()).or_default().extend(watchers.iter().cloned());
    }
    res
}

fn merge_hooks(
    parent: &BTreeMap<LifecycleHook, Vec<Hook>>,
    child: &BTreeMap<LifecycleHook, Vec<Hook>>,
) -> BTreeMap<LifecycleHook, Vec<Hook>> {
    let mut res = BTreeMap::new();
    for hook in LifecycleHook::ALL {
        let parent = parent.get(&hook).map(Vec::as_slice).unwrap_or(&[]);
        let child = child.get(&hook).map(Vec::as_slice).unwrap_or(&[]);
        if !parent.is_empty() || !child.is_empty() {
            res.insert(hook, concat_unique(parent, child));
        }
    }
    res
}

/// Parent entries then child entries, each identity kept once.
pub(crate) fn concat_unique<T: PartialEq + Clone>(parent: &[T], child: &[T]) -> Vec<T> {
    let mut res: Vec<T> = Vec::with_capacity(parent.len() + child.len());
    for item in parent.iter().chain(child) {
        if !res.contains(item) {
            res.push(item.clone());
        }
    }
    res
}

/// Both factories run; the child's keys win and nested objects merge.
fn merge_data_fn(parent: Option<&DataFn>, child: Option<&DataFn>) -> Option<DataFn> {
    match (parent, child) {
        (None, child) => child.cloned(),
        (parent, None) => parent.cloned(),
        (Some(parent), Some(child)) => {
            let (parent, child) = (parent.clone(), child.clone());
            Some(DataFn::new(move |vm| {
                let own = (child.0)(vm)?;
                let inherited = (parent.0)(vm)?;
                Ok(merge_data(own, &inherited))
            }))
        }
    }
}

/// Fills keys missing from `to` with the ones in `from`, recursing into
/// objects present on both sides.
pub fn merge_data(to: Value, from: &Value) -> Value {
    match (to, from) {
        (Value::Object(mut to), Value::Object(from)) => {
            for (key, from_value) in from {
                let merged = match to.remove(key) {
                    None => from_value.clone(),
                    Some(to_value @ Value::Object(_)) if from_value.is_object() => {
                        merge_data(to_value, from_value)
                    }
                    Some(to_value) => to_value,
                };
                to.insert(key.clone(), merged);
            }
            Value::Object(to)
        }
        (to, _) => to,
    }
}

/// Warns and returns false for names that cannot be registered.
pub fn validate_component_name(name: &str) -> bool {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_') || !c.is_ascii());
    if !valid {
        warn(
            &format!(
                "Invalid component name: \"{name}\". Component names should conform to valid \
                 custom element name in html5 specification."
            ),
            None,
        );
        return false;
    }
    let lower = name.to_lowercase();
    if lower == "slot" || lower == "component" || platform::is_reserved_tag(name) {
        warn(
            &format!("Do not use built-in or reserved HTML elements as component id: {name}"),
            None,
        );
        return false;
    }
    true
}
