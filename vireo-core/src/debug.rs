//! Runtime warnings and error routing.

use tracing::{error, info, warn as trace_warn};

use crate::config;
use crate::instance::Instance;

/// Reports a diagnostic. No-op in release builds or when `config.silent` is
/// set; goes to the installed warn handler or to `tracing`.
pub fn warn(msg: &str, vm: Option<&Instance>) {
    if !cfg!(debug_assertions) {
        return;
    }
    let config = config::get();
    if config.silent {
        return;
    }
    let trace = vm.map(generate_component_trace).unwrap_or_default();
    match &config.warn_handler {
        Some(handler) => handler(msg, &trace),
        None => trace_warn!(target: "vireo", "{msg}{trace}"),
    }
}

/// Softer diagnostic: usage that works but is likely unintended.
pub fn tip(msg: &str, vm: Option<&Instance>) {
    if !cfg!(debug_assertions) || config::get().silent {
        return;
    }
    let trace = vm.map(generate_component_trace).unwrap_or_default();
    info!(target: "vireo", "tip: {msg}{trace}");
}

/// `<Root>`, `<MyButton>`, or `<Anonymous>`.
pub fn format_component_name(vm: &Instance) -> String {
    if vm.parent().is_none() {
        return "<Root>".into();
    }
    let name = vm
        .options()
        .name
        .clone()
        .or_else(|| vm.component_tag().map(str::to_string));
    match name {
        Some(name) => format!("<{}>", classify(&name)),
        None => "<Anonymous>".into(),
    }
}

fn classify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for ch in name.chars() {
        if ch == '-' || ch == '_' {
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

/// The chain of components from `vm` up to the root.
pub fn generate_component_trace(vm: &Instance) -> String {
    let mut tree = Vec::new();
    let mut current = Some(vm.clone());
    while let Some(vm) = current {
        tree.push(format_component_name(&vm));
        current = vm.parent();
    }
    if tree.len() == 1 {
        return format!("\n\n(found in {})", tree[0]);
    }
    let lines: Vec<String> = tree
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let indent = if i == 0 {
                "---> ".to_string()
            } else {
                " ".repeat(5 + i * 2)
            };
            format!("{indent}{name}")
        })
        .collect();
    format!("\n\nfound in\n\n{}", lines.join("\n"))
}

/// Routes an error from user code through the `error_captured` hooks of the
/// ancestors (a hook returning `false` stops propagation), then to the
/// global handler.
pub fn handle_error(err: anyhow::Error, vm: Option<&Instance>, info: &str) {
    if let Some(vm) = vm {
        let mut current = vm.parent();
        while let Some(ancestor) = current {
            for hook in &ancestor.options().error_captured {
                if !(hook.0)(&err, vm, info) {
                    return;
                }
            }
            current = ancestor.parent();
        }
    }
    global_handle_error(err, vm, info);
}

fn global_handle_error(err: anyhow::Error, vm: Option<&Instance>, info: &str) {
    if let Some(handler) = config::get().error_handler {
        handler(&err, vm, info);
        return;
    }
    warn(&format!("Error in {info}: \"{err}\""), vm);
    error!(target: "vireo", info, "{err:#}");
}

/// Runs a fallible callback, reporting its failure instead of returning it.
pub fn invoke_with_error_handling<T>(
    f: impl FnOnce() -> anyhow::Result<T>,
    vm: Option<&Instance>,
    info: &str,
) -> Option<T> {
    match f() {
        Ok(v) => Some(v),
        Err(err) => {
            handle_error(err, vm, info);
            None
        }
    }
}
