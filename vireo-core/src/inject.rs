//! Dependency injection between ancestors and descendants.

use serde_json::{Map, Value};

use crate::debug::{invoke_with_error_handling, warn};
use crate::instance::Instance;

pub(crate) fn init_injections(vm: &Instance) {
    let resolved = resolve_inject(vm);
    *vm.0.injections.borrow_mut() = resolved;
}

/// Looks every injection up in the nearest ancestor providing its `from`
/// key, falling back to its default.
pub fn resolve_inject(vm: &Instance) -> Map<String, Value> {
    let mut result = Map::new();
    for (key, inject) in &vm.options().inject {
        let mut source = vm.parent();
        let mut found = None;
        while let Some(ancestor) = source {
            if let Some(v) = ancestor.0.provided.borrow().get(&inject.from) {
                found = Some(v.clone());
                break;
            }
            source = ancestor.parent();
        }
        let value = match (found, &inject.default) {
            (Some(v), _) => v,
            (None, Some(default)) => default.produce(),
            (None, None) => {
                warn(&format!("Injection \"{key}\" not found"), Some(vm));
                continue;
            }
        };
        result.insert(key.clone(), value);
    }
    result
}

pub(crate) fn init_provide(vm: &Instance) {
    let Some(provide) = vm.options().provide.clone() else {
        return;
    };
    let provided = invoke_with_error_handling(|| (provide.0)(vm), Some(vm), "provide()");
    match provided {
        Some(Value::Object(map)) => *vm.0.provided.borrow_mut() = map,
        Some(_) => warn("provide functions should return an object.", Some(vm)),
        None => {}
    }
}

impl Instance {
    /// Values this instance provides to its descendants.
    pub fn provided(&self) -> Map<String, Value> {
        self.0.provided.borrow().clone()
    }

    pub fn injections(&self) -> Map<String, Value> {
        self.0.injections.borrow().clone()
    }
}
