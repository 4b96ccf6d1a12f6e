//! Read-marking seam towards a reactivity system.
//!
//! The runtime does not track dependencies itself. An installed
//! [`ReadTracker`] is told about every nested value a render reads deeply
//! (style and class bindings), so a dependency tracker can subscribe the
//! rendering instance to them.

use serde_json::Value;

pub trait ReadTracker {
    fn mark_read(&self, value: &Value);
}

/// Visits `value` and every array element and object member below it.
pub fn traverse(value: &Value, visit: &mut dyn FnMut(&Value)) {
    visit(value);
    match value {
        Value::Array(items) => {
            for item in items {
                traverse(item, visit);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                traverse(item, visit);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::traverse;
    use serde_json::json;

    #[test]
    fn traverse_visits_nested_values() {
        let mut seen = 0;
        traverse(&json!({"a": [1, {"b": 2}], "c": "x"}), &mut |_| seen += 1);
        // root, array, 1, inner object, 2, "x"
        assert_eq!(seen, 6);
    }
}
