//! Instance event bus.

use serde_json::Value;
use vireo_dom::{Listener, hyphenate};

use crate::debug::{format_component_name, tip};
use crate::instance::Instance;

/// A registered listener. `call` differs from `listener` for `once`
/// registrations, which wrap the listener they were given.
#[derive(Clone)]
pub(crate) struct Handler {
    call: Listener,
    listener: Listener,
}

impl Handler {
    fn matches(&self, listener: &Listener) -> bool {
        &self.listener == listener || &self.call == listener
    }
}

/// Installs the listeners the parent attached on the placeholder.
pub(crate) fn init_events(vm: &Instance) {
    vm.0.events.borrow_mut().clear();
    vm.0.has_hook_event.set(false);
    for (event, listeners) in &vm.0.parent_listeners {
        // `~event` registers a one-shot listener
        let (name, once) = match event.strip_prefix('~') {
            Some(name) => (name, true),
            None => (event.as_str(), false),
        };
        for listener in listeners {
            if once {
                vm.once(name, listener.clone());
            } else {
                vm.on(name, listener.clone());
            }
        }
    }
}

impl Instance {
    pub fn on(&self, event: &str, listener: Listener) -> &Self {
        self.add_handler(
            event,
            Handler {
                call: listener.clone(),
                listener,
            },
        );
        self
    }

    /// Listens for the next emission of `event` only.
    pub fn once(&self, event: &str, listener: Listener) -> &Self {
        let vm = self.downgrade();
        let name = event.to_string();
        let inner = listener.clone();
        let call = Listener::new(move |args| {
            if let Some(vm) = vm.upgrade() {
                vm.off(Some(name.as_str()), Some(&inner));
            }
            inner.call(args);
        });
        self.add_handler(event, Handler { call, listener });
        self
    }

    fn add_handler(&self, event: &str, handler: Handler) {
        if event.starts_with("hook:") {
            self.0.has_hook_event.set(true);
        }
        self.0
            .events
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    /// Removes listeners: all of them without an event, every listener of
    /// `event` without a listener, or that one listener.
    pub fn off(&self, event: Option<&str>, listener: Option<&Listener>) -> &Self {
        let mut events = self.0.events.borrow_mut();
        match (event, listener) {
            (None, _) => events.clear(),
            (Some(event), None) => {
                events.remove(event);
            }
            (Some(event), Some(listener)) => {
                if let Some(handlers) = events.get_mut(event) {
                    // only the most recent registration goes
                    if let Some(pos) = handlers.iter().rposition(|h| h.matches(listener)) {
                        handlers.remove(pos);
                    }
                }
            }
        }
        self
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> &Self {
        if cfg!(debug_assertions) {
            let lower = event.to_lowercase();
            if lower != event && self.0.events.borrow().contains_key(&lower) {
                tip(
                    &format!(
                        "Event \"{lower}\" is emitted in component {} but the handler is \
                         registered for \"{event}\". Note that HTML attributes are \
                         case-insensitive and you cannot use v-on to listen to camelCase events \
                         when using in-DOM templates. You should probably use \"{}\" instead of \
                         \"{event}\".",
                        format_component_name(self),
                        hyphenate(event),
                    ),
                    Some(self),
                );
            }
        }
        // handlers may register or remove listeners while running
        let handlers = self.0.events.borrow().get(event).cloned().unwrap_or_default();
        for handler in handlers {
            handler.call.call(args);
        }
        self
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.0
            .events
            .borrow()
            .get(event)
            .is_some_and(|h| !h.is_empty())
    }
}
