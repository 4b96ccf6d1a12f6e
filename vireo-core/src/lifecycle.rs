//! Lifecycle hooks, parent/child bookkeeping, mounting and teardown.

use std::fmt;

use tracing::debug;

use crate::debug::{invoke_with_error_handling, warn};
use crate::instance::{Instance, WeakInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleHook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
    Activated,
    Deactivated,
}

impl LifecycleHook {
    pub const ALL: [LifecycleHook; 10] = [
        LifecycleHook::BeforeCreate,
        LifecycleHook::Created,
        LifecycleHook::BeforeMount,
        LifecycleHook::Mounted,
        LifecycleHook::BeforeUpdate,
        LifecycleHook::Updated,
        LifecycleHook::BeforeDestroy,
        LifecycleHook::Destroyed,
        LifecycleHook::Activated,
        LifecycleHook::Deactivated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleHook::BeforeCreate => "beforeCreate",
            LifecycleHook::Created => "created",
            LifecycleHook::BeforeMount => "beforeMount",
            LifecycleHook::Mounted => "mounted",
            LifecycleHook::BeforeUpdate => "beforeUpdate",
            LifecycleHook::Updated => "updated",
            LifecycleHook::BeforeDestroy => "beforeDestroy",
            LifecycleHook::Destroyed => "destroyed",
            LifecycleHook::Activated => "activated",
            LifecycleHook::Deactivated => "deactivated",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
pub(crate) struct LifecycleState {
    pub(crate) parent: Option<WeakInstance>,
    /// `None` when the instance is its own root.
    pub(crate) root: Option<WeakInstance>,
    pub(crate) children: Vec<Instance>,
    pub(crate) is_mounted: bool,
    pub(crate) is_destroyed: bool,
    pub(crate) is_being_destroyed: bool,
}

/// Links `vm` under `parent` and records the root.
pub(crate) fn init_lifecycle(vm: &Instance, parent: Option<&Instance>) {
    let mut state = vm.0.lifecycle.borrow_mut();
    if let Some(parent) = parent {
        parent.0.lifecycle.borrow_mut().children.push(vm.clone());
        state.parent = Some(parent.downgrade());
        state.root = Some(parent.root_instance().downgrade());
    }
}

/// Runs the hooks registered for `hook`, then emits `hook:<name>` when
/// someone listens for it.
pub fn call_hook(vm: &Instance, hook: LifecycleHook) {
    let info = format!("{hook} hook");
    for handler in vm.options().hooks_of(hook) {
        invoke_with_error_handling(|| (handler.0)(vm), Some(vm), &info);
    }
    if vm.0.has_hook_event.get() {
        vm.emit(&format!("hook:{hook}"), &[]);
    }
}

impl Instance {
    /// Renders the instance and records the tree, running `beforeMount` and
    /// `mounted` around it.
    pub fn mount(&self, el: Option<&str>) -> &Self {
        if let Some(el) = el {
            self.0.render_state.borrow_mut().el = Some(el.to_string());
        }
        if self.options().render.is_none() {
            if self.options().template.is_some() {
                warn(
                    "You are using the runtime-only build where the template compiler is not \
                     available. Either pre-compile the templates into render functions, or use \
                     the compiler-included build.",
                    Some(self),
                );
            } else {
                warn(
                    "Failed to mount component: template or render function not defined.",
                    Some(self),
                );
            }
        }
        call_hook(self, LifecycleHook::BeforeMount);
        let vnode = self.render();
        self.0.render_state.borrow_mut().vnode = Some(vnode);
        self.0.lifecycle.borrow_mut().is_mounted = true;
        debug!(uid = self.uid(), "mounted");
        call_hook(self, LifecycleHook::Mounted);
        self
    }

    /// Re-renders a mounted instance.
    pub fn force_update(&self) {
        let state = self.0.lifecycle.borrow();
        if !state.is_mounted || state.is_destroyed {
            return;
        }
        drop(state);
        call_hook(self, LifecycleHook::BeforeUpdate);
        let vnode = self.render();
        self.0.render_state.borrow_mut().vnode = Some(vnode);
        call_hook(self, LifecycleHook::Updated);
    }

    /// Tears the instance down: unlinks it from its parent, drops its
    /// children, watchers, rendered tree and listeners.
    pub fn destroy(&self) {
        if self.0.lifecycle.borrow().is_being_destroyed {
            return;
        }
        call_hook(self, LifecycleHook::BeforeDestroy);
        self.0.lifecycle.borrow_mut().is_being_destroyed = true;
        if let Some(parent) = self.parent() {
            let mut parent_state = parent.0.lifecycle.borrow_mut();
            if !parent_state.is_being_destroyed {
                parent_state.children.retain(|c| c != self);
            }
        }
        let children = std::mem::take(&mut self.0.lifecycle.borrow_mut().children);
        for child in children {
            child.destroy();
        }
        self.0.state.borrow_mut().watchers.clear();
        self.0.render_state.borrow_mut().vnode = None;
        self.0.lifecycle.borrow_mut().is_destroyed = true;
        debug!(uid = self.uid(), "destroyed");
        call_hook(self, LifecycleHook::Destroyed);
        self.off(None, None);
    }

    pub fn is_mounted(&self) -> bool {
        self.0.lifecycle.borrow().is_mounted
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.lifecycle.borrow().is_destroyed
    }

    pub fn parent(&self) -> Option<Instance> {
        self.0
            .lifecycle
            .borrow()
            .parent
            .as_ref()
            .and_then(WeakInstance::upgrade)
    }

    pub fn root_instance(&self) -> Instance {
        self.0
            .lifecycle
            .borrow()
            .root
            .as_ref()
            .and_then(WeakInstance::upgrade)
            .unwrap_or_else(|| self.clone())
    }

    pub fn children(&self) -> Vec<Instance> {
        self.0.lifecycle.borrow().children.clone()
    }
}
