//! Component definitions and the extension chain.
//!
//! A definition owns its resolved options. Extending a definition records
//! the parent, the options the extension was created with, and a sealed
//! snapshot of the merged result. When an ancestor's options change later
//! (global mixins, registrations, late edits), resolving a descendant
//! re-merges it against the new parent options, carrying over any edits
//! made directly to the descendant since it was sealed.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;
use vireo_dom::{ComponentCtor, CtorRef, FunctionalCall, Rendered};

use crate::instance::Instance;
use crate::lifecycle::LifecycleHook;
use crate::merge::{merge_options, validate_component_name};
use crate::options::{ComponentOptions, Directive, Filter};

thread_local! {
    static NEXT_CID: Cell<u32> = const { Cell::new(0) };
    static REGISTRY: RefCell<HashMap<u32, Weak<DefinitionInner>>> = RefCell::new(HashMap::new());
}

/// Shared handle to a component definition, compared by identity.
#[derive(Clone)]
pub struct ComponentDefinition(Rc<DefinitionInner>);

struct DefinitionInner {
    cid: u32,
    parent: Option<ComponentDefinition>,
    self_ref: Weak<DefinitionInner>,
    /// Bumped whenever `options` is replaced.
    version: Cell<u64>,
    options: RefCell<Rc<ComponentOptions>>,
    /// Parent version `options` was last merged against.
    super_version: Cell<u64>,
    super_options: RefCell<Option<Rc<ComponentOptions>>>,
    extend_options: RefCell<ComponentOptions>,
    sealed_options: RefCell<Rc<ComponentOptions>>,
}

impl ComponentDefinition {
    /// A root definition with empty options. Every chain starts here.
    pub fn base() -> Self {
        Self::create(None, ComponentOptions::default(), ComponentOptions::default(), 0)
    }

    fn create(
        parent: Option<ComponentDefinition>,
        options: ComponentOptions,
        extend_options: ComponentOptions,
        super_version: u64,
    ) -> Self {
        let cid = NEXT_CID.with(|n| {
            let cid = n.get();
            n.set(cid + 1);
            cid
        });
        let options = Rc::new(options);
        let inner = Rc::new_cyclic(|self_ref| DefinitionInner {
            cid,
            parent,
            self_ref: self_ref.clone(),
            version: Cell::new(0),
            sealed_options: RefCell::new(Rc::clone(&options)),
            options: RefCell::new(options),
            super_version: Cell::new(super_version),
            super_options: RefCell::new(None),
            extend_options: RefCell::new(extend_options),
        });
        REGISTRY.with(|r| r.borrow_mut().insert(cid, Rc::downgrade(&inner)));
        ComponentDefinition(inner)
    }

    /// Finds a live definition by cid.
    pub fn lookup(cid: u32) -> Option<Self> {
        REGISTRY
            .with(|r| r.borrow().get(&cid).and_then(Weak::upgrade))
            .map(ComponentDefinition)
    }

    pub fn cid(&self) -> u32 {
        self.0.cid
    }

    pub fn parent(&self) -> Option<&ComponentDefinition> {
        self.0.parent.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.0.version.get()
    }

    /// Current options, without checking the parent for changes.
    pub fn options(&self) -> Rc<ComponentOptions> {
        Rc::clone(&self.0.options.borrow())
    }

    /// Snapshot taken when this definition was created.
    pub fn sealed_options(&self) -> Rc<ComponentOptions> {
        Rc::clone(&self.0.sealed_options.borrow())
    }

    /// Parent options this definition was last merged against.
    pub fn super_options(&self) -> Option<Rc<ComponentOptions>> {
        self.0.super_options.borrow().clone()
    }

    pub fn extend_options(&self) -> ComponentOptions {
        self.0.extend_options.borrow().clone()
    }

    pub fn as_ctor(&self) -> CtorRef {
        CtorRef::new(self.0.clone())
    }

    /// Creates a sub-definition whose options are `extend_options` merged
    /// over this definition's. A named definition registers itself as a
    /// local component so it can render recursively.
    pub fn extend(&self, extend_options: ComponentOptions) -> ComponentDefinition {
        let super_options = self.resolve_options();
        let name = extend_options.name.clone().or_else(|| super_options.name.clone());
        if cfg!(debug_assertions) {
            if let Some(name) = &name {
                validate_component_name(name);
            }
        }
        let merged = merge_options(&super_options, &extend_options, false);
        let sub = Self::create(Some(self.clone()), merged, extend_options, self.version());
        *sub.0.super_options.borrow_mut() = Some(super_options);
        if let Some(name) = name {
            let mut options = ComponentOptions::clone(&sub.options());
            options.components.insert(name, sub.clone());
            let options = Rc::new(options);
            *sub.0.sealed_options.borrow_mut() = Rc::clone(&options);
            *sub.0.options.borrow_mut() = options;
        }
        debug!(cid = sub.cid(), parent = self.cid(), "definition extended");
        sub
    }

    /// Merges `mixin` into this definition's options.
    pub fn mixin(&self, mixin: ComponentOptions) -> &Self {
        let merged = merge_options(&self.options(), &mixin, false);
        self.replace_options(merged);
        self
    }

    /// Registers a component available to every instance of this definition
    /// and its descendants.
    pub fn component(&self, id: &str, definition: ComponentDefinition) -> &Self {
        if cfg!(debug_assertions) {
            validate_component_name(id);
        }
        self.modify_options(|o| {
            o.components.insert(id.to_string(), definition);
        })
    }

    pub fn directive(&self, id: &str, directive: Directive) -> &Self {
        self.modify_options(|o| {
            o.directives.insert(id.to_string(), directive);
        })
    }

    pub fn filter(&self, id: &str, filter: Filter) -> &Self {
        self.modify_options(|o| {
            o.filters.insert(id.to_string(), filter);
        })
    }

    /// Edits the current options in place. Edits made to a sub-definition
    /// survive later re-resolution against a changed parent.
    pub fn modify_options(&self, edit: impl FnOnce(&mut ComponentOptions)) -> &Self {
        let mut next = ComponentOptions::clone(&self.options());
        edit(&mut next);
        self.replace_options(next);
        self
    }

    fn replace_options(&self, options: ComponentOptions) {
        *self.0.options.borrow_mut() = Rc::new(options);
        self.0.version.set(self.0.version.get() + 1);
    }

    /// Options with every ancestor change applied.
    ///
    /// Re-merges only when the parent's version moved since the last
    /// merge; otherwise the same `Rc` is returned.
    pub fn resolve_options(&self) -> Rc<ComponentOptions> {
        let Some(parent) = &self.0.parent else {
            return self.options();
        };
        let super_options = parent.resolve_options();
        let parent_version = parent.version();
        if parent_version == self.0.super_version.get() {
            return self.options();
        }
        debug!(cid = self.cid(), parent = parent.cid(), "parent options changed");
        self.0.super_version.set(parent_version);
        *self.0.super_options.borrow_mut() = Some(Rc::clone(&super_options));

        let latest = self.options();
        let sealed = self.sealed_options();
        if carry_modified_options(&latest, &sealed, &mut self.0.extend_options.borrow_mut()) {
            debug!(cid = self.cid(), "late option edits carried over");
        }
        let mut merged = merge_options(&super_options, &self.0.extend_options.borrow(), false);
        if let Some(name) = merged.name.clone() {
            merged.components.insert(name, self.clone());
        }
        self.replace_options(merged);
        self.options()
    }
}

/// Copies into `extended` every field that differs between the latest and
/// the sealed options. Hook lists keep only entries that came from the
/// extension itself or were added after sealing, so inherited hooks are not
/// duplicated by the next merge.
fn carry_modified_options(
    latest: &ComponentOptions,
    sealed: &ComponentOptions,
    extended: &mut ComponentOptions,
) -> bool {
    let mut modified = false;
    macro_rules! carry {
        ($($field:ident),+ $(,)?) => {
            $(
                if latest.$field != sealed.$field {
                    extended.$field = latest.$field.clone();
                    modified = true;
                }
            )+
        };
    }
    carry!(
        name, data, props, methods, computed, watch, components, directives, filters, provide,
        inject, render, template, functional, delimiters,
    );

    for hook in LifecycleHook::ALL {
        let (l, s) = (latest.hooks_of(hook), sealed.hooks_of(hook));
        if l != s {
            let kept = dedupe(l, extended.hooks_of(hook), s);
            extended.hooks.insert(hook, kept);
            modified = true;
        }
    }
    if latest.error_captured != sealed.error_captured {
        extended.error_captured = dedupe(&latest.error_captured, &extended.error_captured, &sealed.error_captured);
        modified = true;
    }
    if latest.static_render_fns != sealed.static_render_fns {
        extended.static_render_fns =
            dedupe(&latest.static_render_fns, &extended.static_render_fns, &sealed.static_render_fns);
        modified = true;
    }
    modified
}

/// Entries of `latest` that are either part of `extended` or were not in
/// `sealed`.
fn dedupe<T: PartialEq + Clone>(latest: &[T], extended: &[T], sealed: &[T]) -> Vec<T> {
    latest
        .iter()
        .filter(|item| extended.contains(item) || !sealed.contains(item))
        .cloned()
        .collect()
}

impl PartialEq for ComponentDefinition {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for DefinitionInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // options may reference this definition; print the name only
        let name = self.options.try_borrow().ok().and_then(|o| o.name.clone());
        f.debug_struct("ComponentDefinition")
            .field("cid", &self.cid)
            .field("name", &name)
            .finish_non_exhaustive()
    }
}

impl DefinitionInner {
    fn handle(&self) -> Option<ComponentDefinition> {
        self.self_ref.upgrade().map(ComponentDefinition)
    }

    fn resolved(&self) -> Rc<ComponentOptions> {
        match self.handle() {
            Some(definition) => definition.resolve_options(),
            None => Rc::clone(&self.options.borrow()),
        }
    }
}

impl ComponentCtor for DefinitionInner {
    fn cid(&self) -> u32 {
        self.cid
    }

    fn name(&self) -> Option<String> {
        self.resolved().name.clone()
    }

    fn prop_names(&self) -> Vec<String> {
        self.resolved().props.keys().cloned().collect()
    }

    fn is_functional(&self) -> bool {
        self.resolved().functional
    }

    fn render_functional(&self, call: FunctionalCall<'_>) -> Option<Rendered> {
        let definition = self.handle()?;
        Some(Instance::functional(&definition, call))
    }
}

#[cfg(test)]
mod tests {
    use super::dedupe;

    #[test]
    fn dedupe_drops_inherited_entries() {
        // 1 inherited, 2 from the extension, 3 added after sealing
        assert_eq!(dedupe(&[1, 2, 3], &[2], &[1, 2]), vec![2, 3]);
    }
}
