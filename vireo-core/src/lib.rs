//! Component runtime: definitions, option merging, instance initialization
//! and the API compiled render functions run against.
//!
//! ```ignore
//! let base = ComponentDefinition::base();
//! let counter = base.extend(
//!     ComponentOptions::new()
//!         .name("counter")
//!         .data(|_| Ok(json!({ "count": 0 })))
//!         .render(render),
//! );
//! let vm = Instance::new(&counter, ComponentOptions::new().el("#app"));
//! ```

pub mod config;
pub mod debug;
pub mod definition;
pub mod events;
pub mod inject;
pub mod instance;
pub mod lifecycle;
pub mod merge;
pub mod observer;
pub mod options;
pub mod render;
pub mod state;

pub use definition::ComponentDefinition;
pub use instance::{Instance, WeakInstance};
pub use lifecycle::{LifecycleHook, call_hook};
pub use merge::{merge_data, merge_options, validate_component_name};
pub use observer::{ReadTracker, traverse};
pub use options::{
    ComponentOptions, ComputedFn, DataFn, DefaultValue, Directive, DirectiveHook,
    ErrorCapturedHook, Filter, Hook, InjectOptions, InternalComponentOptions, Method, PropOptions,
    PropType, RenderFn, WatchHandler, Watcher,
};
pub use render::{Scope, resolve_slots};
pub use state::{WatcherId, validate_prop};
