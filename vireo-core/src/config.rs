//! Per-thread runtime configuration.
//!
//! Instances never cross threads, so each thread carries its own settings.

use std::cell::RefCell;
use std::rc::Rc;

use crate::instance::Instance;

/// Receives a warning and the component trace it was raised in.
pub type WarnHandler = Rc<dyn Fn(&str, &str)>;

/// Receives an error raised by user code, the instance it surfaced in, and
/// where it happened (`"created hook"`, `"data()"`, ...).
pub type ErrorHandler = Rc<dyn Fn(&anyhow::Error, Option<&Instance>, &str)>;

#[derive(Clone, Default)]
pub struct Config {
    /// Suppress all warnings.
    pub silent: bool,
    /// Log instance initialization timings.
    pub performance: bool,
    pub warn_handler: Option<WarnHandler>,
    pub error_handler: Option<ErrorHandler>,
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Snapshot of the current thread's configuration.
pub fn get() -> Config {
    CONFIG.with(|c| c.borrow().clone())
}

pub fn set_silent(silent: bool) {
    CONFIG.with(|c| c.borrow_mut().silent = silent);
}

pub fn set_performance(enabled: bool) {
    CONFIG.with(|c| c.borrow_mut().performance = enabled);
}

pub fn set_warn_handler(handler: impl Fn(&str, &str) + 'static) {
    CONFIG.with(|c| c.borrow_mut().warn_handler = Some(Rc::new(handler)));
}

pub fn set_error_handler(handler: impl Fn(&anyhow::Error, Option<&Instance>, &str) + 'static) {
    CONFIG.with(|c| c.borrow_mut().error_handler = Some(Rc::new(handler)));
}

/// Restores the defaults.
pub fn reset() {
    CONFIG.with(|c| *c.borrow_mut() = Config::default());
}
