//! Hook Registry
//!
//! Extension points fired during component resolution. One registry is
//! shared by reference across an entire loader tree, so a callback
//! registered anywhere fires for every component in the tree that reaches
//! the extension point.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::loader::Loader;

/// Extension points a callback can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Fires right after a component's declared script list is first
    /// computed and before it freezes into the allow-list. Callbacks may
    /// reshape the list via [`Loader::add_file`] / [`Loader::remove_file`].
    BeforeScripts,
}

/// Callback signature: receives the loader whose resolution fired the hook.
pub type HookCallback = dyn Fn(&Loader) -> Result<()>;

/// Ordered callback lists per extension point.
#[derive(Default)]
pub struct HookRegistry {
    callbacks: HashMap<HookPoint, Vec<Rc<HookCallback>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` to the list for `point`.
    pub fn add(&mut self, point: HookPoint, callback: Rc<HookCallback>) {
        self.callbacks.entry(point).or_default().push(callback);
    }

    /// The callbacks registered for `point`, in registration order.
    ///
    /// Returns a snapshot so a firing callback can register further hooks
    /// without invalidating the iteration in progress.
    pub fn snapshot(&self, point: HookPoint) -> Vec<Rc<HookCallback>> {
        self.callbacks.get(&point).cloned().unwrap_or_default()
    }
}
