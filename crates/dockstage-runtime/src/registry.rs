#![forbid(unsafe_code)]

//! Action lookup tables.
//!
//! Callables register under a dotted name, a numeric code, or both. The
//! tables are owned by the scheduler that consults them; nothing here is
//! process-global, so independent schedulers resolve independently.

use rustc_hash::FxHashMap;

use crate::action::{ActionCode, ActionFn};

/// Name and code tables for resolved action callables.
#[derive(Default)]
pub struct ActionRegistry {
    by_name: FxHashMap<String, ActionFn>,
    by_code: FxHashMap<ActionCode, ActionFn>,
}

impl ActionRegistry {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable under a dotted name, replacing any previous one.
    pub fn register_name(&mut self, name: impl Into<String>, f: ActionFn) {
        self.by_name.insert(name.into(), f);
    }

    /// Register a callable under a numeric code, replacing any previous one.
    pub fn register_code(&mut self, code: ActionCode, f: ActionFn) {
        self.by_code.insert(code, f);
    }

    /// Look up by dotted name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&ActionFn> {
        self.by_name.get(name)
    }

    /// Look up by numeric code.
    #[must_use]
    pub fn by_code(&self, code: ActionCode) -> Option<&ActionFn> {
        self.by_code.get(&code)
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("names", &self.by_name.len())
            .field("codes", &self.by_code.len())
            .finish()
    }
}
