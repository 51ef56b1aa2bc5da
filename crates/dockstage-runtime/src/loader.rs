#![forbid(unsafe_code)]

//! Module-loader collaborator interface.
//!
//! When an action's dotted name has no registry entry, the name's namespace
//! identifies a module to load: all segments except the trailing method,
//! lower-cased and slash-joined, form a resource path under the configured
//! library base. The actual fetch is someone else's job — the scheduler
//! hands a [`LoadRequest`] to its [`ModuleLoader`], records the action as
//! the load's continuation, and is notified of the outcome through
//! `module_loaded`/`module_failed`.
//!
//! At most one load per module namespace is in flight; actions naming a
//! loading module are left pending on its continuation rather than
//! re-requested.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::action::Action;

/// File extension appended to derived resource paths.
const SCRIPT_EXT: &str = ".js";

/// A dotted action name split into its registry/loader parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPath {
    /// Trailing segment. Identifies the registry name, not a literal
    /// property; the loader itself never uses it.
    pub method: String,
    /// Dot-joined namespace, e.g. `ui.control.Button`.
    pub module: String,
    /// Lower-cased, slash-joined resource path, e.g. `ui/control/button`.
    pub resource: String,
}

impl ActionPath {
    /// Split a dotted action name.
    #[must_use]
    pub fn derive(name: &str) -> Self {
        let mut parts: Vec<&str> = name.split('.').collect();
        let method = parts.pop().unwrap_or_default().to_string();
        let module = parts.join(".");
        let resource = parts.join("/").to_lowercase();
        Self {
            method,
            module,
            resource,
        }
    }
}

/// Resolve a resource path against the library base, with the script
/// extension appended.
#[must_use]
pub fn script_url(lib_url: &str, resource: &str) -> String {
    format!("{lib_url}{resource}{SCRIPT_EXT}")
}

/// Append a cache-busting query parameter to a script URL.
#[must_use]
pub fn cache_busted(url: &str, nonce: u64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}~={nonce}")
}

/// A module fetch handed to the loader collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Module namespace being loaded.
    pub module: String,
    /// Resolved script URL, cache-bust suffix included when enabled.
    pub path: String,
}

/// The asynchronous module fetcher, as seen by the scheduler.
///
/// Implementations start a fetch and return; they (or the host driving
/// them) later report the outcome via the scheduler's `module_loaded` /
/// `module_failed` notifications.
pub trait ModuleLoader: Send {
    fn load(&mut self, request: &LoadRequest);
}

/// A loader that drops every request. Modules never finish loading, so
/// name-resolved actions stay pending forever; useful for hosts that
/// register everything inline.
#[derive(Debug, Default)]
pub struct NullLoader;

impl ModuleLoader for NullLoader {
    fn load(&mut self, request: &LoadRequest) {
        tracing::debug!(module = %request.module, path = %request.path, "null loader discarding request");
    }
}

/// One in-flight module load and its continuations.
pub(crate) struct LoaderRecord {
    pub(crate) path: String,
    pub(crate) on_done: Option<Action>,
    pub(crate) on_fail: Option<Action>,
}

impl fmt::Debug for LoaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRecord")
            .field("path", &self.path)
            .field("on_done", &self.on_done.is_some())
            .field("on_fail", &self.on_fail.is_some())
            .finish()
    }
}

/// Loaded and loading module bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct ModuleTable {
    loaded: FxHashMap<String, String>,
    loading: FxHashMap<String, LoaderRecord>,
}

impl ModuleTable {
    pub(crate) fn is_loaded(&self, module: &str) -> bool {
        self.loaded.contains_key(module)
    }

    pub(crate) fn is_loading(&self, module: &str) -> bool {
        self.loading.contains_key(module)
    }

    /// Record the start of a load and its continuations.
    pub(crate) fn begin(
        &mut self,
        module: &str,
        path: &str,
        on_done: Action,
        on_fail: Option<Action>,
    ) {
        self.loading.insert(
            module.to_string(),
            LoaderRecord {
                path: path.to_string(),
                on_done: Some(on_done),
                on_fail,
            },
        );
    }

    /// Mark a module loaded without a fetch (inline registration).
    pub(crate) fn mark_loaded(&mut self, module: &str, path: &str) {
        self.loading.remove(module);
        self.loaded.insert(module.to_string(), path.to_string());
    }

    /// Finish a load successfully, returning its record for continuation.
    pub(crate) fn complete(&mut self, module: &str) -> Option<LoaderRecord> {
        let record = self.loading.remove(module)?;
        self.loaded.insert(module.to_string(), record.path.clone());
        Some(record)
    }

    /// Finish a load as failed. The module stays unloaded, so a later
    /// dispatch may retry the fetch from scratch.
    pub(crate) fn fail(&mut self, module: &str) -> Option<LoaderRecord> {
        self.loading.remove(module)
    }
}
