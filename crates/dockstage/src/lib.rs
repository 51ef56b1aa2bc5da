#![forbid(unsafe_code)]

//! Dockstage public facade crate.
//!
//! Re-exports the common types from the core, layout, and runtime crates
//! and offers a lightweight prelude for day-to-day usage.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use dockstage_core::geometry::{Bounds, PxSize};
pub use dockstage_core::uid::UidGen;

// --- Layout re-exports -----------------------------------------------------

pub use dockstage_layout::{
    Anchor, Dim, Geometry, HeadlessSurface, LayoutConfig, LayoutError, Panel, PanelId, PanelKind,
    PanelSpec, PanelTree, ResizeCursor, Surface, apply_geometry, arrange_children, mount,
    relayout, resolve_size,
};

// --- Runtime re-exports ----------------------------------------------------

pub use dockstage_runtime::{
    Action, ActionCode, ActionCx, ActionFn, ActionPath, ActionRegistry, ActionSignal,
    ActionWindow, Bus, BusHandler, Dispatch, DispatchError, LoadRequest, ModuleLoader, NullLoader,
    Scheduler, SchedulerConfig, TickReport, script_url,
};

// --- Errors ----------------------------------------------------------------

/// Top-level error type for dockstage hosts.
#[derive(Debug)]
pub enum Error {
    /// Panel-tree construction or factory failure.
    Layout(LayoutError),
    /// Runtime error with message.
    Runtime(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "{err}"),
            Self::Runtime(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(err) => Some(err),
            Self::Runtime(_) => None,
        }
    }
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

/// Convenient imports for typical hosts.
pub mod prelude {
    pub use crate::{
        Action, ActionSignal, Anchor, Dim, Dispatch, LayoutConfig, PanelSpec, PanelTree,
        Scheduler, SchedulerConfig, Surface, relayout,
    };
}
