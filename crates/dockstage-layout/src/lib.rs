#![forbid(unsafe_code)]

//! Recursive docking-panel layout.
//!
//! Panels carry a compass-side anchor and a declared size (absolute pixels or
//! a percentage of the parent). A layout pass partitions each panel's
//! children into *dock sets* — maximal runs of one anchored panel plus its
//! trailing attached siblings — places every set against the shrinking
//! boundary of the parent, and injects stretch splitters between adjacent
//! members of a set. Splitters are cached on the member that owns them and
//! pruned when a later pass no longer needs them.
//!
//! The presentation layer is reached only through the narrow [`Surface`]
//! trait; this crate never touches a real rendering backend.

pub mod arrange;
pub mod dim;
pub mod panel;
pub mod surface;

pub use arrange::{apply_geometry, arrange_children, mount, relayout, resolve_size};
pub use dim::Dim;
pub use panel::{
    Anchor, LayoutError, Panel, PanelId, PanelKind, PanelSpec, PanelTree, ResizeCursor,
};
pub use surface::{Geometry, HeadlessSurface, Surface};

/// Tunables shared by a layout pass and the view-model factory.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Thickness of an injected splitter along the stacking axis, in pixels.
    pub splitter_thickness: f64,
    /// Minimum width applied to panels whose spec does not declare one.
    pub min_width: f64,
    /// Minimum height applied to panels whose spec does not declare one.
    pub min_height: f64,
    /// Declared width for panels whose spec does not declare one.
    pub default_width: Dim,
    /// Declared height for panels whose spec does not declare one.
    pub default_height: Dim,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            splitter_thickness: 5.0,
            min_width: 50.0,
            min_height: 40.0,
            default_width: Dim::Px(200.0),
            default_height: Dim::Px(200.0),
        }
    }
}
