#![forbid(unsafe_code)]

//! Presentation-layer collaborator interface.
//!
//! The layout engine computes geometry; something else owns the pixels. A
//! [`Surface`] receives resolved geometry pushes and panel teardown
//! notifications, and supplies the client size that root panels resolve
//! percentage sizes against.

use dockstage_core::geometry::PxSize;

use crate::panel::PanelId;

/// Resolved geometry pushed to the presentation layer.
///
/// `w`/`h` are the panel's content extents: the resolved size minus twice the
/// border-plus-padding inset. A hidden panel still carries its last geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub visible: bool,
}

/// The presentation layer as seen by the layout engine.
pub trait Surface {
    /// Client size of the top-level container, the percentage reference for
    /// panels without a parent.
    fn client_size(&self) -> PxSize;

    /// Push a panel's resolved position, size, and visibility.
    fn apply_geometry(&mut self, id: PanelId, geometry: &Geometry);

    /// A panel (or splitter) was removed from the tree.
    fn destroy(&mut self, id: PanelId);
}

/// A surface with a fixed client size that discards geometry pushes.
///
/// Useful for headless layout runs and as the base of test doubles.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessSurface {
    size: PxSize,
}

impl HeadlessSurface {
    /// Create a headless surface with the given client size.
    pub const fn new(w: f64, h: f64) -> Self {
        Self {
            size: PxSize::new(w, h),
        }
    }

    /// Change the client size, as a host resize would.
    pub fn resize(&mut self, w: f64, h: f64) {
        self.size = PxSize::new(w, h);
    }
}

impl Surface for HeadlessSurface {
    fn client_size(&self) -> PxSize {
        self.size
    }

    fn apply_geometry(&mut self, _id: PanelId, _geometry: &Geometry) {}

    fn destroy(&mut self, _id: PanelId) {}
}
