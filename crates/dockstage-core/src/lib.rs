#![forbid(unsafe_code)]

//! Core primitives shared by the dockstage crates.
//!
//! This crate is the leaf of the workspace: pixel-space geometry used by the
//! layout engine, and the monotonic identifier source used by both the layout
//! tree and the scheduler.

pub mod geometry;
pub mod uid;

pub use geometry::{Bounds, PxSize};
pub use uid::UidGen;
