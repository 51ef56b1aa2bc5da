#![forbid(unsafe_code)]

//! Dock-set arrangement.
//!
//! A layout pass walks a panel's children in order, grouping them into dock
//! sets: each non-attached anchored child opens a set, and `A`-anchored
//! children extend it. Sets are placed one after another against a shrinking
//! boundary rectangle, so earlier sets carve space away from later ones and a
//! trailing middle set fills whatever is left.
//!
//! Within a set, members share the set's cross-axis thickness (the largest
//! declared thickness among them) and split the along-axis span
//! proportionally to their declared sizes. Non-last members are floored and
//! clamped up to their minimums; the last member absorbs the exact remaining
//! span, so a set always fills its span with no rounding leftover. Once the
//! running span is exhausted, remaining members are still recursed into but
//! marked invisible.
//!
//! The boundary is threaded through explicitly as a [`Bounds`] value; no
//! pass state survives outside the call tree.

use dockstage_core::geometry::Bounds;

use crate::panel::{Anchor, PanelId, PanelTree, ResizeCursor};
use crate::surface::{Geometry, Surface};
use crate::LayoutConfig;

/// Re-resolve a panel's pixel size from its declared size.
///
/// The percentage reference is the parent's inner size, or the surface
/// client size for root panels. Sets `size_changed` when either extent
/// moved. Children resolve against the parent's *current* resolution, so
/// this must run before the children are arranged.
pub fn resolve_size(tree: &mut PanelTree, id: PanelId, surface: &dyn Surface) {
    let reference = match tree.get(id).and_then(|p| p.parent) {
        Some(pid) => match tree.get(pid) {
            Some(parent) => (parent.inner_width(), parent.inner_height()),
            None => return,
        },
        None => {
            let client = surface.client_size();
            (client.w, client.h)
        }
    };
    let Some(p) = tree.get_mut(id) else {
        return;
    };
    let (ow, oh) = (p.w, p.h);
    p.w = p.width.resolve(reference.0);
    p.h = p.height.resolve(reference.1);
    p.size_changed = ow != p.w || oh != p.h;
}

/// Push a panel's resolved geometry to the surface.
///
/// A negative resolved extent forces the panel invisible before the push.
/// The pushed extents are the content-box size (inset subtracted).
pub fn apply_geometry(tree: &mut PanelTree, id: PanelId, surface: &mut dyn Surface) {
    let Some(p) = tree.get_mut(id) else {
        return;
    };
    if p.w < 0.0 || p.h < 0.0 {
        p.visible = false;
    }
    let inset = p.inset();
    let geometry = Geometry {
        x: p.x,
        y: p.y,
        w: p.w - inset,
        h: p.h - inset,
        visible: p.visible,
    };
    surface.apply_geometry(id, &geometry);
}

/// Full layout pass for one panel: resolve its size, push it, arrange its
/// children. This is the entry point a host calls when the panel or its
/// container changed size.
pub fn relayout(tree: &mut PanelTree, id: PanelId, surface: &mut dyn Surface, cfg: &LayoutConfig) {
    resolve_size(tree, id, surface);
    apply_geometry(tree, id, surface);
    arrange_children(tree, id, surface, cfg);
}

/// Instantiate a view-model subtree and run the initial layout pass.
///
/// A rooted spec lays itself out; a spec mounted under a parent triggers the
/// parent's child arrangement, which is what sizes the newcomer.
pub fn mount(
    tree: &mut PanelTree,
    spec: &crate::panel::PanelSpec,
    parent: Option<PanelId>,
    surface: &mut dyn Surface,
    cfg: &LayoutConfig,
) -> Result<PanelId, crate::panel::LayoutError> {
    let id = tree.insert_spec(spec, parent, cfg)?;
    match parent {
        Some(pid) => arrange_children(tree, pid, surface, cfg),
        None => relayout(tree, id, surface, cfg),
    }
    Ok(id)
}

/// Arrange the direct children of a panel and recurse into them.
///
/// Children with no anchor are left untouched. Splitters owned by this
/// panel are all marked unused at the start of the pass and pruned at the
/// end if no dock set re-claimed them.
pub fn arrange_children(
    tree: &mut PanelTree,
    id: PanelId,
    surface: &mut dyn Surface,
    cfg: &LayoutConfig,
) {
    let Some(parent) = tree.get(id) else {
        return;
    };
    let padding = parent.padding;
    let (w, h) = (parent.w, parent.h);
    let kids = parent.children.clone();
    for sid in parent.splitters.clone() {
        if let Some(sp) = tree.get_mut(sid) {
            sp.in_use = false;
        }
    }

    let mut boundary = Bounds::new(padding, padding, w - padding * 2.0, h - padding * 2.0);

    let mut set: Vec<PanelId> = Vec::new();
    for kid in kids {
        let Some(anchor) = tree.get(kid).and_then(|p| p.anchor) else {
            continue;
        };
        if anchor == Anchor::Attached {
            if set.is_empty() {
                tracing::warn!(
                    panel = kid.get(),
                    "attached panel has no preceding anchored sibling; starting its own dock set"
                );
            }
            set.push(kid);
        } else {
            if !set.is_empty() {
                arrange_dock_set(tree, id, &set, &mut boundary, true, surface, cfg);
            }
            set = vec![kid];
        }
    }
    if !set.is_empty() {
        arrange_dock_set(tree, id, &set, &mut boundary, true, surface, cfg);
    }

    let splitters = match tree.get(id) {
        Some(p) => p.splitters.clone(),
        None => return,
    };
    for sid in splitters {
        let stale = tree.get(sid).is_some_and(|sp| !sp.in_use);
        if stale {
            destroy_splitter(tree, sid, surface);
        }
    }
}

/// Place one dock set against the boundary and shrink the boundary by the
/// space it consumed.
fn arrange_dock_set(
    tree: &mut PanelTree,
    parent: PanelId,
    set: &[PanelId],
    boundary: &mut Bounds,
    splitters_on: bool,
    surface: &mut dyn Surface,
    cfg: &LayoutConfig,
) {
    let len = set.len();
    let Some(first) = tree.get(set[0]) else {
        return;
    };
    let side = first.anchor.unwrap_or(Anchor::Attached);
    let vertical = side.stacks_vertically();

    let inner = match tree.get(parent) {
        Some(p) => (p.inner_width(), p.inner_height()),
        None => return,
    };

    // Declared along-axis sizes and the shared cross-axis thickness.
    let mut amount = 0.0f64;
    let mut max_thick = 0.0f64;
    let mut along = Vec::with_capacity(len);
    for &mid in set {
        let Some(m) = tree.get(mid) else {
            along.push(0.0);
            continue;
        };
        let (a, c) = if vertical {
            (m.height.resolve(inner.1), m.width.resolve(inner.0))
        } else {
            (m.width.resolve(inner.0), m.height.resolve(inner.1))
        };
        if c > max_thick {
            max_thick = c;
        }
        amount += a;
        along.push(a);
    }

    let ss = cfg.splitter_thickness;
    let span = if vertical {
        boundary.height()
    } else {
        boundary.width()
    };
    // Degenerate spans would blow the scale factor up; pin it to 1 instead.
    let mul = if span < 1.0 {
        1.0
    } else {
        amount / (span - (len as f64 - 1.0) * ss)
    };

    let mut stack = if vertical { boundary.y1 } else { boundary.x1 };
    let mut ws = span;
    let mut last_visible = false;

    for (j, &mid) in set.iter().enumerate() {
        let is_last = j + 1 == len;
        let mut splitter_rect: Option<(f64, f64, f64, f64, ResizeCursor)> = None;
        {
            let Some(m) = tree.get_mut(mid) else {
                continue;
            };
            let visible = ws > 0.0;
            m.visible = visible;
            if visible {
                if vertical {
                    m.h = if is_last { ws } else { (along[j] / mul).floor() };
                    if m.h < m.min_height {
                        m.h = m.min_height;
                    }
                    m.w = max_thick;
                    m.y = stack;
                    stack += m.h + ss;
                    ws -= m.h + ss;
                } else {
                    m.x = stack;
                    m.w = if is_last { ws } else { (along[j] / mul).floor() };
                    if m.w < m.min_width {
                        m.w = m.min_width;
                    }
                    m.h = max_thick;
                    stack += m.w + ss;
                    ws -= m.w + ss;
                }
                match side {
                    Anchor::North => m.y = boundary.y1,
                    Anchor::South => m.y = boundary.y2 - max_thick,
                    Anchor::East => m.x = boundary.x2 - max_thick,
                    Anchor::Middle => {
                        // The middle set spans the whole remaining width and
                        // then takes the west position rule.
                        m.w = boundary.width();
                        m.x = boundary.x1;
                    }
                    Anchor::West => m.x = boundary.x1,
                    Anchor::Attached => {}
                }
                if !is_last && splitters_on {
                    splitter_rect = Some(if vertical {
                        (m.x, m.y + m.h, m.w, ss, ResizeCursor::Row)
                    } else {
                        (m.x + m.w, m.y, ss, m.h, ResizeCursor::Col)
                    });
                }
            } else {
                tracing::debug!(
                    panel = mid.get(),
                    w = m.w,
                    h = m.h,
                    "dock set span exhausted; member hidden"
                );
            }
            last_visible = visible;
        }

        arrange_children(tree, mid, surface, cfg);
        apply_geometry(tree, mid, surface);

        if let Some((sx, sy, sw, sh, cursor)) = splitter_rect {
            ensure_splitter(tree, parent, mid, (sx, sy, sw, sh), cursor, surface, cfg);
        }
    }

    // The set consumed a slab of the boundary on its anchored side; the
    // middle side consumes nothing (it must come last anyway).
    if last_visible {
        let slab = max_thick + ss;
        match side {
            Anchor::North => boundary.y1 += slab,
            Anchor::East => boundary.x2 -= slab,
            Anchor::West => boundary.x1 += slab,
            Anchor::South => boundary.y2 -= slab,
            Anchor::Middle | Anchor::Attached => {}
        }
    }
}

/// Reuse or create the stretch splitter trailing a dock-set member, update
/// its geometry, and mark it live for this pass.
fn ensure_splitter(
    tree: &mut PanelTree,
    parent: PanelId,
    owner: PanelId,
    rect: (f64, f64, f64, f64),
    cursor: ResizeCursor,
    surface: &mut dyn Surface,
    cfg: &LayoutConfig,
) {
    let existing = tree
        .get(owner)
        .and_then(|m| m.splitter)
        .filter(|sid| tree.contains(*sid));
    let sid = match existing {
        Some(sid) => sid,
        None => {
            tracing::debug!(owner = owner.get(), "creating stretch splitter");
            match tree.alloc_splitter(parent, owner, cursor, cfg) {
                Ok(sid) => sid,
                Err(err) => {
                    tracing::error!(%err, "splitter allocation failed");
                    return;
                }
            }
        }
    };
    let (x, y, w, h) = rect;
    if let Some(sp) = tree.get_mut(sid) {
        sp.in_use = true;
        sp.cursor = Some(cursor);
        sp.x = x;
        sp.y = y;
        sp.size_changed = sp.w != w || sp.h != h;
        sp.w = w;
        sp.h = h;
        sp.visible = true;
    }
    apply_geometry(tree, sid, surface);
}

/// Tear down a splitter that survived from an earlier pass but was not
/// re-claimed by any dock set this pass.
fn destroy_splitter(tree: &mut PanelTree, sid: PanelId, surface: &mut dyn Surface) {
    tracing::debug!(splitter = sid.get(), "pruning stale splitter");
    if tree.remove(sid, surface).is_err() {
        tracing::debug!(splitter = sid.get(), "stale splitter already gone");
    }
}
