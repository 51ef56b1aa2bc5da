#![forbid(unsafe_code)]

//! Panel tree model and view-model factory.
//!
//! Panels live in an id-keyed arena rather than an ownership tree: the
//! arrangement pass needs to hop freely between a parent, its children, and
//! the splitters wedged between them, and id links keep that free of borrow
//! cycles. Node ids are non-zero and never reused within a tree.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::dim::Dim;
use crate::surface::Surface;
use crate::LayoutConfig;

/// Stable identifier for panel nodes. `0` is reserved/invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(u64);

impl PanelId {
    /// Lowest valid panel id.
    pub const MIN: Self = Self(1);

    /// Create a panel id, rejecting zero.
    pub fn new(raw: u64) -> Result<Self, LayoutError> {
        if raw == 0 {
            return Err(LayoutError::ZeroPanelId);
        }
        Ok(Self(raw))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Next id, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, LayoutError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(LayoutError::PanelIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for PanelId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compass-side anchor of a docked panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    /// Pinned to the top edge; members stack left to right.
    #[serde(rename = "N")]
    North,
    /// Pinned to the bottom edge; members stack left to right.
    #[serde(rename = "S")]
    South,
    /// Pinned to the right edge; members stack top to bottom.
    #[serde(rename = "E")]
    East,
    /// Pinned to the left edge; members stack top to bottom.
    #[serde(rename = "W")]
    West,
    /// Fills the remaining middle space. By caller convention the middle
    /// set is arranged last; this is not enforced.
    #[serde(rename = "M")]
    Middle,
    /// Joins the dock set of the preceding anchored sibling.
    #[serde(rename = "A")]
    Attached,
}

impl Anchor {
    /// Whether a dock set anchored to this side stacks along the Y axis.
    #[must_use]
    pub const fn stacks_vertically(self) -> bool {
        matches!(self, Self::West | Self::East | Self::Middle)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::North => 'N',
            Self::South => 'S',
            Self::East => 'E',
            Self::West => 'W',
            Self::Middle => 'M',
            Self::Attached => 'A',
        };
        write!(f, "{c}")
    }
}

/// Drag-cursor hint carried by a splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeCursor {
    /// Boundary between vertically stacked members.
    Row,
    /// Boundary between horizontally stacked members.
    Col,
}

impl ResizeCursor {
    /// CSS cursor keyword for this orientation.
    #[must_use]
    pub const fn css_hint(self) -> &'static str {
        match self {
            Self::Row => "row-resize",
            Self::Col => "col-resize",
        }
    }
}

/// Closed set of panel variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    /// A docking container that arranges children.
    Dock,
    /// A thin resize handle between two dock-set members.
    Splitter,
}

impl PanelKind {
    /// Resolve a view-model kind tag.
    ///
    /// Unknown tags are an explicit error rather than a silent fault.
    pub fn from_tag(tag: &str) -> Result<Self, LayoutError> {
        match tag {
            "Dock" => Ok(Self::Dock),
            "Splitter" => Ok(Self::Splitter),
            other => Err(LayoutError::UnknownKind {
                name: other.to_string(),
            }),
        }
    }
}

/// One node in the panel tree.
#[derive(Debug, Clone)]
pub struct Panel {
    pub id: PanelId,
    pub kind: PanelKind,
    pub parent: Option<PanelId>,
    /// Anchor side; `None` means free-floating (skipped by dock sets).
    pub anchor: Option<Anchor>,
    /// Declared width.
    pub width: Dim,
    /// Declared height.
    pub height: Dim,
    pub min_width: f64,
    pub min_height: f64,
    pub border: f64,
    pub padding: f64,
    /// Resolved position relative to the parent's content box.
    pub x: f64,
    pub y: f64,
    /// Resolved extents in pixels. Negative values mark starved panels.
    pub w: f64,
    pub h: f64,
    pub visible: bool,
    /// True when the last size resolution changed either extent.
    pub size_changed: bool,
    /// Child panels in arrangement order. Splitters are not children.
    pub children: Vec<PanelId>,
    /// Splitters injected between this panel's children, for pruning.
    pub splitters: Vec<PanelId>,
    /// Trailing stretch splitter owned by this panel as a dock-set member.
    pub splitter: Option<PanelId>,
    /// Splitter orientation hint. `None` on dock panels.
    pub cursor: Option<ResizeCursor>,
    /// Splitter liveness mark for the current arrangement pass.
    pub in_use: bool,
    /// The dock-set member a splitter trails. `None` on dock panels.
    pub owner: Option<PanelId>,
}

impl Panel {
    /// Combined border-plus-padding inset applied to both edges of an axis.
    #[inline]
    #[must_use]
    pub fn inset(&self) -> f64 {
        2.0 * (self.border + self.padding)
    }

    /// Resolved width minus the inset, the percentage reference for children.
    #[inline]
    #[must_use]
    pub fn inner_width(&self) -> f64 {
        self.w - self.inset()
    }

    /// Resolved height minus the inset.
    #[inline]
    #[must_use]
    pub fn inner_height(&self) -> f64 {
        self.h - self.inset()
    }
}

/// Serializable view model for building panel subtrees.
///
/// Every field is optional; absent sizes fall back to [`LayoutConfig`]
/// defaults. `kind` is a string tag so untyped host data can round-trip
/// through it, with unknown tags rejected at instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSpec {
    #[serde(default = "PanelSpec::default_kind")]
    pub kind: String,
    #[serde(default)]
    pub anchor: Option<Anchor>,
    #[serde(default)]
    pub width: Option<Dim>,
    #[serde(default)]
    pub height: Option<Dim>,
    #[serde(default)]
    pub min_width: Option<f64>,
    #[serde(default)]
    pub min_height: Option<f64>,
    #[serde(default)]
    pub border: Option<f64>,
    #[serde(default)]
    pub padding: Option<f64>,
    #[serde(default)]
    pub children: Vec<PanelSpec>,
}

impl PanelSpec {
    fn default_kind() -> String {
        "Dock".to_string()
    }

    /// A dock spec with just an anchor and declared size.
    #[must_use]
    pub fn dock(anchor: Option<Anchor>, width: impl Into<Dim>, height: impl Into<Dim>) -> Self {
        Self {
            kind: Self::default_kind(),
            anchor,
            width: Some(width.into()),
            height: Some(height.into()),
            min_width: None,
            min_height: None,
            border: None,
            padding: None,
            children: Vec::new(),
        }
    }

    /// Append a child spec, builder style.
    #[must_use]
    pub fn child(mut self, spec: PanelSpec) -> Self {
        self.children.push(spec);
        self
    }
}

/// Errors from tree construction and the view-model factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Panel id 0 is reserved.
    ZeroPanelId,
    /// The id space is exhausted.
    PanelIdOverflow { current: PanelId },
    /// A view-model kind tag named no known panel variant.
    UnknownKind { name: String },
    /// An operation referenced a panel that is not in the tree.
    UnknownPanel { id: PanelId },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPanelId => write!(f, "panel id 0 is invalid"),
            Self::PanelIdOverflow { current } => {
                write!(f, "panel id overflow after {current}")
            }
            Self::UnknownKind { name } => write!(f, "unknown panel kind {name:?}"),
            Self::UnknownPanel { id } => write!(f, "panel {id} is not in the tree"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Id-keyed panel arena.
#[derive(Debug, Default)]
pub struct PanelTree {
    nodes: BTreeMap<PanelId, Panel>,
    next_id: PanelId,
    roots: Vec<PanelId>,
}

impl PanelTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a panel.
    #[must_use]
    pub fn get(&self, id: PanelId) -> Option<&Panel> {
        self.nodes.get(&id)
    }

    /// Look up a panel mutably.
    pub fn get_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.nodes.get_mut(&id)
    }

    /// Whether the id names a live node.
    #[must_use]
    pub fn contains(&self, id: PanelId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Root panels in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[PanelId] {
        &self.roots
    }

    /// Number of live nodes, splitters included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no nodes exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all live nodes in id order.
    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.nodes.values()
    }

    fn alloc(&mut self) -> Result<PanelId, LayoutError> {
        let id = self.next_id;
        self.next_id = id.checked_next()?;
        Ok(id)
    }

    /// Instantiate a view-model subtree under `parent` (or as a new root).
    ///
    /// Dock children are appended to the parent's arrangement order;
    /// splitter specs attach to the parent without joining it. The new
    /// subtree carries no geometry until the next layout pass.
    pub fn insert_spec(
        &mut self,
        spec: &PanelSpec,
        parent: Option<PanelId>,
        cfg: &LayoutConfig,
    ) -> Result<PanelId, LayoutError> {
        let kind = PanelKind::from_tag(&spec.kind)?;
        if let Some(pid) = parent
            && !self.contains(pid)
        {
            return Err(LayoutError::UnknownPanel { id: pid });
        }
        let id = self.alloc()?;
        let panel = Panel {
            id,
            kind,
            parent,
            anchor: spec.anchor,
            width: spec.width.unwrap_or(cfg.default_width),
            height: spec.height.unwrap_or(cfg.default_height),
            min_width: spec.min_width.unwrap_or(cfg.min_width),
            min_height: spec.min_height.unwrap_or(cfg.min_height),
            border: spec.border.unwrap_or(0.0),
            padding: spec.padding.unwrap_or(0.0),
            x: 0.0,
            y: 0.0,
            w: 0.0,
            h: 0.0,
            visible: true,
            size_changed: false,
            children: Vec::new(),
            splitters: Vec::new(),
            splitter: None,
            cursor: None,
            in_use: false,
            owner: None,
        };
        self.nodes.insert(id, panel);
        match parent {
            Some(pid) => {
                if let Some(p) = self.nodes.get_mut(&pid) {
                    match kind {
                        PanelKind::Dock => p.children.push(id),
                        PanelKind::Splitter => p.splitters.push(id),
                    }
                }
            }
            None => self.roots.push(id),
        }
        for child in &spec.children {
            self.insert_spec(child, Some(id), cfg)?;
        }
        Ok(id)
    }

    /// Create a splitter trailing `owner` inside `parent`.
    pub(crate) fn alloc_splitter(
        &mut self,
        parent: PanelId,
        owner: PanelId,
        cursor: ResizeCursor,
        cfg: &LayoutConfig,
    ) -> Result<PanelId, LayoutError> {
        let id = self.alloc()?;
        let splitter = Panel {
            id,
            kind: PanelKind::Splitter,
            parent: Some(parent),
            anchor: None,
            width: Dim::Px(0.0),
            height: Dim::Px(0.0),
            min_width: cfg.min_width,
            min_height: cfg.min_height,
            border: 0.0,
            padding: 0.0,
            x: 0.0,
            y: 0.0,
            w: 0.0,
            h: 0.0,
            visible: true,
            size_changed: false,
            children: Vec::new(),
            splitters: Vec::new(),
            splitter: None,
            cursor: Some(cursor),
            in_use: true,
            owner: Some(owner),
        };
        self.nodes.insert(id, splitter);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.splitters.push(id);
        }
        if let Some(m) = self.nodes.get_mut(&owner) {
            m.splitter = Some(id);
        }
        Ok(id)
    }

    /// Remove a panel and everything it transitively owns.
    ///
    /// Children, their splitters, and the panel's own trailing splitter are
    /// all removed; the surface is notified for every node torn down.
    pub fn remove(&mut self, id: PanelId, surface: &mut dyn Surface) -> Result<(), LayoutError> {
        if !self.contains(id) {
            return Err(LayoutError::UnknownPanel { id });
        }
        let mut doomed: FxHashSet<PanelId> = FxHashSet::default();
        let mut work = vec![id];
        while let Some(cur) = work.pop() {
            if !doomed.insert(cur) {
                continue;
            }
            if let Some(p) = self.nodes.get(&cur) {
                work.extend(p.children.iter().copied());
                work.extend(p.splitters.iter().copied());
                if let Some(sp) = p.splitter {
                    work.push(sp);
                }
            }
        }
        // Unlink from survivors before dropping the nodes.
        let parent = self.nodes.get(&id).and_then(|p| p.parent);
        if let Some(pid) = parent
            && let Some(p) = self.nodes.get_mut(&pid)
        {
            p.children.retain(|c| !doomed.contains(c));
            p.splitters.retain(|s| !doomed.contains(s));
        }
        self.roots.retain(|r| !doomed.contains(r));
        for gone in &doomed {
            if let Some(node) = self.nodes.remove(gone) {
                if let Some(owner) = node.owner
                    && let Some(m) = self.nodes.get_mut(&owner)
                    && m.splitter == Some(*gone)
                {
                    m.splitter = None;
                }
                surface.destroy(*gone);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;

    fn cfg() -> LayoutConfig {
        LayoutConfig::default()
    }

    // =========================================================================
    // Id tests
    // =========================================================================

    #[test]
    fn zero_id_rejected() {
        assert_eq!(PanelId::new(0), Err(LayoutError::ZeroPanelId));
    }

    #[test]
    fn ids_are_sequential() {
        let mut tree = PanelTree::new();
        let a = tree
            .insert_spec(&PanelSpec::dock(None, 10.0, 10.0), None, &cfg())
            .unwrap();
        let b = tree
            .insert_spec(&PanelSpec::dock(None, 10.0, 10.0), None, &cfg())
            .unwrap();
        assert!(b > a);
        assert_eq!(a, PanelId::MIN);
    }

    // =========================================================================
    // Factory tests
    // =========================================================================

    #[test]
    fn unknown_kind_is_an_error() {
        let mut tree = PanelTree::new();
        let spec = PanelSpec {
            kind: "Ribbon".to_string(),
            ..PanelSpec::dock(None, 10.0, 10.0)
        };
        let err = tree.insert_spec(&spec, None, &cfg()).unwrap_err();
        assert_eq!(
            err,
            LayoutError::UnknownKind {
                name: "Ribbon".to_string()
            }
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn spec_defaults_come_from_config() {
        let mut tree = PanelTree::new();
        let spec = PanelSpec {
            kind: "Dock".to_string(),
            anchor: None,
            width: None,
            height: None,
            min_width: None,
            min_height: None,
            border: None,
            padding: None,
            children: Vec::new(),
        };
        let id = tree.insert_spec(&spec, None, &cfg()).unwrap();
        let p = tree.get(id).unwrap();
        assert_eq!(p.width, Dim::Px(200.0));
        assert_eq!(p.height, Dim::Px(200.0));
        assert_eq!(p.min_width, 50.0);
        assert_eq!(p.min_height, 40.0);
    }

    #[test]
    fn children_join_parent_in_order() {
        let mut tree = PanelTree::new();
        let spec = PanelSpec::dock(None, 100.0, 100.0)
            .child(PanelSpec::dock(Some(Anchor::North), 10.0, 10.0))
            .child(PanelSpec::dock(Some(Anchor::West), 10.0, 10.0));
        let root = tree.insert_spec(&spec, None, &cfg()).unwrap();
        let kids = &tree.get(root).unwrap().children;
        assert_eq!(kids.len(), 2);
        assert_eq!(tree.get(kids[0]).unwrap().anchor, Some(Anchor::North));
        assert_eq!(tree.get(kids[1]).unwrap().anchor, Some(Anchor::West));
    }

    #[test]
    fn spec_round_trips_through_json() {
        let json = r#"{
            "anchor": "W",
            "width": "50%",
            "height": 300,
            "children": [{ "anchor": "A", "width": 80, "height": "25%" }]
        }"#;
        let spec: PanelSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.kind, "Dock");
        assert_eq!(spec.anchor, Some(Anchor::West));
        assert_eq!(spec.width, Some(Dim::Percent(50.0)));
        assert_eq!(spec.height, Some(Dim::Px(300.0)));
        assert_eq!(spec.children.len(), 1);
        assert_eq!(spec.children[0].anchor, Some(Anchor::Attached));
    }

    // =========================================================================
    // Removal tests
    // =========================================================================

    #[test]
    fn remove_tears_down_subtree() {
        let mut tree = PanelTree::new();
        let spec = PanelSpec::dock(None, 100.0, 100.0)
            .child(PanelSpec::dock(Some(Anchor::West), 10.0, 10.0).child(PanelSpec::dock(
                Some(Anchor::North),
                5.0,
                5.0,
            )));
        let root = tree.insert_spec(&spec, None, &cfg()).unwrap();
        assert_eq!(tree.len(), 3);
        let mut surface = HeadlessSurface::new(100.0, 100.0);
        tree.remove(root, &mut surface).unwrap();
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
    }

    #[test]
    fn remove_unknown_panel_errors() {
        let mut tree = PanelTree::new();
        let mut surface = HeadlessSurface::new(100.0, 100.0);
        let missing = PanelId::new(42).unwrap();
        assert_eq!(
            tree.remove(missing, &mut surface),
            Err(LayoutError::UnknownPanel { id: missing })
        );
    }

    #[test]
    fn remove_child_unlinks_from_parent() {
        let mut tree = PanelTree::new();
        let spec = PanelSpec::dock(None, 100.0, 100.0)
            .child(PanelSpec::dock(Some(Anchor::West), 10.0, 10.0))
            .child(PanelSpec::dock(Some(Anchor::East), 10.0, 10.0));
        let root = tree.insert_spec(&spec, None, &cfg()).unwrap();
        let first = tree.get(root).unwrap().children[0];
        let mut surface = HeadlessSurface::new(100.0, 100.0);
        tree.remove(first, &mut surface).unwrap();
        assert_eq!(tree.get(root).unwrap().children.len(), 1);
        assert!(!tree.contains(first));
    }

    // =========================================================================
    // Misc model tests
    // =========================================================================

    #[test]
    fn anchor_stacking_axis() {
        assert!(Anchor::West.stacks_vertically());
        assert!(Anchor::East.stacks_vertically());
        assert!(Anchor::Middle.stacks_vertically());
        assert!(!Anchor::North.stacks_vertically());
        assert!(!Anchor::South.stacks_vertically());
        assert!(!Anchor::Attached.stacks_vertically());
    }

    #[test]
    fn cursor_hints() {
        assert_eq!(ResizeCursor::Row.css_hint(), "row-resize");
        assert_eq!(ResizeCursor::Col.css_hint(), "col-resize");
    }

    #[test]
    fn inner_size_subtracts_inset() {
        let mut tree = PanelTree::new();
        let spec = PanelSpec {
            border: Some(2.0),
            padding: Some(3.0),
            ..PanelSpec::dock(None, 100.0, 100.0)
        };
        let id = tree.insert_spec(&spec, None, &cfg()).unwrap();
        let p = tree.get_mut(id).unwrap();
        p.w = 100.0;
        p.h = 60.0;
        assert_eq!(p.inset(), 10.0);
        assert_eq!(p.inner_width(), 90.0);
        assert_eq!(p.inner_height(), 50.0);
    }
}
