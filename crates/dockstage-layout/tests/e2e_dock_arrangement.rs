//! End-to-end dock arrangement: a JSON view model instantiated into a tree,
//! laid out against a recording surface, resized, and partially torn down.

use dockstage_core::geometry::PxSize;
use dockstage_layout::{
    Geometry, LayoutConfig, PanelId, PanelKind, PanelSpec, PanelTree, Surface, relayout,
};
use rustc_hash::FxHashMap;

/// Surface double that records every geometry push and teardown.
struct RecordingSurface {
    size: PxSize,
    geometry: FxHashMap<PanelId, Geometry>,
    destroyed: Vec<PanelId>,
}

impl RecordingSurface {
    fn new(w: f64, h: f64) -> Self {
        Self {
            size: PxSize::new(w, h),
            geometry: FxHashMap::default(),
            destroyed: Vec::new(),
        }
    }
}

impl Surface for RecordingSurface {
    fn client_size(&self) -> PxSize {
        self.size
    }

    fn apply_geometry(&mut self, id: PanelId, geometry: &Geometry) {
        self.geometry.insert(id, *geometry);
    }

    fn destroy(&mut self, id: PanelId) {
        self.destroyed.push(id);
    }
}

const WORKBENCH: &str = r#"{
    "width": "100%",
    "height": "100%",
    "children": [
        { "anchor": "N", "width": 400, "height": 40 },
        {
            "anchor": "W", "width": 200, "height": 300,
            "children": [
                { "anchor": "W", "width": 180, "height": 100 },
                { "anchor": "A", "width": 180, "height": 300 }
            ]
        },
        { "anchor": "M", "width": 100, "height": 100 }
    ]
}"#;

fn build(surface_w: f64, surface_h: f64) -> (PanelTree, PanelId, RecordingSurface, LayoutConfig) {
    let cfg = LayoutConfig::default();
    let spec: PanelSpec = serde_json::from_str(WORKBENCH).expect("workbench spec parses");
    let mut tree = PanelTree::new();
    let root = tree.insert_spec(&spec, None, &cfg).expect("spec instantiates");
    let surface = RecordingSurface::new(surface_w, surface_h);
    (tree, root, surface, cfg)
}

fn kid(tree: &PanelTree, parent: PanelId, n: usize) -> PanelId {
    tree.get(parent).unwrap().children[n]
}

#[test]
fn workbench_layout_carves_the_client_area() {
    let (mut tree, root, mut surface, cfg) = build(800.0, 600.0);
    relayout(&mut tree, root, &mut surface, &cfg);

    let toolbar = tree.get(kid(&tree, root, 0)).unwrap();
    assert_eq!((toolbar.x, toolbar.y), (0.0, 0.0));
    assert_eq!((toolbar.w, toolbar.h), (800.0, 40.0));

    let nav = tree.get(kid(&tree, root, 1)).unwrap();
    assert_eq!((nav.x, nav.y), (0.0, 45.0));
    assert_eq!((nav.w, nav.h), (200.0, 555.0));

    let editor = tree.get(kid(&tree, root, 2)).unwrap();
    assert_eq!((editor.x, editor.y), (205.0, 45.0));
    assert_eq!((editor.w, editor.h), (595.0, 555.0));

    // Every docked panel reached the surface.
    assert!(surface.geometry.contains_key(&kid(&tree, root, 0)));
    assert!(surface.geometry.contains_key(&kid(&tree, root, 2)));
}

#[test]
fn nested_attached_pair_splits_the_nav_exactly() {
    let (mut tree, root, mut surface, cfg) = build(800.0, 600.0);
    relayout(&mut tree, root, &mut surface, &cfg);

    let nav = kid(&tree, root, 1);
    let top = tree.get(kid(&tree, nav, 0)).unwrap();
    let bottom = tree.get(kid(&tree, nav, 1)).unwrap();

    // nav is 200x555; declared heights 100/300 scale into 550 usable px.
    assert_eq!(top.h, 137.0);
    assert_eq!(bottom.h, 413.0);
    assert_eq!(top.h + 5.0 + bottom.h, 555.0);

    let sid = tree.get(kid(&tree, nav, 0)).unwrap().splitter.unwrap();
    let splitter = tree.get(sid).unwrap();
    assert_eq!(splitter.kind, PanelKind::Splitter);
    assert_eq!((splitter.x, splitter.y), (0.0, 137.0));
    assert_eq!((splitter.w, splitter.h), (180.0, 5.0));
    let pushed = surface.geometry.get(&sid).unwrap();
    assert!(pushed.visible);
}

#[test]
fn resize_reuses_splitters_and_moves_geometry() {
    let (mut tree, root, mut surface, cfg) = build(800.0, 600.0);
    relayout(&mut tree, root, &mut surface, &cfg);
    let nav = kid(&tree, root, 1);
    let sid = tree.get(kid(&tree, nav, 0)).unwrap().splitter.unwrap();
    let before = tree.len();

    surface.size = PxSize::new(1024.0, 768.0);
    relayout(&mut tree, root, &mut surface, &cfg);

    // Same splitter node, no churn in the arena.
    assert_eq!(tree.get(kid(&tree, nav, 0)).unwrap().splitter, Some(sid));
    assert_eq!(tree.len(), before);
    assert!(surface.destroyed.is_empty());

    // The editor tracked the larger client area.
    let editor = tree.get(kid(&tree, root, 2)).unwrap();
    assert_eq!(editor.w, 1024.0 - 205.0);
    assert_eq!(editor.h, 768.0 - 45.0);
}

#[test]
fn removing_a_pane_prunes_its_sibling_splitter() {
    let (mut tree, root, mut surface, cfg) = build(800.0, 600.0);
    relayout(&mut tree, root, &mut surface, &cfg);
    let nav = kid(&tree, root, 1);
    let top = kid(&tree, nav, 0);
    let bottom = kid(&tree, nav, 1);
    let sid = tree.get(top).unwrap().splitter.unwrap();

    tree.remove(bottom, &mut surface).unwrap();
    relayout(&mut tree, root, &mut surface, &cfg);

    assert!(!tree.contains(sid));
    assert!(tree.get(top).unwrap().splitter.is_none());
    assert!(surface.destroyed.contains(&bottom));
    assert!(surface.destroyed.contains(&sid));

    // The survivor absorbed the whole nav span.
    assert_eq!(tree.get(top).unwrap().h, 555.0);
}

#[test]
fn starved_layout_hides_panels_instead_of_failing() {
    let (mut tree, root, mut surface, cfg) = build(120.0, 60.0);
    relayout(&mut tree, root, &mut surface, &cfg);

    // The editor's remaining width goes negative and it hides, but every
    // panel still got deterministic geometry pushed.
    assert!(!tree.get(kid(&tree, root, 2)).unwrap().visible);
    for id in [kid(&tree, root, 0), kid(&tree, root, 1), kid(&tree, root, 2)] {
        assert!(surface.geometry.contains_key(&id));
    }
}
