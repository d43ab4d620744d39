//! In-memory image engine backed by JSON layer-tree snapshots.
//!
//! A snapshot records the canvas size and the layer tree with each layer's
//! offset, extent, visibility and mask state; no pixel data. Saving writes the
//! mutated snapshot, whatever the output extension, so exports can be
//! inspected and tested without an image editor.
//!
//! ```json
//! {
//!   "width": 200,
//!   "height": 100,
//!   "layers": [
//!     { "name": "ui", "layers": [{ "name": "button", "x": 10, "y": 10, "width": 40, "height": 20 }] },
//!     { "name": "bg", "width": 200, "height": 100 }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use layercut_common::{LayercutError, LayercutResult};
use layercut_schema::{round_px, Rect};
use serde::{Deserialize, Serialize};

use crate::document::{Document, ImageEngine, LayerId, LayerInfo};

/// Suffix appended to a document path to find its snapshot.
pub const SNAPSHOT_SUFFIX: &str = ".layers.json";

fn default_visible() -> bool {
    true
}

/// One layer of a snapshot. A layer with `layers` is a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryLayer {
    pub name: String,

    #[serde(default = "default_visible")]
    pub visible: bool,

    #[serde(default)]
    pub mask_applied: bool,

    #[serde(default)]
    pub x: i64,

    #[serde(default)]
    pub y: i64,

    #[serde(default)]
    pub width: i64,

    #[serde(default)]
    pub height: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<MemoryLayer>>,
}

impl MemoryLayer {
    pub fn leaf(name: impl Into<String>, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            name: name.into(),
            visible: true,
            mask_applied: false,
            x,
            y,
            width,
            height,
            layers: None,
        }
    }

    /// A visible group. Its extent is the union of its children.
    pub fn group(name: impl Into<String>, layers: Vec<MemoryLayer>) -> Self {
        let extent = layers
            .iter()
            .map(|l| (l.x, l.y, l.x + l.width, l.y + l.height))
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
            .unwrap_or_default();
        Self {
            name: name.into(),
            visible: true,
            mask_applied: false,
            x: extent.0,
            y: extent.1,
            width: extent.2 - extent.0,
            height: extent.3 - extent.1,
            layers: Some(layers),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn masked(mut self) -> Self {
        self.mask_applied = true;
        self
    }

    pub fn is_group(&self) -> bool {
        self.layers.is_some()
    }

    fn info(&self) -> LayerInfo {
        LayerInfo {
            name: self.name.clone(),
            visible: self.visible,
            mask_applied: self.mask_applied,
            is_group: self.is_group(),
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    fn for_each_mut(layers: &mut [MemoryLayer], f: &mut impl FnMut(&mut MemoryLayer)) {
        for layer in layers {
            f(layer);
            if let Some(children) = layer.layers.as_mut() {
                Self::for_each_mut(children, f);
            }
        }
    }
}

/// A document held entirely in memory.
///
/// Layer ids are pre-order positions in the tree, so they stay valid for the
/// life of the document (the tree shape never changes). The id index is built
/// on first use; reshaping `layers` by hand after that is not supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryDocument {
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub layers: Vec<MemoryLayer>,
    #[serde(skip)]
    index: OnceLock<Vec<Slot>>,
}

impl PartialEq for MemoryDocument {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.layers == other.layers
    }
}

impl Eq for MemoryDocument {}

/// One entry of the pre-order index: tree links plus the position of the
/// layer in the nested `layers` vectors.
#[derive(Debug, Clone)]
struct Slot {
    parent: Option<LayerId>,
    children: Vec<LayerId>,
    position: Vec<usize>,
}

fn build_index(layers: &[MemoryLayer]) -> Vec<Slot> {
    fn visit(layers: &[MemoryLayer], parent: Option<LayerId>, prefix: &[usize], out: &mut Vec<Slot>) {
        for (i, layer) in layers.iter().enumerate() {
            let id = out.len();
            let mut position = prefix.to_vec();
            position.push(i);
            if let Some(parent) = parent {
                out[parent].children.push(id);
            }
            out.push(Slot {
                parent,
                children: Vec::new(),
                position: position.clone(),
            });
            if let Some(children) = &layer.layers {
                visit(children, Some(id), &position, out);
            }
        }
    }

    let mut out = Vec::new();
    visit(layers, None, &[], &mut out);
    out
}

impl MemoryDocument {
    pub fn new(width: i64, height: i64, layers: Vec<MemoryLayer>) -> Self {
        Self {
            width,
            height,
            layers,
            index: OnceLock::new(),
        }
    }

    /// Read a snapshot from `path`.
    pub fn load(path: &Path) -> LayercutResult<Self> {
        if !path.exists() {
            return Err(LayercutError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Layer state by name path, for inspection.
    pub fn layer_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&MemoryLayer> {
        let (first, rest) = path.split_first()?;
        let mut layer = self.layers.iter().find(|l| l.name == first.as_ref())?;
        for name in rest {
            layer = layer
                .layers
                .as_ref()?
                .iter()
                .find(|l| l.name == name.as_ref())?;
        }
        Some(layer)
    }

    fn index(&self) -> &[Slot] {
        self.index.get_or_init(|| build_index(&self.layers))
    }

    fn layer(&self, id: LayerId) -> Option<&MemoryLayer> {
        let (first, rest) = self.index().get(id)?.position.split_first()?;
        let mut layer = self.layers.get(*first)?;
        for i in rest {
            layer = layer.layers.as_ref()?.get(*i)?;
        }
        Some(layer)
    }

    fn layer_mut(&mut self, id: LayerId) -> LayercutResult<&mut MemoryLayer> {
        fn descend<'a>(layers: &'a mut [MemoryLayer], position: &[usize]) -> Option<&'a mut MemoryLayer> {
            let (first, rest) = position.split_first()?;
            let layer = layers.get_mut(*first)?;
            if rest.is_empty() {
                return Some(layer);
            }
            descend(layer.layers.as_mut()?, rest)
        }

        let position = self
            .index()
            .get(id)
            .map(|slot| slot.position.clone())
            .ok_or_else(|| unknown_layer(id))?;
        descend(&mut self.layers, &position).ok_or_else(|| unknown_layer(id))
    }
}

fn unknown_layer(id: LayerId) -> LayercutError {
    LayercutError::document(format!("no layer with id {id}"))
}

impl Document for MemoryDocument {
    fn width(&self) -> i64 {
        self.width
    }

    fn height(&self) -> i64 {
        self.height
    }

    fn layers(&self) -> Vec<LayerId> {
        self.index()
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    fn children(&self, layer: LayerId) -> Vec<LayerId> {
        self.index()
            .get(layer)
            .map(|slot| slot.children.clone())
            .unwrap_or_default()
    }

    fn info(&self, layer: LayerId) -> LayercutResult<LayerInfo> {
        self.layer(layer)
            .map(MemoryLayer::info)
            .ok_or_else(|| unknown_layer(layer))
    }

    fn find_layer(&self, name: &str) -> Option<LayerId> {
        (0..self.index().len()).find(|&id| self.layer(id).is_some_and(|l| l.name == name))
    }

    fn set_visible(&mut self, layer: LayerId, visible: bool) -> LayercutResult<()> {
        self.layer_mut(layer)?.visible = visible;
        Ok(())
    }

    fn set_mask_applied(&mut self, layer: LayerId, applied: bool) -> LayercutResult<()> {
        self.layer_mut(layer)?.mask_applied = applied;
        Ok(())
    }

    fn crop(&mut self, region: Rect) -> LayercutResult<()> {
        if region.width < 0 || region.height < 0 {
            return Err(LayercutError::document(format!(
                "invalid crop region {}x{}",
                region.width, region.height
            )));
        }
        self.width = region.width;
        self.height = region.height;
        MemoryLayer::for_each_mut(&mut self.layers, &mut |layer| {
            layer.x -= region.x;
            layer.y -= region.y;
        });
        Ok(())
    }

    fn scale(&mut self, width: i64, height: i64) -> bool {
        if width <= 0 || height <= 0 || self.width <= 0 || self.height <= 0 {
            return false;
        }
        let fx = width as f64 / self.width as f64;
        let fy = height as f64 / self.height as f64;
        MemoryLayer::for_each_mut(&mut self.layers, &mut |layer| {
            layer.x = round_px(layer.x as f64 * fx);
            layer.y = round_px(layer.y as f64 * fy);
            layer.width = round_px(layer.width as f64 * fx);
            layer.height = round_px(layer.height as f64 * fy);
        });
        self.width = width;
        self.height = height;
        true
    }

    fn save(&self, path: &Path) -> LayercutResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Engine that loads [`MemoryDocument`] snapshots from disk.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    live: AtomicUsize,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the snapshot for `path` lives: `path` itself when it is a JSON
    /// file, else `path` with [`SNAPSHOT_SUFFIX`] appended.
    pub fn snapshot_path(path: &Path) -> PathBuf {
        if path.extension().is_some_and(|ext| ext == "json") {
            return path.to_path_buf();
        }
        let mut snapshot = path.as_os_str().to_owned();
        snapshot.push(SNAPSHOT_SUFFIX);
        PathBuf::from(snapshot)
    }

    /// Take ownership of an already-built document.
    pub fn adopt(&self, document: MemoryDocument) -> MemoryDocument {
        self.live.fetch_add(1, Ordering::SeqCst);
        document
    }

    /// Documents opened or duplicated and not yet disposed.
    pub fn live_documents(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl ImageEngine for MemoryEngine {
    type Document = MemoryDocument;

    fn name(&self) -> &str {
        "memory"
    }

    fn open(&self, path: &Path) -> LayercutResult<MemoryDocument> {
        let document = MemoryDocument::load(&Self::snapshot_path(path))?;
        tracing::debug!(
            path = %path.display(),
            width = document.width,
            height = document.height,
            "Loaded document snapshot"
        );
        Ok(self.adopt(document))
    }

    fn duplicate(&self, document: &MemoryDocument) -> LayercutResult<MemoryDocument> {
        Ok(self.adopt(document.clone()))
    }

    fn dispose(&self, document: &mut MemoryDocument) {
        document.layers.clear();
        document.index.take();
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> MemoryDocument {
        MemoryDocument::new(
            200,
            100,
            vec![
                MemoryLayer::group("ui", vec![MemoryLayer::leaf("button", 10, 20, 40, 20)]),
                MemoryLayer::leaf("bg", 0, 0, 200, 100),
            ],
        )
    }

    #[test]
    fn test_ids_follow_preorder() {
        let d = doc();
        assert_eq!(d.layers(), vec![0, 2]);
        assert_eq!(d.children(0), vec![1]);
        assert!(d.children(1).is_empty());
        assert_eq!(d.find_layer("button"), Some(1));
        assert_eq!(d.find_layer("missing"), None);
        assert_eq!(d.info(2).unwrap().name, "bg");
        assert!(d.info(3).is_err());
    }

    #[test]
    fn test_index_tracks_nested_groups() {
        let d = MemoryDocument::new(
            50,
            50,
            vec![
                MemoryLayer::group(
                    "a",
                    vec![
                        MemoryLayer::group("b", vec![MemoryLayer::leaf("c", 0, 0, 5, 5)]),
                        MemoryLayer::leaf("d", 0, 0, 5, 5),
                    ],
                ),
                MemoryLayer::leaf("e", 0, 0, 5, 5),
            ],
        );
        assert_eq!(d.layers(), vec![0, 4]);
        assert_eq!(d.children(0), vec![1, 3]);
        assert_eq!(d.children(1), vec![2]);
        assert_eq!(d.info(2).unwrap().name, "c");
        assert_eq!(d.find_layer("d"), Some(3));

        let mut copy = d.clone();
        copy.set_visible(2, false).unwrap();
        assert!(!copy.layer_at(&["a", "b", "c"]).unwrap().visible);
        assert!(d.layer_at(&["a", "b", "c"]).unwrap().visible);
        assert_ne!(copy, d);
    }

    #[test]
    fn test_group_extent_is_union_of_children() {
        let d = doc();
        let ui = d.info(0).unwrap();
        assert!(ui.is_group);
        assert_eq!(ui.rect(), Rect::new(10, 20, 40, 20));
    }

    #[test]
    fn test_mutations() {
        let mut d = doc();
        d.set_visible(1, false).unwrap();
        d.set_mask_applied(2, true).unwrap();
        assert!(!d.layer_at(&["ui", "button"]).unwrap().visible);
        assert!(d.layer_at(&["bg"]).unwrap().mask_applied);
        assert!(d.set_visible(9, true).is_err());
    }

    #[test]
    fn test_crop_then_scale_moves_layers() {
        let mut d = doc();
        d.crop(Rect::new(10, 20, 100, 50)).unwrap();
        assert_eq!((d.width, d.height), (100, 50));
        let button = d.layer_at(&["ui", "button"]).unwrap();
        assert_eq!((button.x, button.y), (0, 0));

        assert!(d.scale(50, 25));
        let bg = d.layer_at(&["bg"]).unwrap();
        assert_eq!((bg.x, bg.y, bg.width, bg.height), (-5, -10, 100, 50));
    }

    #[test]
    fn test_scale_to_nothing_fails() {
        let mut d = doc();
        assert!(!d.scale(0, 10));
        assert_eq!(d.width, 200);
    }

    #[test]
    fn test_snapshot_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("art.xcf.layers.json");
        doc().save(&snapshot).unwrap();

        let engine = MemoryEngine::new();
        let loaded = engine.open(&dir.path().join("art.xcf")).unwrap();
        assert_eq!(loaded, doc());
        assert_eq!(engine.live_documents(), 1);
    }

    #[test]
    fn test_snapshot_defaults() {
        let d: MemoryDocument = serde_json::from_str(
            r#"{"width": 10, "height": 10, "layers": [{"name": "a"}]}"#,
        )
        .unwrap();
        let a = &d.layers[0];
        assert!(a.visible);
        assert!(!a.mask_applied);
        assert!(!a.is_group());
    }

    #[test]
    fn test_open_missing_snapshot() {
        let engine = MemoryEngine::new();
        let err = engine.open(Path::new("/nope/art.xcf")).unwrap_err();
        assert!(matches!(err, LayercutError::FileNotFound { ref path } if path.ends_with("art.xcf.layers.json")));
    }
}
