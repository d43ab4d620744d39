//! The image engine interface the export pipeline drives.
//!
//! An engine owns documents: it opens them, hands out disposable duplicates,
//! and releases them. Documents expose an ordered layer tree and a handful of
//! mutations (visibility, mask application, crop, scale, save).

use std::ops::{Deref, DerefMut};
use std::path::Path;

use layercut_common::LayercutResult;
use layercut_schema::Rect;

/// Engine-assigned handle for one layer within one document.
pub type LayerId = usize;

/// Snapshot of a layer's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    pub visible: bool,
    /// Whether the layer's mask is currently applied.
    pub mask_applied: bool,
    pub is_group: bool,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl LayerInfo {
    /// Offset and extent as a rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// An open layered document.
pub trait Document {
    fn width(&self) -> i64;

    fn height(&self) -> i64;

    /// Top-level layers, topmost first.
    fn layers(&self) -> Vec<LayerId>;

    /// Direct children of a group layer; empty for leaves.
    fn children(&self, layer: LayerId) -> Vec<LayerId>;

    fn info(&self, layer: LayerId) -> LayercutResult<LayerInfo>;

    /// First layer anywhere in the tree with exactly this name.
    fn find_layer(&self, name: &str) -> Option<LayerId>;

    fn set_visible(&mut self, layer: LayerId, visible: bool) -> LayercutResult<()>;

    fn set_mask_applied(&mut self, layer: LayerId, applied: bool) -> LayercutResult<()>;

    /// Crop the canvas to `region`. Layer offsets become relative to its
    /// top-left corner.
    fn crop(&mut self, region: Rect) -> LayercutResult<()>;

    /// Scale the whole document to `width` x `height`. Returns `false` when
    /// the engine refuses.
    fn scale(&mut self, width: i64, height: i64) -> bool;

    /// Write the current content to `path`.
    fn save(&self, path: &Path) -> LayercutResult<()>;
}

/// Loads documents and manages their lifetimes.
pub trait ImageEngine {
    type Document: Document;

    /// Engine name, for logging.
    fn name(&self) -> &str;

    fn open(&self, path: &Path) -> LayercutResult<Self::Document>;

    /// An independent copy of `document`. Mutating the copy never affects
    /// the original.
    fn duplicate(&self, document: &Self::Document) -> LayercutResult<Self::Document>;

    /// Release engine-side resources held by `document`.
    fn dispose(&self, document: &mut Self::Document);
}

/// A document that is disposed through its engine when dropped.
pub struct Scoped<'e, E: ImageEngine> {
    engine: &'e E,
    document: E::Document,
}

impl<'e, E: ImageEngine> Scoped<'e, E> {
    /// Open `path` for the lifetime of the guard.
    pub fn open(engine: &'e E, path: &Path) -> LayercutResult<Self> {
        Ok(Self {
            engine,
            document: engine.open(path)?,
        })
    }

    /// Duplicate `document` for the lifetime of the guard.
    pub fn duplicate(engine: &'e E, document: &E::Document) -> LayercutResult<Self> {
        Ok(Self {
            engine,
            document: engine.duplicate(document)?,
        })
    }
}

impl<E: ImageEngine> Deref for Scoped<'_, E> {
    type Target = E::Document;

    fn deref(&self) -> &Self::Target {
        &self.document
    }
}

impl<E: ImageEngine> DerefMut for Scoped<'_, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.document
    }
}

impl<E: ImageEngine> Drop for Scoped<'_, E> {
    fn drop(&mut self) {
        self.engine.dispose(&mut self.document);
    }
}

/// A layer reached during a depth-first walk, with its name path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerVisit {
    pub id: LayerId,
    /// Names from the top-level ancestor down to this layer.
    pub path: Vec<String>,
    pub info: LayerInfo,
}

/// Depth-first, pre-order walk of the layer tree.
///
/// A layer for which `include` returns `false` is skipped together with its
/// whole subtree.
pub fn walk<D, F>(document: &D, include: F) -> LayercutResult<Vec<LayerVisit>>
where
    D: Document + ?Sized,
    F: Fn(&LayerInfo) -> bool,
{
    let mut visits = Vec::new();
    let mut path = Vec::new();
    walk_into(document, document.layers(), &include, &mut path, &mut visits)?;
    Ok(visits)
}

fn walk_into<D, F>(
    document: &D,
    layers: Vec<LayerId>,
    include: &F,
    path: &mut Vec<String>,
    visits: &mut Vec<LayerVisit>,
) -> LayercutResult<()>
where
    D: Document + ?Sized,
    F: Fn(&LayerInfo) -> bool,
{
    for id in layers {
        let info = document.info(id)?;
        if !include(&info) {
            continue;
        }

        path.push(info.name.clone());
        let is_group = info.is_group;
        visits.push(LayerVisit {
            id,
            path: path.clone(),
            info,
        });
        if is_group {
            walk_into(document, document.children(id), include, path, visits)?;
        }
        path.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, MemoryEngine, MemoryLayer};

    fn sample() -> MemoryDocument {
        MemoryDocument::new(
            100,
            100,
            vec![
                MemoryLayer::group(
                    "ui",
                    vec![
                        MemoryLayer::leaf("button", 0, 0, 10, 10),
                        MemoryLayer::leaf("label", 0, 0, 10, 10).hidden(),
                    ],
                ),
                MemoryLayer::group("hidden", vec![MemoryLayer::leaf("inner", 0, 0, 1, 1)]).hidden(),
                MemoryLayer::leaf("bg", 0, 0, 100, 100),
            ],
        )
    }

    fn paths(visits: &[LayerVisit]) -> Vec<String> {
        visits.iter().map(|v| v.path.join("/")).collect()
    }

    #[test]
    fn test_walk_visits_every_layer_in_order() {
        let doc = sample();
        let visits = walk(&doc, |_| true).unwrap();
        assert_eq!(
            paths(&visits),
            vec!["ui", "ui/button", "ui/label", "hidden", "hidden/inner", "bg"]
        );
    }

    #[test]
    fn test_walk_skips_excluded_subtrees() {
        let doc = sample();
        let visits = walk(&doc, |info| info.visible).unwrap();
        assert_eq!(paths(&visits), vec!["ui", "ui/button", "bg"]);
    }

    #[test]
    fn test_scoped_documents_are_disposed() {
        let engine = MemoryEngine::new();
        let original = engine.adopt(sample());
        {
            let copy = Scoped::duplicate(&engine, &original).unwrap();
            assert_eq!(copy.width(), 100);
            assert_eq!(engine.live_documents(), 2);
        }
        assert_eq!(engine.live_documents(), 1);
    }
}
