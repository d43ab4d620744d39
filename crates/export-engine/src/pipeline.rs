//! Per-export pipeline: validate, apply layer rules, crop, resize, save.
//!
//! Steps run in a fixed order. The crop offset is captured before resizing
//! and then scaled with the document, so the returned geometry is expressed
//! in the coordinate space of the saved artifact.

use std::path::PathBuf;

use layercut_common::{LayercutError, LayercutResult};
use layercut_schema::{bounding_box, Action, Crop, ExportDescriptor, Rect};
use layercut_store::ExportRecord;
use serde::Serialize;

use crate::document::{walk, Document};

/// Final size and position of one exported artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportGeometry {
    pub width: i64,
    pub height: i64,
    pub x_offset: i64,
    pub y_offset: i64,
}

impl ExportGeometry {
    /// Store row for this geometry at `path`.
    pub fn record(&self, path: impl Into<PathBuf>) -> ExportRecord {
        ExportRecord::new(path, self.width, self.height, self.x_offset, self.y_offset)
    }
}

/// Progress callback for export runs.
pub type ProgressCallback = Box<dyn Fn(ExportEvent) + Send>;

/// Notifications emitted while exporting.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    /// An export is about to be processed.
    Started { export: PathBuf },

    /// A layer's rules were applied.
    Layer {
        path: Vec<String>,
        action: Action,
        visible: bool,
        masked: bool,
    },

    Cropped { label: String, region: Rect },

    Resized {
        width: i64,
        height: i64,
        x_offset: i64,
        y_offset: i64,
        x_factor: f64,
        y_factor: f64,
    },

    Saved {
        export: PathBuf,
        geometry: ExportGeometry,
    },
}

fn emit(progress: Option<&ProgressCallback>, event: ExportEvent) {
    if let Some(cb) = progress {
        cb(event);
    }
}

/// Check that every layer or group the export names exists in `document`,
/// along with the crop layer if there is one.
///
/// Runs before any mutation, against the original document.
pub fn validate_export<D>(document: &D, export: &ExportDescriptor<'_>) -> LayercutResult<()>
where
    D: Document + ?Sized,
{
    for name in export.root().explicit_names() {
        if document.find_layer(name).is_none() {
            return Err(LayercutError::validation(
                export.path(),
                format!("No layer named {name:?}"),
            ));
        }
    }

    if let Some(Crop::Layer(name)) = export.crop() {
        if document.find_layer(name).is_none() {
            return Err(LayercutError::validation(
                export.path(),
                format!("No crop layer named {name:?}"),
            ));
        }
    }

    Ok(())
}

/// Run steps 2 to 7 of an export against `document`, which must be a
/// disposable duplicate.
pub fn export_document<D>(
    document: &mut D,
    export: &ExportDescriptor<'_>,
    progress: Option<&ProgressCallback>,
) -> LayercutResult<ExportGeometry>
where
    D: Document + ?Sized,
{
    apply_layer_rules(document, export, progress)?;

    let mut offset = (0, 0);
    if let Some(region) = crop_region(document, export)? {
        let label = export.crop().map_or("none", Crop::label);
        tracing::info!(
            export = %export.path().display(),
            crop = label,
            width = region.width,
            height = region.height,
            x = region.x,
            y = region.y,
            "Cropping"
        );
        document
            .crop(region)
            .map_err(|e| e.for_export(export.path()))?;
        offset = region.offset();
        emit(
            progress,
            ExportEvent::Cropped {
                label: label.to_string(),
                region,
            },
        );
    }

    if let Some(resize) = export.resize() {
        if document.width() <= 0 || document.height() <= 0 {
            return Err(LayercutError::geometry(
                export.path(),
                "Cannot resize an empty image",
            ));
        }
        let plan = resize.plan(document.width(), document.height());
        if !document.scale(plan.width, plan.height) {
            return Err(LayercutError::engine(
                export.path(),
                format!("Scale to {}x{} failed", plan.width, plan.height),
            ));
        }
        offset = plan.scale_offset(offset);
        tracing::info!(
            width = document.width(),
            height = document.height(),
            x = offset.0,
            y = offset.1,
            x_factor = plan.x_factor,
            y_factor = plan.y_factor,
            "Scaled"
        );
        emit(
            progress,
            ExportEvent::Resized {
                width: document.width(),
                height: document.height(),
                x_offset: offset.0,
                y_offset: offset.1,
                x_factor: plan.x_factor,
                y_factor: plan.y_factor,
            },
        );
    }

    let geometry = ExportGeometry {
        width: document.width(),
        height: document.height(),
        x_offset: offset.0,
        y_offset: offset.1,
    };

    if let Some(parent) = export.path().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            LayercutError::engine(
                export.path(),
                format!("Cannot create {}: {e}", parent.display()),
            )
        })?;
    }
    document
        .save(export.path())
        .map_err(|e| e.for_export(export.path()))?;

    emit(
        progress,
        ExportEvent::Saved {
            export: export.path().to_path_buf(),
            geometry,
        },
    );
    Ok(geometry)
}

/// Set visibility and mask application on every layer from its resolved
/// action and mask decision.
pub fn apply_layer_rules<D>(
    document: &mut D,
    export: &ExportDescriptor<'_>,
    progress: Option<&ProgressCallback>,
) -> LayercutResult<()>
where
    D: Document + ?Sized,
{
    for visit in walk(&*document, |_| true)? {
        let resolved = export.get_layer(visit.path.as_slice());

        let visible = match resolved.action {
            Action::Show => true,
            Action::Hide => false,
            Action::Leave => visit.info.visible,
        };
        if visible != visit.info.visible {
            document.set_visible(visit.id, visible)?;
        }

        let masked = match resolved.mask {
            Action::Show => true,
            Action::Hide => false,
            Action::Leave => visit.info.mask_applied,
        };
        if masked != visit.info.mask_applied {
            document.set_mask_applied(visit.id, masked)?;
        }

        tracing::debug!(
            layer = %visit.path.join(" → "),
            action = %resolved.action,
            mask = %resolved.mask,
            visible,
            masked,
            "Applied layer rule"
        );
        emit(
            progress,
            ExportEvent::Layer {
                path: visit.path,
                action: resolved.action,
                visible,
                masked,
            },
        );
    }
    Ok(())
}

/// The region to crop to, or `None` when the export does not crop.
pub fn crop_region<D>(document: &D, export: &ExportDescriptor<'_>) -> LayercutResult<Option<Rect>>
where
    D: Document + ?Sized,
{
    match export.crop() {
        None => Ok(None),
        Some(Crop::BoundingBox) => {
            let leaves = walk(document, |info| info.visible)?
                .into_iter()
                .filter(|visit| !visit.info.is_group)
                .map(|visit| visit.info.rect());
            bounding_box(leaves, document.width(), document.height())
                .map(Some)
                .map_err(|e| LayercutError::geometry(export.path(), e.to_string()))
        }
        Some(Crop::Layer(name)) => {
            let id = document.find_layer(name).ok_or_else(|| {
                LayercutError::geometry(export.path(), format!("No crop layer named {name:?}"))
            })?;
            let info = document.info(id)?;
            Ok(Some(Rect::new(
                info.x.max(0),
                info.y.max(0),
                info.width,
                info.height,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, MemoryLayer};
    use layercut_schema::{build_schema, Schema, SchemaModel};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn schema(root: &Path, exports: &str) -> Schema {
        let yaml = format!("database: db\ndocuments:\n  art.xcf:\n    exports:\n{exports}");
        let model = SchemaModel::from_yaml(&yaml).unwrap();
        build_schema(root, &model).unwrap()
    }

    fn doc() -> MemoryDocument {
        MemoryDocument::new(
            100,
            80,
            vec![
                MemoryLayer::group(
                    "ui",
                    vec![
                        MemoryLayer::leaf("button", 10, 10, 20, 10),
                        MemoryLayer::leaf("label", 50, 40, 30, 10).hidden(),
                    ],
                ),
                MemoryLayer::leaf("frame", -5, 30, 40, 40).masked(),
                MemoryLayer::leaf("bg", 0, 0, 100, 80).hidden(),
            ],
        )
    }

    #[test]
    fn test_validate_reports_missing_layers() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path(), "      a.png: { show: [bg, nope] }\n");
        let err = validate_export(&doc(), &schema.exports()[0]).unwrap_err();
        assert!(matches!(err, LayercutError::Validation { .. }));
        assert!(err.to_string().contains("\"nope\""));
        assert_eq!(err.export_path(), Some(dir.path().join("a.png").as_path()));
    }

    #[test]
    fn test_validate_checks_crop_layer_and_groups() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(
            dir.path(),
            "      a.png: { crop: missing }\n      b.png: { hide: { group: ui, show: [button] } }\n",
        );
        let exports = schema.exports();
        assert!(validate_export(&doc(), &exports[0]).is_err());
        assert!(validate_export(&doc(), &exports[1]).is_ok());
    }

    #[test]
    fn test_apply_rules_show_hide_leave() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(
            dir.path(),
            "      a.png:\n        default: hide\n        show: [bg, { layer: frame, mask: hide }]\n        leave: { group: ui }\n",
        );
        let mut d = doc();
        apply_layer_rules(&mut d, &schema.exports()[0], None).unwrap();

        assert!(d.layer_at(&["bg"]).unwrap().visible);
        let frame = d.layer_at(&["frame"]).unwrap();
        assert!(frame.visible && !frame.mask_applied);
        // The group itself is left alone; its members inherit `hide`.
        assert!(d.layer_at(&["ui"]).unwrap().visible);
        assert!(!d.layer_at(&["ui", "button"]).unwrap().visible);
    }

    #[test]
    fn test_apply_rules_reports_every_layer() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path(), "      a.png: {}\n");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressCallback = Box::new(move |event| {
            if let ExportEvent::Layer { path, .. } = event {
                sink.lock().unwrap().push(path.join("/"));
            }
        });

        let mut d = doc();
        let before = d.clone();
        apply_layer_rules(&mut d, &schema.exports()[0], Some(&progress)).unwrap();

        // Everything defaults to `leave`.
        assert_eq!(d, before);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["ui", "ui/button", "ui/label", "frame", "bg"]
        );
    }

    #[test]
    fn test_bounding_box_uses_visible_leaves_only() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path(), "      a.png: { crop: bounding-box }\n");
        let region = crop_region(&doc(), &schema.exports()[0]).unwrap();
        // button (10,10)-(30,20) and frame (-5,30)-(35,70), clamped at x=0.
        assert_eq!(region, Some(Rect::new(0, 10, 35, 60)));
    }

    #[test]
    fn test_bounding_box_without_visible_leaves_fails() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path(), "      a.png: { crop: bounding-box, default: hide }\n");
        let mut d = doc();
        let err = export_document(&mut d, &schema.exports()[0], None).unwrap_err();
        assert!(matches!(err, LayercutError::Geometry { .. }));
    }

    #[test]
    fn test_named_crop_clamps_offset_only() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path(), "      a.png: { crop: frame }\n");
        let region = crop_region(&doc(), &schema.exports()[0]).unwrap();
        assert_eq!(region, Some(Rect::new(0, 30, 40, 40)));
    }

    #[test]
    fn test_no_crop_keeps_full_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path(), "      out/a.png: {}\n");
        let mut d = doc();
        let geometry = export_document(&mut d, &schema.exports()[0], None).unwrap();
        assert_eq!(
            geometry,
            ExportGeometry {
                width: 100,
                height: 80,
                x_offset: 0,
                y_offset: 0
            }
        );
        assert!(dir.path().join("out/a.png").exists());
    }

    #[test]
    fn test_crop_then_scale_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path(), "      a.png: { crop: button, resize: 1.5 }\n");
        let mut d = doc();
        let geometry = export_document(&mut d, &schema.exports()[0], None).unwrap();
        assert_eq!(
            geometry,
            ExportGeometry {
                width: 30,
                height: 15,
                x_offset: 15,
                y_offset: 15
            }
        );
    }

    #[test]
    fn test_independent_axes() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(
            dir.path(),
            "      a.png: { crop: button, resize: { width: 40, height: 5 } }\n",
        );
        let mut d = doc();
        let geometry = export_document(&mut d, &schema.exports()[0], None).unwrap();
        assert_eq!(
            geometry,
            ExportGeometry {
                width: 40,
                height: 5,
                x_offset: 20,
                y_offset: 5
            }
        );
    }

    #[test]
    fn test_engine_scale_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema(dir.path(), "      a.png: { resize: 0.001 }\n");
        let mut d = doc();
        let err = export_document(&mut d, &schema.exports()[0], None).unwrap_err();
        assert!(matches!(err, LayercutError::Engine { .. }));
        assert!(!dir.path().join("a.png").exists());
    }

    #[test]
    fn test_save_failure_names_the_export() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the output file should go.
        std::fs::create_dir_all(dir.path().join("out/a.png")).unwrap();
        let schema = schema(dir.path(), "      out/a.png: {}\n");
        let mut d = doc();
        let err = export_document(&mut d, &schema.exports()[0], None).unwrap_err();
        assert!(matches!(err, LayercutError::Engine { .. }));
        assert_eq!(err.export_path(), Some(dir.path().join("out/a.png").as_path()));
    }

    #[test]
    fn test_blocked_output_directory_names_the_export() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), b"").unwrap();
        let schema = schema(dir.path(), "      blocker/a.png: {}\n");
        let mut d = doc();
        let err = export_document(&mut d, &schema.exports()[0], None).unwrap_err();
        assert_eq!(
            err.export_path(),
            Some(dir.path().join("blocker/a.png").as_path())
        );
        assert!(err.to_string().contains("Cannot create"));
    }
}
