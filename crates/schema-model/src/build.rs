//! Conversion from the declarative [`SchemaModel`] to the resolved [`Schema`].
//!
//! One explicit pass, top-down. Structural problems (duplicate group names,
//! malformed resizes, empty crop selectors) fail here, before any document is
//! opened.

use std::path::Path;

use crate::error::SchemaError;
use crate::geometry::{Crop, Resize};
use crate::model::{
    Action, CropModel, DocumentModel, ExportModel, ResizeModel, RuleNode, Rules, SchemaModel,
};
use crate::resolve::{Document, Group, Schema, Settings};

/// Load a schema file and build the resolved hierarchy.
///
/// Relative paths inside the file are resolved against the directory that
/// contains it.
pub fn load_schema(path: impl AsRef<Path>) -> Result<Schema, SchemaError> {
    let path = path.as_ref();
    let model = SchemaModel::load(path)?;
    let canonical = path.canonicalize().map_err(|e| SchemaError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let root_dir = canonical.parent().unwrap_or_else(|| Path::new("/"));
    build_schema(root_dir, &model)
}

/// Build the resolved hierarchy, resolving relative paths against `root_dir`.
pub fn build_schema(root_dir: &Path, model: &SchemaModel) -> Result<Schema, SchemaError> {
    let settings = Settings::default().with_resize(convert_resize(model.resize.as_ref())?);
    let mut schema = Schema::new(root_dir.join(&model.database), settings);

    for (document_path, document_model) in &model.documents {
        add_document(root_dir, &mut schema, document_path, document_model)?;
    }

    Ok(schema)
}

fn add_document(
    root_dir: &Path,
    schema: &mut Schema,
    path: &Path,
    model: &DocumentModel,
) -> Result<(), SchemaError> {
    let settings = Settings {
        action: model.default,
        mask: model.mask,
        resize: convert_resize(model.resize.as_ref())?,
    };
    let document = schema.add_document(root_dir.join(path), settings);

    for (export_path, export_model) in &model.exports {
        let export_path = root_dir.join(export_path);
        add_export(document, &export_path, export_model)
            .map_err(|e| e.in_export(export_path.clone()))?;
    }

    Ok(())
}

fn add_export(document: &mut Document, path: &Path, model: &ExportModel) -> Result<(), SchemaError> {
    let crop = model.crop.as_ref().map(convert_crop).transpose()?;
    let settings = Settings {
        action: model.default,
        mask: model.mask,
        resize: convert_resize(model.resize.as_ref())?,
    };

    let export = document.add_export(path, crop, settings);
    let root = export.root_mut();
    add_rules(root, model.show.as_ref(), Action::Show)?;
    add_rules(root, model.hide.as_ref(), Action::Hide)?;
    add_rules(root, model.leave.as_ref(), Action::Leave)?;
    Ok(())
}

/// Register every rule under `group`, each taking `action` unless it says
/// otherwise.
fn add_rules(group: &mut Group, rules: Option<&Rules>, action: Action) -> Result<(), SchemaError> {
    let Some(rules) = rules else {
        return Ok(());
    };

    for node in rules.iter() {
        match node {
            RuleNode::Name(name) => group.add_layer(name.as_str(), Settings::action(action)),
            RuleNode::Layer(layer) => group.add_layer(
                layer.layer.as_str(),
                Settings::action(action).with_mask(layer.mask),
            ),
            RuleNode::Group(rule) => {
                // The group layer itself follows the enclosing list.
                group.add_layer(rule.group.as_str(), Settings::action(action));
                let child = group.add_group(
                    rule.group.as_str(),
                    Settings {
                        action: rule.default,
                        mask: rule.mask,
                        resize: None,
                    },
                )?;
                add_rules(child, rule.show.as_ref(), Action::Show)?;
                add_rules(child, rule.hide.as_ref(), Action::Hide)?;
                add_rules(child, rule.leave.as_ref(), Action::Leave)?;
            }
        }
    }

    Ok(())
}

fn convert_resize(model: Option<&ResizeModel>) -> Result<Option<Resize>, SchemaError> {
    model
        .map(|resize| match *resize {
            ResizeModel::Scale(factor) => Resize::scale(factor),
            ResizeModel::Size(size) => Resize::width_height(size.width, size.height),
        })
        .transpose()
}

fn convert_crop(model: &CropModel) -> Result<Crop, SchemaError> {
    match model {
        CropModel::Algorithm { .. } => Ok(Crop::BoundingBox),
        CropModel::Named(name) if name == "bounding-box" => Ok(Crop::BoundingBox),
        CropModel::Named(name) if name.trim().is_empty() => {
            Err(SchemaError::invalid_crop("crop layer name must not be empty"))
        }
        CropModel::Named(name) => Ok(Crop::Layer(name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn build(yaml: &str) -> Result<Schema, SchemaError> {
        let model = SchemaModel::from_yaml(yaml).unwrap();
        build_schema(Path::new("/project"), &model)
    }

    #[test]
    fn test_paths_are_resolved_against_root() {
        let schema = build(
            r#"
database: meta/exports.db
documents:
  art/hero.xcf:
    exports:
      out/hero.png: {}
"#,
        )
        .unwrap();

        assert_eq!(schema.database_path(), Path::new("/project/meta/exports.db"));
        let exports = schema.exports();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].path(), Path::new("/project/out/hero.png"));
        assert_eq!(exports[0].document_path(), Path::new("/project/art/hero.xcf"));
    }

    #[test]
    fn test_group_rule_registers_layer_and_group() {
        let schema = build(
            r#"
database: db
documents:
  a.xcf:
    default: hide
    exports:
      a.png:
        show:
          - bg
          - group: ui
            hide: [sprite]
            show: [{ layer: button, mask: hide }]
"#,
        )
        .unwrap();

        let d = schema.exports()[0];
        assert_eq!(d.get_layer(&["bg"]).action, Action::Show);
        assert_eq!(d.get_layer(&["ui"]).action, Action::Show);
        assert_eq!(d.get_layer(&["ui", "sprite"]).action, Action::Hide);
        assert_eq!(d.get_layer(&["ui", "button"]).action, Action::Show);
        assert_eq!(d.get_layer(&["ui", "button"]).mask, Action::Hide);
        // No group default: unlisted members follow the document default.
        assert_eq!(d.get_layer(&["ui", "label"]).action, Action::Hide);
        assert_eq!(d.get_layer(&["other"]).action, Action::Hide);
        assert_eq!(d.get_layer(&["other"]).mask, Action::Leave);
    }

    #[test]
    fn test_group_default_and_mask() {
        let schema = build(
            r#"
database: db
documents:
  a.xcf:
    exports:
      a.png:
        default: hide
        leave:
          group: ui
          default: show
          mask: show
"#,
        )
        .unwrap();

        let d = schema.exports()[0];
        assert_eq!(d.get_layer(&["ui"]).action, Action::Leave);
        assert_eq!(d.get_layer(&["ui", "anything"]).action, Action::Show);
        assert_eq!(d.get_layer(&["ui", "anything"]).mask, Action::Show);
        assert_eq!(d.get_layer(&["outside"]).mask, Action::Leave);
    }

    #[test]
    fn test_duplicate_group_fails_with_export_context() {
        let err = build(
            r#"
database: db
documents:
  a.xcf:
    exports:
      out.png:
        show:
          - group: ui
          - group: ui
"#,
        )
        .unwrap_err();

        match err {
            SchemaError::Export { export, source } => {
                assert_eq!(export, PathBuf::from("/project/out.png"));
                assert!(matches!(*source, SchemaError::DuplicateGroup { ref name } if name == "ui"));
            }
            other => panic!("expected export error, got {other:?}"),
        }
    }

    #[test]
    fn test_same_group_in_different_lists_is_duplicate() {
        let err = build(
            r#"
database: db
documents:
  a.xcf:
    exports:
      out.png:
        show: { group: ui }
        hide: { group: ui }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_malformed_resize_fails() {
        let err = build("database: db\nresize: {}\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidResize { .. }));

        let err = build("database: db\nresize: -0.5\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidResize { .. }));
    }

    #[test]
    fn test_crop_selectors() {
        let schema = build(
            r#"
database: db
documents:
  a.xcf:
    exports:
      bbox.png: { crop: bounding-box }
      algo.png: { crop: { algorithm: bounding-box } }
      named.png: { crop: frame }
      none.png: {}
"#,
        )
        .unwrap();

        let crops: Vec<(String, Option<Crop>)> = schema
            .exports()
            .iter()
            .map(|d| {
                let name = d.path().file_name().unwrap().to_string_lossy().into_owned();
                (name, d.crop().cloned())
            })
            .collect();
        assert_eq!(
            crops,
            vec![
                ("algo.png".to_string(), Some(Crop::BoundingBox)),
                ("bbox.png".to_string(), Some(Crop::BoundingBox)),
                ("named.png".to_string(), Some(Crop::Layer("frame".into()))),
                ("none.png".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_empty_crop_name_fails() {
        let err = build(
            r#"
database: db
documents:
  a.xcf:
    exports:
      a.png: { crop: "" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Export { .. }));
    }

    #[test]
    fn test_load_schema_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("layercut.yaml");
        std::fs::write(
            &schema_path,
            "database: exports.db\ndocuments:\n  a.xcf:\n    exports:\n      out/a.png: {}\n",
        )
        .unwrap();

        let schema = load_schema(&schema_path).unwrap();
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(schema.database_path(), root.join("exports.db"));
        assert_eq!(schema.exports()[0].path(), root.join("out/a.png"));
    }

    #[test]
    fn test_load_missing_schema_is_io_error() {
        let err = load_schema("/definitely/not/here/layercut.yaml").unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }
}
