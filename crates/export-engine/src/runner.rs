//! Batch runner: every selected export of every document, recorded in the
//! metadata store.

use std::path::PathBuf;

use layercut_common::{LayercutError, LayercutResult};
use layercut_schema::{ExportDescriptor, Schema};
use layercut_store::MetadataStore;

use crate::document::{ImageEngine, Scoped};
use crate::pipeline::{export_document, validate_export, ExportEvent, ProgressCallback};

/// Whether `export` is selected by `filter`: its output path contains any of
/// the substrings, or the filter is empty.
pub fn matches_filter<S: AsRef<str>>(export: &ExportDescriptor<'_>, filter: &[S]) -> bool {
    if filter.is_empty() {
        return true;
    }
    let path = export.path().to_string_lossy();
    filter.iter().any(|s| path.contains(s.as_ref()))
}

/// Export every selected descriptor in `schema` and record its geometry.
///
/// Documents and exports run in path order. Each document is opened once;
/// each export validates against the original, then runs on a duplicate that
/// is disposed before the store is written. The first failure aborts the run.
///
/// Returns the output paths that were exported.
pub async fn run_exports<E, S>(
    engine: &E,
    schema: &Schema,
    store: &MetadataStore,
    filter: &[S],
    progress: Option<ProgressCallback>,
) -> LayercutResult<Vec<PathBuf>>
where
    E: ImageEngine,
    S: AsRef<str>,
{
    tracing::info!(engine = engine.name(), "Starting export run");
    let schema_defaults = schema.effective();
    let mut exported = Vec::new();

    for document in schema.documents() {
        let selected: Vec<ExportDescriptor<'_>> = document
            .descriptors(&schema_defaults)
            .into_iter()
            .filter(|export| matches_filter(export, filter))
            .collect();
        if selected.is_empty() {
            continue;
        }

        tracing::info!(document = %document.path().display(), "Opening document");
        let original = Scoped::open(engine, document.path())?;

        for export in &selected {
            validate_export(&*original, export)?;

            tracing::info!(export = %export.path().display(), "Exporting");
            if let Some(cb) = &progress {
                cb(ExportEvent::Started {
                    export: export.path().to_path_buf(),
                });
            }

            let geometry = {
                let mut duplicate = Scoped::duplicate(engine, &*original)?;
                export_document(&mut *duplicate, export, progress.as_ref())?
            };

            store
                .upsert_export(&geometry.record(export.path()))
                .await
                .map_err(|e| LayercutError::from(e).for_export(export.path()))?;
            exported.push(export.path().to_path_buf());
        }
    }

    tracing::info!(count = exported.len(), "Export run complete");
    Ok(exported)
}
