//! Run the exports in a schema.

use std::path::PathBuf;

use layercut_export::{run_exports, ExportEvent, MemoryEngine, ProgressCallback};
use layercut_schema::load_schema;
use layercut_store::MetadataStore;

pub async fn run(
    schema_path: PathBuf,
    results: Option<PathBuf>,
    substrings: Vec<String>,
) -> anyhow::Result<()> {
    println!("Loading schema: {}", schema_path.display());

    let schema = load_schema(&schema_path)
        .map_err(|e| anyhow::anyhow!("Failed to load schema: {e}"))?;
    let store = MetadataStore::open(schema.database_path())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open metadata database: {e}"))?;

    let progress_cb: ProgressCallback = Box::new(|event| match event {
        ExportEvent::Started { export } => println!("\nExporting {}", export.display()),
        ExportEvent::Layer {
            path,
            action,
            visible,
            masked,
        } => {
            let state = if visible { "visible" } else { "hidden" };
            let mask = if masked { " (masked)" } else { "" };
            println!("  [{action:>5}] {} {state}{mask}", path.join(" → "));
        }
        ExportEvent::Cropped { label, region } => println!(
            "  Cropping to {label}: {}x{}+{}+{}",
            region.width, region.height, region.x, region.y
        ),
        ExportEvent::Resized {
            width,
            height,
            x_offset,
            y_offset,
            x_factor,
            y_factor,
        } => println!("  Scaled to {width}x{height}+{x_offset}+{y_offset} ({x_factor}, {y_factor})"),
        ExportEvent::Saved { export, geometry } => println!(
            "  Saved {} ({}x{}+{}+{})",
            export.display(),
            geometry.width,
            geometry.height,
            geometry.x_offset,
            geometry.y_offset
        ),
    });

    let engine = MemoryEngine::new();
    let exported = run_exports(&engine, &schema, &store, &substrings, Some(progress_cb))
        .await
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;

    println!("\n{} export(s) complete.", exported.len());

    if let Some(results) = results {
        let json = serde_json::to_string_pretty(&exported)?;
        std::fs::write(&results, json)?;
        println!("Results written to {}", results.display());
    }

    Ok(())
}
