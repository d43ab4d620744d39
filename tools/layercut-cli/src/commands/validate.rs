//! Validate a schema file and list its resolved exports.

use std::path::PathBuf;

use layercut_schema::{load_schema, Resize};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating schema at: {}", path.display());

    let schema =
        load_schema(&path).map_err(|e| anyhow::anyhow!("Failed to load schema: {e}"))?;

    println!("  Database: {}", schema.database_path().display());

    let mut count = 0;
    for document in schema.documents() {
        println!("\n  {}", document.path().display());
        for export in document.descriptors(&schema.effective()) {
            count += 1;
            let crop = export.crop().map_or("none", |c| c.label());
            let resize = match export.resize() {
                None => "none".to_string(),
                Some(Resize::Scale(factor)) => format!("x{factor}"),
                Some(Resize::Width(width)) => format!("{width}xauto"),
                Some(Resize::Height(height)) => format!("autox{height}"),
                Some(Resize::Size { width, height }) => format!("{width}x{height}"),
            };
            println!(
                "    → {} (crop: {crop}, resize: {resize}, default: {})",
                export.path().display(),
                export.effective().action
            );
        }
    }

    println!("\nSchema is valid: {count} export(s).");
    Ok(())
}
