//! Show stored export geometry relative to an origin.

use std::path::{Path, PathBuf};

use layercut_schema::SchemaModel;
use layercut_store::{filter_by_stem, origin_report, MetadataStore, Origin};

pub async fn run(
    schema_path: PathBuf,
    database: Option<PathBuf>,
    clean: bool,
    origin: Origin,
    substrings: Vec<String>,
) -> anyhow::Result<()> {
    let database = match database {
        Some(path) => path,
        None => database_from_schema(&schema_path)?,
    };

    let store = MetadataStore::open(&database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", database.display()))?;

    if clean {
        let removed = store.prune_missing().await?;
        for path in &removed {
            println!("Removed {}", path.display());
        }
    }

    let rows = filter_by_stem(store.list_exports().await?, &substrings);
    let report = origin_report(rows, origin)?;

    let cwd = std::env::current_dir()?;
    println!("Exports (origin {},{})", report.origin.0, report.origin.1);
    println!(
        "  {:<40} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "Path", "W", "H", "X←", "Y↑", "X→", "Y↓"
    );
    for row in &report.rows {
        println!(
            "  {:<40} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
            relative_to(&row.record.path, &cwd).display(),
            row.record.width,
            row.record.height,
            row.left,
            row.top,
            row.right,
            row.bottom
        );
    }

    match report.bounds {
        Some(bounds) => {
            println!("\nBounding box");
            println!(
                "  {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
                "W", "H", "X←", "Y↑", "X→", "Y↓"
            );
            println!(
                "  {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
                bounds.width(),
                bounds.height(),
                bounds.left,
                bounds.top,
                bounds.right,
                bounds.bottom
            );
        }
        None => println!("\nNo exports recorded."),
    }

    Ok(())
}

fn database_from_schema(schema_path: &Path) -> anyhow::Result<PathBuf> {
    let model = SchemaModel::load(schema_path)
        .map_err(|e| anyhow::anyhow!("Failed to load schema: {e}"))?;
    let schema_path = schema_path.canonicalize()?;
    let root = schema_path.parent().unwrap_or_else(|| Path::new("/"));
    Ok(root.join(model.database))
}

fn relative_to<'a>(path: &'a Path, base: &Path) -> &'a Path {
    path.strip_prefix(base).unwrap_or(path)
}
