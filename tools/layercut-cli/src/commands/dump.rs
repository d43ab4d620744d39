//! Print the visible layers of a document as a `show:` rule.

use std::path::PathBuf;

use layercut_export::{dump_visible_tree, ImageEngine, MemoryEngine, Scoped};

pub fn run(document: PathBuf) -> anyhow::Result<()> {
    let engine = MemoryEngine::new();
    tracing::debug!(engine = engine.name(), "Dumping layer tree");

    let opened = Scoped::open(&engine, &document)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", document.display()))?;
    let tree = dump_visible_tree(&*opened)?;
    print!("{}", tree.to_yaml()?);
    Ok(())
}
