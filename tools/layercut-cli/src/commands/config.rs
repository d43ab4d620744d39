//! Show or initialise the configuration file.

use layercut_common::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, init: bool) -> anyhow::Result<()> {
    let path = config_file_path();

    if init {
        config.save()?;
        println!("Wrote {}", path.display());
    } else if !path.exists() {
        println!("No config file at {} (using defaults)", path.display());
    } else {
        println!("Config file: {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
