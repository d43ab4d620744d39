//! Print the JSON Schema of the schema file format.

pub fn run() -> anyhow::Result<()> {
    println!("{}", layercut_schema::json_schema_pretty()?);
    Ok(())
}
