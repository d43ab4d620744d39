//! Layercut CLI: batch-export layer crops and inspect their metadata.
//!
//! Usage:
//!   layercut export [SUBSTRINGS...]    Run the exports in a schema
//!   layercut metadata [SUBSTRINGS...]  Show stored export geometry
//!   layercut dump <DOCUMENT>           Print visible layers as a show: rule
//!   layercut validate                  Check a schema and list its exports
//!   layercut json-schema               Print the schema file's JSON Schema
//!   layercut config                    Show or initialise the config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use layercut_common::AppConfig;
use layercut_store::Origin;

mod commands;

#[derive(Parser)]
#[command(
    name = "layercut",
    about = "Export named crops from layered image documents",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every export in the schema (or those matching SUBSTRINGS)
    Export {
        /// Schema file (defaults to the configured default schema)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Write the exported paths to this file as a JSON array
        #[arg(short, long)]
        results: Option<PathBuf>,

        /// Only exports whose output path contains one of these
        substrings: Vec<String>,
    },

    /// Show stored export geometry relative to an origin
    Metadata {
        /// Schema file whose database to read
        #[arg(short, long, conflicts_with = "database")]
        schema: Option<PathBuf>,

        /// Database to read directly
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Remove rows whose files no longer exist first
        #[arg(short, long)]
        clean: bool,

        /// `auto` or `X,Y`; write negative ordinates as `nX`
        #[arg(short, long)]
        origin: Option<Origin>,

        /// Only rows whose file stem contains one of these
        substrings: Vec<String>,
    },

    /// Print the visible layers of a document as a `show:` rule
    Dump {
        /// Path to the document
        document: PathBuf,
    },

    /// Validate a schema and list its resolved exports
    Validate {
        /// Schema file (defaults to the configured default schema)
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },

    /// Print the JSON Schema of the schema file format
    JsonSchema,

    /// Show the configuration file
    Config {
        /// Write the current configuration (defaults if absent) to disk
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_error) = AppConfig::load_or_default();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    layercut_common::logging::init_logging(&logging);
    if let Some(err) = config_error {
        tracing::warn!(error = %err, "Using default configuration");
    }

    match cli.command {
        Commands::Export {
            schema,
            results,
            substrings,
        } => {
            let schema = schema.unwrap_or_else(|| config.default_schema.clone());
            commands::export::run(schema, results, substrings).await
        }
        Commands::Metadata {
            schema,
            database,
            clean,
            origin,
            substrings,
        } => {
            let schema = schema.unwrap_or_else(|| config.default_schema.clone());
            commands::metadata::run(schema, database, clean, origin.unwrap_or_default(), substrings)
                .await
        }
        Commands::Dump { document } => commands::dump::run(document),
        Commands::Validate { schema } => {
            commands::validate::run(schema.unwrap_or_else(|| config.default_schema.clone()))
        }
        Commands::JsonSchema => commands::json_schema::run(),
        Commands::Config { init } => commands::config::run(&config, init),
    }
}
