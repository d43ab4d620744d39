//! Error types shared across Layercut crates.

use std::path::{Path, PathBuf};

/// Top-level error type for export operations.
///
/// Every per-export variant names the output path it was raised for, so a
/// failed batch run reports which export and which rule broke.
#[derive(Debug, thiserror::Error)]
pub enum LayercutError {
    #[error("Validation failed for {}: {message}", export.display())]
    Validation { export: PathBuf, message: String },

    #[error("Geometry error for {}: {message}", export.display())]
    Geometry { export: PathBuf, message: String },

    #[error("Engine error for {}: {message}", export.display())]
    Engine { export: PathBuf, message: String },

    #[error("Document error: {message}")]
    Document { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Metadata store failure, passed through without rewording. `export` is
    /// set when the failure happened while recording that export.
    #[error("{inner}")]
    Store {
        export: Option<PathBuf>,
        inner: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using LayercutError.
pub type LayercutResult<T> = Result<T, LayercutError>;

impl LayercutError {
    pub fn validation(export: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::Validation {
            export: export.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    pub fn geometry(export: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::Geometry {
            export: export.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    pub fn engine(export: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::Engine {
            export: export.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a store error so that its message is reported verbatim.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store {
            export: None,
            inner: Box::new(err),
        }
    }

    /// Attach the export being processed to an error raised without one.
    ///
    /// Store errors keep their message and gain the path. Document, I/O and
    /// serialization failures become engine errors for `export`. Errors that
    /// already name a path are returned unchanged.
    pub fn for_export(self, export: impl AsRef<Path>) -> Self {
        match self {
            Self::Store {
                export: None,
                inner,
            } => Self::Store {
                export: Some(export.as_ref().to_path_buf()),
                inner,
            },
            Self::Document { .. } | Self::Io(_) | Self::Json(_) => {
                let message = self.to_string();
                Self::engine(export, message)
            }
            other => other,
        }
    }

    /// The export output path this error was raised for, if any.
    pub fn export_path(&self) -> Option<&Path> {
        match self {
            Self::Validation { export, .. }
            | Self::Geometry { export, .. }
            | Self::Engine { export, .. } => Some(export),
            Self::Store {
                export: Some(export),
                ..
            } => Some(export),
            _ => None,
        }
    }
}
