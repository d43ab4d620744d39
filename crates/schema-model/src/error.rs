//! Structural errors raised while loading and resolving a schema.

use std::path::PathBuf;

/// Errors detected before any document is opened.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("A group named {name:?} already exists")]
    DuplicateGroup { name: String },

    #[error("Invalid resize: {message}")]
    InvalidResize { message: String },

    #[error("Invalid crop: {message}")]
    InvalidCrop { message: String },

    /// A structural error inside one export entry.
    #[error("In export {}: {source}", export.display())]
    Export {
        export: PathBuf,
        #[source]
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    pub fn invalid_resize(msg: impl Into<String>) -> Self {
        Self::InvalidResize {
            message: msg.into(),
        }
    }

    pub fn invalid_crop(msg: impl Into<String>) -> Self {
        Self::InvalidCrop {
            message: msg.into(),
        }
    }

    pub(crate) fn in_export(self, export: impl Into<PathBuf>) -> Self {
        Self::Export {
            export: export.into(),
            source: Box::new(self),
        }
    }
}
