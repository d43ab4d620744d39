//! Metadata store error types.

use std::path::PathBuf;

use layercut_common::LayercutError;
use thiserror::Error;

/// Errors from metadata store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Table creation failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// The path cannot be stored as TEXT.
    #[error("Path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Origin specifier did not parse.
    #[error("Invalid origin {0:?}: expected `auto` or `X,Y`")]
    InvalidOrigin(String),

    /// An automatic origin needs at least one row.
    #[error("Cannot compute an automatic origin without any exports")]
    EmptyReport,

    /// A relative coordinate does not fit in an `i64`.
    #[error("Coordinates of {} overflow relative to the origin", .0.display())]
    CoordinateOverflow(PathBuf),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for LayercutError {
    fn from(err: StoreError) -> Self {
        LayercutError::store(err)
    }
}
