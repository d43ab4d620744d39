//! # layercut-store
//!
//! Persists the geometry of every exported artifact, keyed by output path,
//! so that sprite sheets and layouts can be reassembled later.
//!
//! One libSQL table, `exports`, with non-negative integer
//! `width`/`height`/`x_offset`/`y_offset` columns. Each logical operation is a
//! single atomic unit: an upsert is one statement, a prune is one transaction.

pub mod error;
pub mod report;

use std::path::{Path, PathBuf};

use error::StoreError;
use libsql::Builder;
use serde::Serialize;

pub use report::{filter_by_stem, origin_report, Bounds, Origin, OriginReport, RelativeRow};

const CREATE_EXPORTS: &str = r"
CREATE TABLE IF NOT EXISTS exports (
    path TEXT PRIMARY KEY
,   width INTEGER NOT NULL CHECK (width >= 0)
,   height INTEGER NOT NULL CHECK (height >= 0)
,   x_offset INTEGER NOT NULL CHECK (x_offset >= 0)
,   y_offset INTEGER NOT NULL CHECK (y_offset >= 0)
) STRICT;
";

/// Stored geometry of one exported artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRecord {
    pub path: PathBuf,
    pub width: i64,
    pub height: i64,
    pub x_offset: i64,
    pub y_offset: i64,
}

impl ExportRecord {
    pub fn new(path: impl Into<PathBuf>, width: i64, height: i64, x_offset: i64, y_offset: i64) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            x_offset,
            y_offset,
        }
    }
}

/// Handle to the metadata database.
pub struct MetadataStore {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl MetadataStore {
    /// Open (creating if needed) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file cannot be opened or the table cannot
    /// be created.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| StoreError::InvalidPath(path.to_path_buf()))?;
        Self::open_at(path_str).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the table cannot be created.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open_at(":memory:").await
    }

    async fn open_at(location: &str) -> Result<Self, StoreError> {
        let db = Builder::new_local(location).build().await?;
        let conn = db.connect()?;

        conn.execute_batch(CREATE_EXPORTS)
            .await
            .map_err(|e| StoreError::Migration(format!("exports table: {e}")))?;

        tracing::debug!(location, "Opened metadata store");
        Ok(Self { db, conn })
    }

    /// Insert the row for `record.path`, or overwrite every column of the
    /// existing one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on constraint violations (negative values) or
    /// I/O failure.
    pub async fn upsert_export(&self, record: &ExportRecord) -> Result<(), StoreError> {
        let path = path_text(&record.path)?;
        self.conn
            .execute(
                "INSERT INTO exports (path, width, height, x_offset, y_offset)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (path) DO UPDATE SET
                     width = excluded.width
                 ,   height = excluded.height
                 ,   x_offset = excluded.x_offset
                 ,   y_offset = excluded.y_offset",
                libsql::params![
                    path,
                    record.width,
                    record.height,
                    record.x_offset,
                    record.y_offset
                ],
            )
            .await?;
        Ok(())
    }

    /// A lazy cursor over every stored row, ordered by path. Each call
    /// starts a fresh query, so a sequence can be restarted by asking again.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    pub async fn export_cursor(&self) -> Result<ExportCursor, StoreError> {
        let rows = self
            .conn
            .query(
                "SELECT path, width, height, x_offset, y_offset FROM exports ORDER BY path",
                (),
            )
            .await?;
        Ok(ExportCursor { rows })
    }

    /// Every stored row, ordered by path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    pub async fn list_exports(&self) -> Result<Vec<ExportRecord>, StoreError> {
        let mut cursor = self.export_cursor().await?;
        let mut records = Vec::new();
        while let Some(record) = cursor.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Delete every row whose path no longer exists on disk, in one
    /// transaction. Returns the removed paths.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a query fails; nothing is deleted in that case.
    pub async fn prune_missing(&self) -> Result<Vec<PathBuf>, StoreError> {
        let missing: Vec<PathBuf> = self
            .list_exports()
            .await?
            .into_iter()
            .map(|record| record.path)
            .filter(|path| !path.exists())
            .collect();

        if missing.is_empty() {
            return Ok(missing);
        }

        let tx = self.conn.transaction().await?;
        for path in &missing {
            tx.execute("DELETE FROM exports WHERE path = ?1", [path_text(path)?])
                .await?;
        }
        tx.commit().await?;

        tracing::info!(removed = missing.len(), "Pruned metadata for missing files");
        Ok(missing)
    }
}

/// Rows of the `exports` table, read one at a time.
pub struct ExportCursor {
    rows: libsql::Rows,
}

impl ExportCursor {
    /// The next row, or `None` once the table is exhausted.
    pub async fn next(&mut self) -> Result<Option<ExportRecord>, StoreError> {
        let Some(row) = self.rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(ExportRecord {
            path: PathBuf::from(row.get::<String>(0)?),
            width: row.get::<i64>(1)?,
            height: row.get::<i64>(2)?,
            x_offset: row.get::<i64>(3)?,
            y_offset: row.get::<i64>(4)?,
        }))
    }
}

fn path_text(path: &Path) -> Result<&str, StoreError> {
    path.to_str()
        .ok_or_else(|| StoreError::InvalidPath(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> MetadataStore {
        MetadataStore::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn upsert_inserts_then_overwrites() {
        let store = test_store().await;
        store
            .upsert_export(&ExportRecord::new("out/a.png", 10, 20, 1, 2))
            .await
            .unwrap();
        store
            .upsert_export(&ExportRecord::new("out/a.png", 30, 40, 3, 4))
            .await
            .unwrap();

        let rows = store.list_exports().await.unwrap();
        assert_eq!(rows, vec![ExportRecord::new("out/a.png", 30, 40, 3, 4)]);
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = test_store().await;
        let record = ExportRecord::new("out/b.png", 64, 32, 8, 0);
        store.upsert_export(&record).await.unwrap();
        store.upsert_export(&record).await.unwrap();

        assert_eq!(store.list_exports().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn list_is_ordered_by_path() {
        let store = test_store().await;
        for name in ["c.png", "a.png", "b.png"] {
            store
                .upsert_export(&ExportRecord::new(name, 1, 1, 0, 0))
                .await
                .unwrap();
        }

        let paths: Vec<PathBuf> = store
            .list_exports()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.png"),
                PathBuf::from("c.png")
            ]
        );
    }

    #[tokio::test]
    async fn cursor_reads_lazily_and_restarts() {
        let store = test_store().await;
        for name in ["b.png", "a.png"] {
            store
                .upsert_export(&ExportRecord::new(name, 1, 1, 0, 0))
                .await
                .unwrap();
        }

        let mut cursor = store.export_cursor().await.unwrap();
        let first = cursor.next().await.unwrap().unwrap();
        assert_eq!(first.path, PathBuf::from("a.png"));

        // A second cursor starts from the beginning again.
        let mut again = store.export_cursor().await.unwrap();
        assert_eq!(again.next().await.unwrap().unwrap().path, PathBuf::from("a.png"));

        assert_eq!(cursor.next().await.unwrap().unwrap().path, PathBuf::from("b.png"));
        assert!(cursor.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn negative_values_violate_constraints() {
        let store = test_store().await;
        let result = store
            .upsert_export(&ExportRecord::new("bad.png", 10, 10, -1, 0))
            .await;
        assert!(result.is_err(), "negative offset should be rejected");
        assert!(store.list_exports().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prune_removes_only_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.png");
        std::fs::write(&kept, b"png").unwrap();
        let gone = dir.path().join("gone.png");

        let store = MetadataStore::open(&dir.path().join("meta").join("exports.db"))
            .await
            .unwrap();
        store
            .upsert_export(&ExportRecord::new(&kept, 1, 1, 0, 0))
            .await
            .unwrap();
        store
            .upsert_export(&ExportRecord::new(&gone, 2, 2, 0, 0))
            .await
            .unwrap();

        let removed = store.prune_missing().await.unwrap();
        assert_eq!(removed, vec![gone]);
        assert_eq!(
            store.list_exports().await.unwrap(),
            vec![ExportRecord::new(&kept, 1, 1, 0, 0)]
        );

        // Nothing left to prune.
        assert!(store.prune_missing().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopening_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("exports.db");
        {
            let store = MetadataStore::open(&db_path).await.unwrap();
            store
                .upsert_export(&ExportRecord::new("x.png", 5, 6, 7, 8))
                .await
                .unwrap();
        }

        let store = MetadataStore::open(&db_path).await.unwrap();
        assert_eq!(
            store.list_exports().await.unwrap(),
            vec![ExportRecord::new("x.png", 5, 6, 7, 8)]
        );
    }
}
