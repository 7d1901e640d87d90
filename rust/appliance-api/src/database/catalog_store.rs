//! SQLite device catalog.
//!
//! ```rust,ignore
//! use appliance_api::database::SqliteCatalog;
//!
//! let catalog = SqliteCatalog::open("./catalog.db").await?;
//! let rows = catalog.rows_by_group("Kühltisch").await?;
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::task;

use selection_engine::StoreError;
use selection_engine::catalog::CatalogStore;
use selection_engine::record::{CatalogRow, NewCatalogRow};

const SELECT_COLUMNS: &str = "id, device_raw, length, width, height, description, \
    manufacturer, model, price, device_matched, marge, created_at";

/// Device catalog stored in an SQLite `devices` table.
///
/// Each operation opens its own connection on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    db_path: PathBuf,
}

impl SqliteCatalog {
    /// Open (and if needed create) the catalog database.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let catalog = Self {
            db_path: path.into(),
        };
        catalog.migrate_schema().await?;
        Ok(catalog)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.db_path
    }

    async fn migrate_schema(&self) -> Result<()> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path).context("Failed to open catalog database")?;

            conn.pragma_update(None, "journal_mode", "WAL")
                .context("Failed to enable WAL mode")?;

            conn.execute(
                r"
                CREATE TABLE IF NOT EXISTS devices (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    device_raw TEXT NOT NULL,
                    length INTEGER,
                    width INTEGER,
                    height INTEGER,
                    description TEXT,
                    manufacturer TEXT,
                    model TEXT,
                    price INTEGER,
                    device_matched TEXT,
                    marge REAL,
                    created_at TEXT NOT NULL
                )
                ",
                [],
            )
            .context("Failed to create devices table")?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_devices_device_matched ON devices(device_matched)",
                [],
            )
            .context("Failed to create device_matched index")?;

            Ok(())
        })
        .await
        .context("Failed to spawn blocking task")??;

        Ok(())
    }

    /// Run `f` against a fresh connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(backend)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("catalog task failed: {e}")))?
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Raw row with the timestamp still as text.
struct RawRow(CatalogRow, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow(
        CatalogRow {
            id: row.get(0)?,
            device_raw: row.get(1)?,
            length: row.get(2)?,
            width: row.get(3)?,
            height: row.get(4)?,
            description: row.get(5)?,
            manufacturer: row.get(6)?,
            model: row.get(7)?,
            price: row.get(8)?,
            device_matched: row.get(9)?,
            margin: row.get(10)?,
            created_at: DateTime::<Utc>::MIN_UTC,
        },
        row.get(11)?,
    ))
}

fn finish_row(raw: RawRow) -> Result<CatalogRow, StoreError> {
    let RawRow(mut row, created_at) = raw;
    row.created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::Decode(format!("row {}: bad created_at {created_at:?}: {e}", row.id)))?
        .with_timezone(&Utc);
    Ok(row)
}

fn query_rows(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<CatalogRow>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(backend)?;
    let raws = stmt
        .query_map(params, read_row)
        .map_err(backend)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(backend)?;
    raws.into_iter().map(finish_row).collect()
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn rows_by_group(&self, group_key: &str) -> Result<Vec<CatalogRow>, StoreError> {
        let group_key = group_key.to_string();
        self.with_connection(move |conn| {
            query_rows(
                conn,
                &format!("SELECT {SELECT_COLUMNS} FROM devices WHERE device_matched = ?1 ORDER BY id"),
                params![group_key],
            )
        })
        .await
    }

    async fn insert(&self, row: NewCatalogRow) -> Result<CatalogRow, StoreError> {
        self.with_connection(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                r"
                INSERT INTO devices (device_raw, length, width, height, description,
                    manufacturer, model, price, device_matched, marge, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ",
                params![
                    row.device_raw,
                    row.length,
                    row.width,
                    row.height,
                    row.description,
                    row.manufacturer,
                    row.model,
                    row.price,
                    row.device_matched,
                    row.margin,
                    created_at.to_rfc3339(),
                ],
            )
            .map_err(backend)?;
            let id = conn.last_insert_rowid();
            tracing::debug!(id, device_raw = %row.device_raw, "Inserted catalog row");
            Ok(row.into_row(id, created_at))
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Option<CatalogRow>, StoreError> {
        self.with_connection(move |conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM devices WHERE id = ?1"),
                params![id],
                read_row,
            )
            .optional()
            .map_err(backend)?
            .map(finish_row)
            .transpose()
        })
        .await
    }

    async fn list(&self) -> Result<Vec<CatalogRow>, StoreError> {
        self.with_connection(|conn| {
            query_rows(
                conn,
                &format!("SELECT {SELECT_COLUMNS} FROM devices ORDER BY id"),
                [],
            )
        })
        .await
    }
}
