//! Catalog store interface and the in-memory implementation.
//!
//! The engine reads candidate rows by canonical group key and appends new
//! rows in save mode. It never updates or deletes rows.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::record::{CatalogRow, NewCatalogRow};

/// Append-only view of the device catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Rows whose canonical group key equals `group_key`, ordered by id.
    async fn rows_by_group(&self, group_key: &str) -> Result<Vec<CatalogRow>, StoreError>;

    /// Insert a new row and return it with its assigned id.
    async fn insert(&self, row: NewCatalogRow) -> Result<CatalogRow, StoreError>;

    /// Fetch a single row.
    async fn get(&self, id: i64) -> Result<Option<CatalogRow>, StoreError>;

    /// All rows, ordered by id.
    async fn list(&self) -> Result<Vec<CatalogRow>, StoreError>;
}

/// Catalog held in process memory.
#[derive(Debug)]
pub struct InMemoryCatalog {
    rows: RwLock<Vec<CatalogRow>>,
    next_id: AtomicI64,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Catalog pre-populated with existing rows. New ids continue after the
    /// largest seeded id.
    #[must_use]
    pub fn with_rows(mut rows: Vec<CatalogRow>) -> Self {
        rows.sort_by_key(|r| r.id);
        let next = rows.last().map_or(1, |r| r.id + 1);
        Self {
            rows: RwLock::new(rows),
            next_id: AtomicI64::new(next),
        }
    }

    /// Load seed rows from a JSON array file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Backend(format!("{}: {e}", path.display())))?;
        let rows: Vec<CatalogRow> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Decode(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), rows = rows.len(), "Seeded in-memory catalog");
        Ok(Self::with_rows(rows))
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn rows_by_group(&self, group_key: &str) -> Result<Vec<CatalogRow>, StoreError> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|r| r.device_matched.as_deref() == Some(group_key))
            .cloned()
            .collect())
    }

    async fn insert(&self, row: NewCatalogRow) -> Result<CatalogRow, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = row.into_row(id, Utc::now());
        self.rows.write().push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Option<CatalogRow>, StoreError> {
        Ok(self.rows.read().iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<CatalogRow>, StoreError> {
        Ok(self.rows.read().clone())
    }
}
