//! Shared fixtures for the selection engine integration tests.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use selection_engine::prelude::*;

pub const KUEHLTISCH: &str = "Kühltisch";
pub const HERD: &str = "Herd";

pub fn device(raw: &str) -> Device {
    Device {
        device_raw: raw.to_string(),
        length: 1200,
        width: 700,
        height: 850,
        description: format!("{raw}, Edelstahl"),
        ..Device::default()
    }
}

pub fn catalog_row(id: i64, raw: &str, group: &str) -> CatalogRow {
    CatalogRow {
        id,
        device_raw: raw.to_string(),
        length: Some(1200),
        width: Some(700),
        height: Some(850),
        description: None,
        manufacturer: Some("Gastro AG".to_string()),
        model: Some(format!("M-{id}")),
        price: Some(1000 + id),
        device_matched: Some(group.to_string()),
        margin: Some(1.3),
        created_at: Utc::now(),
    }
}

/// Oracle that extracts a fixed list and matches by a lookup table, so its
/// matching output is derived from its input.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    pub extraction: Vec<Device>,
    pub groups: HashMap<String, String>,
    /// Returned verbatim from matching instead of the lookup, when set.
    pub matching_override: Option<Vec<MatchedDevice>>,
    pub extract_calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(items: &[(&str, &str)]) -> Self {
        Self {
            extraction: items.iter().map(|(raw, _)| device(raw)).collect(),
            groups: items
                .iter()
                .map(|(raw, key)| ((*raw).to_string(), (*key).to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_matching(mut self, matching: Vec<MatchedDevice>) -> Self {
        self.matching_override = Some(matching);
        self
    }
}

#[async_trait]
impl DeviceOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(
        &self,
        _document: &SourceDocument,
        _mode: Mode,
    ) -> Result<Vec<Device>, OracleError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.extraction.clone())
    }

    async fn match_devices(&self, devices: &[Device]) -> Result<Vec<MatchedDevice>, OracleError> {
        if let Some(matching) = &self.matching_override {
            return Ok(matching.clone());
        }
        devices
            .iter()
            .map(|d| {
                let key = self.groups.get(&d.device_raw).ok_or_else(|| {
                    OracleError::Malformed(format!("no group for {}", d.device_raw))
                })?;
                Ok(MatchedDevice {
                    device: d.clone(),
                    device_matched: key.clone(),
                })
            })
            .collect()
    }
}

/// Catalog that delegates to an in-memory catalog and fails on demand.
#[derive(Debug, Default)]
pub struct FlakyCatalog {
    pub inner: InMemoryCatalog,
    /// Inserts succeed this many times, then fail.
    pub inserts_before_failure: Option<usize>,
    pub fail_lookups: bool,
    pub inserts: AtomicUsize,
}

#[async_trait]
impl CatalogStore for FlakyCatalog {
    async fn rows_by_group(&self, group_key: &str) -> Result<Vec<CatalogRow>, StoreError> {
        if self.fail_lookups {
            return Err(StoreError::Backend("lookup refused".to_string()));
        }
        self.inner.rows_by_group(group_key).await
    }

    async fn insert(&self, row: NewCatalogRow) -> Result<CatalogRow, StoreError> {
        let done = self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.inserts_before_failure.is_some_and(|limit| done >= limit) {
            return Err(StoreError::Backend("insert refused".to_string()));
        }
        self.inner.insert(row).await
    }

    async fn get(&self, id: i64) -> Result<Option<CatalogRow>, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<CatalogRow>, StoreError> {
        self.inner.list().await
    }
}

/// Catalog with three `Kühltisch` rows (ids 1..=3) and two `Herd` rows (10, 11).
pub fn kitchen_catalog() -> InMemoryCatalog {
    InMemoryCatalog::with_rows(vec![
        catalog_row(1, "Kühltisch 2-türig", KUEHLTISCH),
        catalog_row(2, "Kühltisch 3-türig", KUEHLTISCH),
        catalog_row(3, "Kühltisch 4-türig", KUEHLTISCH),
        catalog_row(10, "Elektroherd 4 Platten", HERD),
        catalog_row(11, "Gasherd 6 Flammen", HERD),
    ])
}

pub fn engine_with(oracle: impl DeviceOracle + 'static, catalog: Arc<dyn CatalogStore>) -> WorkflowEngine {
    WorkflowEngine::new(OracleSet::new(Arc::new(oracle)), catalog)
}

pub fn request(mode: Mode) -> StartRequest {
    StartRequest {
        document: SourceDocument::from(b"%PDF-1.7 test".to_vec()),
        mode,
        use_live_oracle: false,
    }
}

/// Catalog whose lookups take a while, so two runs can overlap.
#[derive(Debug)]
pub struct SlowCatalog {
    pub inner: InMemoryCatalog,
    pub delay: std::time::Duration,
}

#[async_trait]
impl CatalogStore for SlowCatalog {
    async fn rows_by_group(&self, group_key: &str) -> Result<Vec<CatalogRow>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.rows_by_group(group_key).await
    }

    async fn insert(&self, row: NewCatalogRow) -> Result<CatalogRow, StoreError> {
        self.inner.insert(row).await
    }

    async fn get(&self, id: i64) -> Result<Option<CatalogRow>, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<CatalogRow>, StoreError> {
        self.inner.list().await
    }
}

/// Directory holding the pinned oracle fixtures and the catalog seed.
pub fn data_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
}
