//! Read-only catalog browsing.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use selection_engine::record::CatalogRow;

use super::error::ApiError;
use crate::AppState;

/// Create the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/catalog/devices", get(list_devices))
        .route("/api/catalog/devices/{id}", get(get_device))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Restrict to one canonical group.
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<CatalogRow>,
    pub count: usize,
}

async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<DeviceListResponse>, ApiError> {
    let devices = match query.group.as_deref().map(str::trim) {
        Some(group) if !group.is_empty() => state.catalog.rows_by_group(group).await?,
        _ => state.catalog.list().await?,
    };
    Ok(Json(DeviceListResponse {
        count: devices.len(),
        devices,
    }))
}

async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CatalogRow>, ApiError> {
    state
        .catalog
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Catalog row {id} not found")))
}
