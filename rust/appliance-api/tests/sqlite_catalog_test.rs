#![cfg(feature = "sqlite")]

mod common;

use appliance_api::database::SqliteCatalog;
use selection_engine::catalog::CatalogStore;
use selection_engine::record::NewCatalogRow;
use serde_json::Value;

use common::{test_config, test_server, upload};

fn new_row(raw: &str, group: &str) -> NewCatalogRow {
    NewCatalogRow {
        device_raw: raw.to_string(),
        length: Some(1200),
        width: Some(700),
        height: Some(850),
        description: Some("Edelstahl".to_string()),
        manufacturer: Some("Gastro AG".to_string()),
        model: None,
        price: Some(2490),
        device_matched: Some(group.to_string()),
        margin: Some(1.3),
    }
}

#[tokio::test]
async fn test_insert_and_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = SqliteCatalog::open(dir.path().join("catalog.db")).await.unwrap();

    let first = catalog.insert(new_row("Herd 4-flammig", "Herd")).await.unwrap();
    let second = catalog.insert(new_row("Spültisch 1-Becken", "Spültisch")).await.unwrap();
    let third = catalog.insert(new_row("Herd 6-flammig", "Herd")).await.unwrap();
    assert_eq!((first.id, second.id, third.id), (1, 2, 3));

    let herds = catalog.rows_by_group("Herd").await.unwrap();
    let ids: Vec<_> = herds.iter().map(|row| row.id).collect();
    assert_eq!(ids, [1, 3]);
    assert!(catalog.rows_by_group("Fritteuse").await.unwrap().is_empty());

    let fetched = catalog.get(2).await.unwrap().expect("row 2 exists");
    assert_eq!(fetched.device_raw, "Spültisch 1-Becken");
    assert_eq!(fetched.margin, Some(1.3));
    assert_eq!(fetched.model, None);
    assert_eq!(fetched.created_at.timestamp(), second.created_at.timestamp());
    assert!(catalog.get(42).await.unwrap().is_none());

    assert_eq!(catalog.list().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    {
        let catalog = SqliteCatalog::open(&path).await.unwrap();
        catalog.insert(new_row("Kombidämpfer 6x GN 1/1", "Kombidämpfer")).await.unwrap();
    }

    let reopened = SqliteCatalog::open(&path).await.unwrap();
    let rows = reopened.rows_by_group("Kombidämpfer").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].device_raw, "Kombidämpfer 6x GN 1/1");
}

#[tokio::test]
async fn test_saved_devices_become_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.catalog.seed_path = None;
    config.catalog.sqlite_path = Some(dir.path().join("catalog.db"));
    let server = test_server(config).await;

    let body: Value = server.post("/api/session/start").multipart(upload(false, false)).await.json();
    assert_eq!(body["status"], "completed");

    let body: Value = server.post("/api/session/start").multipart(upload(true, false)).await.json();
    assert_eq!(body["status"], "interrupted");
    assert_eq!(body["totalDevices"], 5);
    let candidates: Vec<_> = body["availableDevices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect();
    assert_eq!(candidates, [1, 5]);
}
