//! Shared helpers for the appliance API integration tests.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::path::{Path, PathBuf};

use appliance_api::config::AppConfig;
use appliance_api::server::create_app;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};

/// Fixture directory at the workspace root.
pub fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

/// Fixture oracle plus the seeded in-memory catalog, no live oracle.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.oracle.fixture_dir = data_dir();
    config.oracle.gemini.canonical_groups_path = data_dir().join("metadata_geraete_list.json");
    config.catalog.seed_path = Some(data_dir().join("catalog_seed.json"));
    config
}

pub async fn test_server(config: AppConfig) -> TestServer {
    let app = create_app(config).await.expect("app should build");
    TestServer::new(app).expect("test server should start")
}

pub fn pdf_part() -> Part {
    Part::bytes(b"%PDF-1.4\n% tender fixture\n".to_vec())
        .file_name("ausschreibung.pdf")
        .mime_type("application/pdf")
}

/// Upload form as the frontend sends it.
pub fn upload(pdf_to_fill: bool, enable_llm_calls: bool) -> MultipartForm {
    MultipartForm::new()
        .add_part("pdf", pdf_part())
        .add_text("pdfToFill", pdf_to_fill.to_string())
        .add_text("enableLlmCalls", enable_llm_calls.to_string())
}
