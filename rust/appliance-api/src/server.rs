//! HTTP server setup and middleware.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use selection_engine::catalog::{CatalogStore, InMemoryCatalog};
use selection_engine::oracle::{FixtureOracle, OracleSet};
use selection_engine::{SessionRegistry, WorkflowEngine};

use crate::api;
use crate::config::{AppConfig, CatalogConfig, OracleConfig};
use crate::llm::GeminiOracle;
use crate::logging::OpTimer;
use crate::{AppState, log_banner, log_init_step, log_init_warning, log_success};

/// Appliance API version (from Cargo.toml).
const VERSION: &str = env!("CARGO_PKG_VERSION");

const INIT_STEPS: u32 = 4;

/// Create the application with all routes and middleware.
pub async fn create_app(config: AppConfig) -> anyhow::Result<Router> {
    let state = build_state(config).await?;
    Ok(build_router(state))
}

/// Assemble catalog, oracles and session registry.
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let overall_timer = OpTimer::new("server", "build_state");

    log_banner!(
        format!("🍳 Appliance API v{VERSION}"),
        format!("Listening target: {}", config.server.bind_address())
    );

    // [1/4] Device catalog
    let step_timer = OpTimer::new("server", "catalog");
    let (catalog, catalog_info) = build_catalog(&config.catalog).await?;
    log_init_step!(1, INIT_STEPS, "Catalog", catalog_info);
    step_timer.finish();

    // [2/4] Extraction/matching oracles
    let step_timer = OpTimer::new("server", "oracles");
    let (oracles, oracle_info) = build_oracles(&config.oracle)?;
    log_init_step!(2, INIT_STEPS, "Oracles", oracle_info);
    step_timer.finish();

    // [3/4] Workflow engine and session registry
    let step_timer = OpTimer::new("server", "registry");
    let engine = WorkflowEngine::new(oracles, Arc::clone(&catalog));
    let registry = Arc::new(SessionRegistry::new(engine));
    let session_info = match config.sessions.idle_timeout() {
        Some(idle) => format!("🗂️  In-memory, idle sessions reaped after {}s", idle.as_secs()),
        None => "🗂️  In-memory, kept for process lifetime".to_string(),
    };
    log_init_step!(3, INIT_STEPS, "Sessions", session_info);
    step_timer.finish();

    overall_timer.finish();

    Ok(AppState {
        config: Arc::new(config),
        registry,
        catalog,
    })
}

/// Build the router with middleware around the API routes.
pub fn build_router(state: AppState) -> Router {
    let step_timer = OpTimer::new("server", "router");
    let timeout = Duration::from_secs(state.config.server.timeout_secs);
    let body_limit = state.config.server.max_upload_bytes;

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let app = api::create_router()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware)
        .with_state(state);

    log_init_step!(4, INIT_STEPS, "Router", "🌐 Routes + middleware configured");
    step_timer.finish();
    log_success!("Appliance API ready");

    app
}

async fn build_catalog(config: &CatalogConfig) -> anyhow::Result<(Arc<dyn CatalogStore>, String)> {
    if let Some(path) = &config.sqlite_path {
        let catalog = open_sqlite(path).await?;
        return Ok((catalog, format!("🗄️  SQLite {}", path.display())));
    }

    match &config.seed_path {
        Some(path) => {
            let catalog = InMemoryCatalog::from_json_file(path)
                .with_context(|| format!("Failed to seed catalog from {}", path.display()))?;
            let info = format!("🗄️  In-memory, {} seeded rows", catalog.len());
            Ok((Arc::new(catalog), info))
        }
        None => {
            log_init_warning!("No catalog configured. Starting with an empty in-memory catalog.");
            Ok((Arc::new(InMemoryCatalog::new()), "🗄️  In-memory, empty".to_string()))
        }
    }
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(path: &Path) -> anyhow::Result<Arc<dyn CatalogStore>> {
    let catalog = crate::database::SqliteCatalog::open(path).await?;
    Ok(Arc::new(catalog))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(path: &Path) -> anyhow::Result<Arc<dyn CatalogStore>> {
    anyhow::bail!(
        "catalog.sqlite_path is {} but this build lacks the `sqlite` feature",
        path.display()
    )
}

fn build_oracles(config: &OracleConfig) -> anyhow::Result<(OracleSet, String)> {
    let fixture = FixtureOracle::from_dir(&config.fixture_dir).with_context(|| {
        format!(
            "Failed to load oracle fixtures from {}",
            config.fixture_dir.display()
        )
    })?;
    let oracles = OracleSet::new(Arc::new(fixture));

    if config.gemini.api_key.is_none() {
        log_init_warning!("No Gemini API key configured. Sessions with enableLlmCalls=true will fail.");
        return Ok((oracles, "🤖 fixture".to_string()));
    }

    let gemini = GeminiOracle::from_config(&config.gemini)?;
    let info = format!("🤖 fixture + {} ✓", gemini.model());
    Ok((oracles.with_live(Arc::new(gemini)), info))
}
