//! Appliance API - kitchen appliance extraction and catalog matching
//!
//! HTTP front end for the resumable selection workflow in
//! [`selection_engine`]. A caller uploads a tender document, the service
//! extracts the listed devices, matches them onto canonical device groups,
//! then either stores them as new catalog rows or walks the caller through
//! choosing one existing catalog row per group.
//!
//! # Architecture
//!
//! - [`config`]: layered configuration (defaults, file, `APPLIANCE__*` env)
//! - [`llm`]: live Gemini oracle and its prompts
//! - [`database`]: SQLite catalog store
//! - [`runtime`]: background idle-session reaper
//! - [`api`]: HTTP endpoints
//! - [`server`]: state assembly, middleware, router
//!
//! # Example
//!
//! ```rust,ignore
//! use appliance_api::{config::AppConfig, server::create_app};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let app = create_app(config).await?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions, reason = "module-prefixed type names read better at call sites")]

pub mod api;
pub mod config;
pub mod database;
pub mod llm;
pub mod logging;
pub mod runtime;
pub mod server;

use std::sync::Arc;

use config::AppConfig;
use selection_engine::SessionRegistry;
use selection_engine::catalog::CatalogStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Live workflow sessions.
    pub registry: Arc<SessionRegistry>,
    /// Device catalog, shared with the workflow engine.
    pub catalog: Arc<dyn CatalogStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"AppConfig")
            .field("sessions", &self.registry.len())
            .field("live_oracle", &self.registry.engine().oracles().has_live())
            .finish_non_exhaustive()
    }
}
