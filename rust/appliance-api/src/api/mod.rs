//! HTTP API endpoints.

pub mod catalog;
pub mod error;
pub mod health;
pub mod sessions;

use axum::Router;

use crate::AppState;

pub use error::ApiError;

/// Create the API router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(sessions::router())
        .merge(catalog::router())
}
