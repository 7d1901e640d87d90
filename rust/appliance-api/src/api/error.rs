//! Mapping of workflow and request errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use selection_engine::{ErrorKind, StoreError, WorkflowError};

/// Error returned by API handlers.
///
/// Serialized as `{"error": <kind>, "message": <text>}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// HTTP status and machine-readable kind.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Workflow(e) => status_for_kind(e.kind()),
            Self::Store(_) => status_for_kind(ErrorKind::Store),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        }
    }
}

fn status_for_kind(kind: ErrorKind) -> (StatusCode, &'static str) {
    let status = match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::Protocol => StatusCode::CONFLICT,
        ErrorKind::Oracle => StatusCode::BAD_GATEWAY,
        ErrorKind::Store => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, kind.as_str())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), kind, error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), kind, error = %self, "Request rejected");
        }
        (
            status,
            Json(serde_json::json!({
                "error": kind,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
