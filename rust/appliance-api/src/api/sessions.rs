//! Session endpoints: start a workflow from an upload, deliver selections,
//! export results.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use selection_engine::instance::{
    RunStatus, Selection, SessionId, StartRequest, WorkflowInstance, WorkflowSnapshot,
};
use selection_engine::record::{CatalogRow, MatchedDevice, Mode, SourceDocument};

use super::error::ApiError;
use crate::AppState;

/// Create the session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/session/start", post(start_session))
        .route("/api/session/{id}", get(session_status))
        .route("/api/session/{id}/resume", post(resume_session))
        .route("/api/session/{id}/export", get(export_session))
}

/// Response for start and resume.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    /// `interrupted` while awaiting a selection, `completed` otherwise.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_device_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_devices: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_being_matched: Option<MatchedDevice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_devices: Option<Vec<CatalogRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_so_far: Option<Vec<CatalogRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_devices: Option<Vec<CatalogRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl SessionResponse {
    fn base(snapshot: &WorkflowSnapshot, status: &'static str) -> Self {
        Self {
            session_id: snapshot.session_id.to_string(),
            status,
            current_device_index: None,
            total_devices: None,
            device_being_matched: None,
            available_devices: None,
            selected_so_far: None,
            selected_devices: None,
            message: None,
        }
    }

    fn started(snapshot: WorkflowSnapshot) -> Self {
        match snapshot.pending.clone() {
            Some(pending) => Self {
                current_device_index: Some(pending.group_index),
                total_devices: Some(pending.total_groups),
                device_being_matched: Some(pending.group),
                available_devices: Some(pending.candidates),
                ..Self::base(&snapshot, "interrupted")
            },
            None => Self {
                message: Some("Done."),
                ..Self::base(&snapshot, "completed")
            },
        }
    }

    fn resumed(snapshot: WorkflowSnapshot) -> Self {
        let selected = snapshot.selected_rows().to_vec();
        match snapshot.pending.clone() {
            Some(pending) => Self {
                current_device_index: Some(pending.group_index),
                total_devices: Some(pending.total_groups),
                device_being_matched: Some(pending.group),
                available_devices: Some(pending.candidates),
                selected_so_far: Some(selected),
                ..Self::base(&snapshot, "interrupted")
            },
            None => Self {
                selected_devices: Some(selected),
                message: Some("All devices processed."),
                ..Self::base(&snapshot, "completed")
            },
        }
    }
}

/// Resume request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub selected_device_id: i64,
    /// Group the caller is answering; stale answers are rejected.
    #[serde(default)]
    pub group_index: Option<usize>,
}

/// Export response.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub devices: Vec<CatalogRow>,
}

/// Session status view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub status: &'static str,
    pub stage: String,
    pub mode: Mode,
    pub use_live_oracle: bool,
    pub current_device_index: usize,
    pub total_devices: usize,
    pub selected_count: usize,
    pub created_at: String,
    pub updated_at: String,
    pub last_error: Option<String>,
    pub log: Vec<String>,
}

impl From<WorkflowInstance> for SessionStatusResponse {
    fn from(instance: WorkflowInstance) -> Self {
        let record = instance.record();
        Self {
            session_id: instance.id().to_string(),
            status: status_label(instance.status()),
            stage: instance.cursor().to_string(),
            mode: record.mode(),
            use_live_oracle: record.use_live_oracle(),
            current_device_index: record.current_group_index(),
            total_devices: record.total_groups(),
            selected_count: record.selected_rows().len(),
            created_at: instance.created_at().to_rfc3339(),
            updated_at: instance.updated_at().to_rfc3339(),
            last_error: instance.last_error().map(str::to_string),
            log: record.log().to_vec(),
        }
    }
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "pending",
        RunStatus::Suspended => "interrupted",
        RunStatus::Completed => "completed",
    }
}

fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse().map_err(|_invalid| ApiError::NotFound(format!("Session not found: {raw}")))
}

/// Parse a multipart boolean flag.
fn parse_flag(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(ApiError::bad_request(format!(
            "{name} must be \"true\" or \"false\", got {other:?}"
        ))),
    }
}

/// Start a workflow from a multipart upload.
///
/// Fields: `pdf` (file), `pdfToFill`, `enableLlmCalls`, optional `mode`.
async fn start_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut document = None;
    let mut pdf_to_fill = false;
    let mut use_live_oracle = false;
    let mut mode = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "pdf" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("cannot read pdf: {e}")))?;
                document = Some(SourceDocument::from(bytes.to_vec()));
            }
            "pdfToFill" | "enableLlmCalls" | "mode" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("cannot read {name}: {e}")))?;
                match name.as_str() {
                    "pdfToFill" => pdf_to_fill = parse_flag(&name, &value)?,
                    "enableLlmCalls" => use_live_oracle = parse_flag(&name, &value)?,
                    _ => mode = Some(value.parse::<Mode>().map_err(ApiError::BadRequest)?),
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let document = document
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::bad_request("No PDF file uploaded"))?;
    let mode = mode.unwrap_or_else(|| Mode::from_fill_flag(pdf_to_fill));

    tracing::info!(
        mode = mode.as_str(),
        use_live_oracle,
        bytes = document.len(),
        "Starting session"
    );

    let snapshot = state
        .registry
        .start(StartRequest {
            document,
            mode,
            use_live_oracle,
        })
        .await?;
    Ok(Json(SessionResponse::started(snapshot)))
}

/// Deliver the operator's selection for the current group.
async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ResumeRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = parse_session_id(&id)?;
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut selection = Selection::new(request.selected_device_id);
    if let Some(group_index) = request.group_index {
        selection = selection.for_group(group_index);
    }

    let snapshot = state.registry.resume(id, selection).await?;
    Ok(Json(SessionResponse::resumed(snapshot)))
}

/// Rows selected so far.
async fn export_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExportResponse>, ApiError> {
    let id = parse_session_id(&id)?;
    let devices = state.registry.export(id)?;
    Ok(Json(ExportResponse { devices }))
}

async fn session_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let id = parse_session_id(&id)?;
    let instance = state.registry.get(id)?;
    Ok(Json(SessionStatusResponse::from(instance)))
}
