//! Workflow instances, their session ids, and the snapshots handed to callers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{CatalogRow, MatchedDevice, Mode, SourceDocument, WorkflowRecord};
use crate::stage::Stage;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Input required to start a workflow.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub document: SourceDocument,
    pub mode: Mode,
    pub use_live_oracle: bool,
}

/// External decision delivered on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Catalog row chosen for the current group.
    pub row_id: i64,
    /// Group the caller believes it is answering. Rejected when stale.
    pub expected_group_index: Option<usize>,
}

impl Selection {
    #[must_use]
    pub fn new(row_id: i64) -> Self {
        Self {
            row_id,
            expected_group_index: None,
        }
    }

    #[must_use]
    pub fn for_group(mut self, group_index: usize) -> Self {
        self.expected_group_index = Some(group_index);
        self
    }
}

/// Coarse status derived from the stage cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but never advanced.
    Pending,
    /// Parked at the selection interrupt.
    Suspended,
    Completed,
}

/// A workflow record plus its stage cursor: the suspended-state snapshot.
#[derive(Debug, Clone)]
pub struct WorkflowInstance {
    pub(crate) id: SessionId,
    pub(crate) record: WorkflowRecord,
    pub(crate) cursor: Stage,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) last_error: Option<String>,
}

impl WorkflowInstance {
    #[must_use]
    pub fn new(id: SessionId, request: StartRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            record: WorkflowRecord::new(request.mode, request.document, request.use_live_oracle),
            cursor: Stage::Start,
            created_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn record(&self) -> &WorkflowRecord {
        &self.record
    }

    pub fn cursor(&self) -> Stage {
        self.cursor
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> RunStatus {
        match self.cursor {
            Stage::AwaitSelection => RunStatus::Suspended,
            Stage::Completed => RunStatus::Completed,
            _ => RunStatus::Pending,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Snapshot for the caller.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let pending = (self.cursor == Stage::AwaitSelection)
            .then(|| self.record.current_group().cloned())
            .flatten()
            .map(|group| PendingSelection {
                group_index: self.record.current_group_index,
                total_groups: self.record.total_groups(),
                group,
                candidates: self.record.candidates_for_current_group.clone(),
            });
        WorkflowSnapshot {
            session_id: self.id,
            status: self.status(),
            record: self.record.clone(),
            pending,
        }
    }
}

/// What the caller needs to decide the current group.
#[derive(Debug, Clone, Serialize)]
pub struct PendingSelection {
    pub group_index: usize,
    pub total_groups: usize,
    pub group: MatchedDevice,
    pub candidates: Vec<CatalogRow>,
}

/// Result of driving a workflow to its next stable checkpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub session_id: SessionId,
    pub status: RunStatus,
    pub record: WorkflowRecord,
    pub pending: Option<PendingSelection>,
}

impl WorkflowSnapshot {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn is_suspended(&self) -> bool {
        self.status == RunStatus::Suspended
    }

    pub fn selected_rows(&self) -> &[CatalogRow] {
        self.record.selected_rows()
    }
}
