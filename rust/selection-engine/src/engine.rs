//! Stage graph execution.
//!
//! The engine is a re-entry dispatcher over a [`WorkflowInstance`]: each call
//! to [`WorkflowEngine::advance`] checks that the supplied input fits the
//! instance's cursor, then runs stages in a plain loop until one of them
//! suspends or completes. Every stage returns a [`Transition`].
//!
//! # Example
//!
//! ```rust,ignore
//! use selection_engine::prelude::*;
//!
//! let engine = WorkflowEngine::new(oracles, catalog);
//! let mut instance = WorkflowInstance::new(SessionId::new_random(), request);
//!
//! // Runs Start -> Extract -> Match -> PrepareGroup and parks.
//! engine.advance(&mut instance, None).await?;
//!
//! // Deliver the operator's choice for group 0.
//! engine.advance(&mut instance, Some(Selection::new(12))).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::error::{Result, WorkflowError};
use crate::instance::{RunStatus, Selection, SessionId, WorkflowInstance};
use crate::oracle::{self, OracleSet};
use crate::record::{Mode, NewCatalogRow, WorkflowRecord};
use crate::stage::{Stage, Transition};

/// Drives workflow instances through the stage graph.
#[derive(Clone)]
pub struct WorkflowEngine {
    oracles: OracleSet,
    catalog: Arc<dyn CatalogStore>,
}

impl fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("oracles", &self.oracles)
            .field("catalog", &"<dyn CatalogStore>")
            .finish()
    }
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(oracles: OracleSet, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { oracles, catalog }
    }

    pub fn oracles(&self) -> &OracleSet {
        &self.oracles
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    /// Advance `instance` to its next stable checkpoint.
    ///
    /// The run works on a copy of the record. The instance is only updated
    /// when the run suspends or completes; on error it is left exactly as it
    /// was. Rows already inserted by the save stage stay inserted.
    pub async fn advance(
        &self,
        instance: &mut WorkflowInstance,
        input: Option<Selection>,
    ) -> Result<RunStatus> {
        match (instance.cursor, input) {
            (Stage::Completed, _) => return Err(WorkflowError::AlreadyCompleted),
            (Stage::AwaitSelection, None) => return Err(WorkflowError::MissingSelection),
            (Stage::AwaitSelection, Some(_)) | (_, None) => {}
            (stage, Some(_)) => return Err(WorkflowError::NoPendingSelection { stage }),
        }

        let id = instance.id;
        let mut record = instance.record.clone();
        let mut cursor = instance.cursor;
        let mut input = input;

        let status = loop {
            tracing::debug!(session_id = %id, stage = %cursor, "Running stage");
            match self.run_stage(id, cursor, &mut record, &mut input).await? {
                Transition::Goto(next) => cursor = next,
                Transition::Suspend => {
                    cursor = Stage::AwaitSelection;
                    break RunStatus::Suspended;
                }
                Transition::Complete => {
                    cursor = Stage::Completed;
                    break RunStatus::Completed;
                }
            }
        };

        record
            .check_invariants(status == RunStatus::Suspended)
            .map_err(WorkflowError::Invariant)?;

        instance.record = record;
        instance.cursor = cursor;
        instance.last_error = None;
        instance.touch();
        Ok(status)
    }

    async fn run_stage(
        &self,
        id: SessionId,
        stage: Stage,
        record: &mut WorkflowRecord,
        input: &mut Option<Selection>,
    ) -> Result<Transition> {
        match stage {
            Stage::Start => Ok(start(record)),
            Stage::Extract => self.extract(record).await,
            Stage::Match => self.match_groups(record).await,
            Stage::Save => self.save(id, record).await,
            Stage::PrepareGroup => self.prepare_group(record).await,
            Stage::AwaitSelection => await_selection(id, record, input.take()),
            Stage::Completed => Err(WorkflowError::AlreadyCompleted),
        }
    }

    async fn extract(&self, record: &mut WorkflowRecord) -> Result<Transition> {
        let oracle = self.oracles.select(record.use_live_oracle)?;
        let items = oracle.extract(&record.source_document, record.mode).await?;
        oracle::validate_extraction(&items)?;
        record.note(format!("extract: {} devices via {}", items.len(), oracle.name()));
        record.extracted_items = items;
        Ok(Transition::Goto(Stage::Match))
    }

    async fn match_groups(&self, record: &mut WorkflowRecord) -> Result<Transition> {
        let oracle = self.oracles.select(record.use_live_oracle)?;
        let matched = oracle.match_devices(&record.extracted_items).await?;
        oracle::validate_matches(&record.extracted_items, &matched)?;
        record.note(format!("match: {} groups via {}", matched.len(), oracle.name()));
        record.matched_groups = matched;

        Ok(match record.mode {
            Mode::SaveNew => Transition::Goto(Stage::Save),
            Mode::FillFromCatalog => Transition::Goto(Stage::PrepareGroup),
        })
    }

    async fn save(&self, id: SessionId, record: &mut WorkflowRecord) -> Result<Transition> {
        for (index, matched) in record.matched_groups.iter().enumerate() {
            let row = self
                .catalog
                .insert(NewCatalogRow::from(matched))
                .await
                .inspect_err(|e| {
                    tracing::error!(session_id = %id, index, error = %e, "Catalog insert failed");
                })?;
            tracing::debug!(session_id = %id, row_id = row.id, "Inserted catalog row");
        }
        let saved = record.matched_groups.len();
        record.note(format!("save: inserted {saved} catalog rows"));
        tracing::info!(session_id = %id, saved, "Saved devices to catalog");
        Ok(Transition::Complete)
    }

    async fn prepare_group(&self, record: &mut WorkflowRecord) -> Result<Transition> {
        let index = record.current_group_index;
        let len = record.matched_groups.len();
        let group_key = record
            .matched_groups
            .get(index)
            .ok_or(WorkflowError::GroupOutOfBounds { index, len })?
            .group_key()
            .to_string();

        let rows = self.catalog.rows_by_group(&group_key).await?;
        if rows.is_empty() {
            return Err(WorkflowError::EmptyCandidates { group_key });
        }
        record.note(format!(
            "prepare_group: group {}/{len} {group_key:?} has {} candidates",
            index + 1,
            rows.len()
        ));
        record.candidates_for_current_group = rows;
        Ok(Transition::Goto(Stage::AwaitSelection))
    }
}

fn start(record: &mut WorkflowRecord) -> Transition {
    record.reset();
    record.note(format!("start: mode={}", record.mode.as_str()));
    Transition::Goto(Stage::Extract)
}

fn await_selection(
    id: SessionId,
    record: &mut WorkflowRecord,
    input: Option<Selection>,
) -> Result<Transition> {
    let current = record.current_group_index;
    let Some(selection) = input else {
        tracing::info!(
            session_id = %id,
            group_index = current,
            total_groups = record.matched_groups.len(),
            candidates = record.candidates_for_current_group.len(),
            "Awaiting selection"
        );
        return Ok(Transition::Suspend);
    };

    if let Some(expected) = selection.expected_group_index {
        if expected != current {
            tracing::warn!(session_id = %id, expected, current, "Rejected stale selection");
            return Err(WorkflowError::StaleSelection { expected, current });
        }
    }

    let Some(row) = record
        .candidates_for_current_group
        .iter()
        .find(|r| r.id == selection.row_id)
        .cloned()
    else {
        tracing::warn!(
            session_id = %id,
            row_id = selection.row_id,
            group_index = current,
            "Selected device is not a candidate"
        );
        return Err(WorkflowError::UnknownCandidate {
            row_id: selection.row_id,
            group_index: current,
        });
    };

    record.note(format!("await_selection: group {current} -> device {}", row.id));
    record.selected_rows.push(row);
    record.current_group_index += 1;
    record.candidates_for_current_group.clear();

    if record.current_group_index < record.matched_groups.len() {
        Ok(Transition::Goto(Stage::PrepareGroup))
    } else {
        tracing::info!(
            session_id = %id,
            selected = record.selected_rows.len(),
            "All groups resolved"
        );
        Ok(Transition::Complete)
    }
}
