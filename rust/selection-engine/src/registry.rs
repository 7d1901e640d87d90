//! In-memory session registry.
//!
//! Maps session ids to workflow instances and serializes runs per session.
//! Each session slot has a run gate (a tokio mutex taken with `try_lock`) and
//! the last committed instance behind a `parking_lot` lock. A second run that
//! arrives while the gate is held is rejected with
//! [`WorkflowError::SessionBusy`]; it is never queued. Reads such as
//! [`SessionRegistry::export`] only touch the committed instance and never
//! wait for a running stage.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::engine::WorkflowEngine;
use crate::error::{Result, WorkflowError};
use crate::instance::{Selection, SessionId, StartRequest, WorkflowInstance, WorkflowSnapshot};
use crate::record::CatalogRow;

/// Attempts at drawing an unused session id before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

struct SessionSlot {
    run_gate: Mutex<()>,
    state: RwLock<WorkflowInstance>,
}

/// Registry of live workflow sessions. Lifetime is the process lifetime.
pub struct SessionRegistry {
    engine: WorkflowEngine,
    sessions: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("engine", &self.engine)
            .field("sessions", &self.sessions.read().len())
            .finish()
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new(engine: WorkflowEngine) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    /// Allocate a fresh instance under a new session id.
    pub fn create(&self, request: StartRequest) -> Result<SessionId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = SessionId::new_random();
            let mut sessions = self.sessions.write();
            if sessions.contains_key(&id) {
                continue;
            }
            let slot = SessionSlot {
                run_gate: Mutex::new(()),
                state: RwLock::new(WorkflowInstance::new(id, request)),
            };
            sessions.insert(id, Arc::new(slot));
            tracing::info!(session_id = %id, "Created session");
            return Ok(id);
        }
        Err(WorkflowError::IdExhausted)
    }

    /// Copy of the committed instance.
    pub fn get(&self, id: SessionId) -> Result<WorkflowInstance> {
        Ok(self.slot(id)?.state.read().clone())
    }

    /// Drive the session from its cursor to the next suspension or to
    /// completion, applying `input` at the suspension point.
    pub async fn run_to_suspension_or_completion(
        &self,
        id: SessionId,
        input: Option<Selection>,
    ) -> Result<WorkflowSnapshot> {
        let slot = self.slot(id)?;
        let Ok(_gate) = slot.run_gate.try_lock() else {
            tracing::warn!(session_id = %id, "Rejected concurrent run");
            return Err(WorkflowError::SessionBusy(id));
        };

        let mut working = slot.state.read().clone();
        match self.engine.advance(&mut working, input).await {
            Ok(status) => {
                let snapshot = working.snapshot();
                *slot.state.write() = working;
                tracing::info!(
                    session_id = %id,
                    ?status,
                    group_index = snapshot.record.current_group_index(),
                    "Session checkpoint committed"
                );
                Ok(snapshot)
            }
            Err(e) => {
                let mut state = slot.state.write();
                state.last_error = Some(e.to_string());
                state.touch();
                tracing::error!(session_id = %id, kind = e.kind().as_str(), error = %e, "Session run failed");
                Err(e)
            }
        }
    }

    /// Create a session and run it until it suspends or completes.
    ///
    /// A session whose first run fails is removed again, since the caller
    /// never learns its id.
    pub async fn start(&self, request: StartRequest) -> Result<WorkflowSnapshot> {
        let id = self.create(request)?;
        match self.run_to_suspension_or_completion(id, None).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                self.remove(id);
                Err(e)
            }
        }
    }

    /// Deliver a selection to a suspended session.
    pub async fn resume(&self, id: SessionId, selection: Selection) -> Result<WorkflowSnapshot> {
        self.run_to_suspension_or_completion(id, Some(selection)).await
    }

    /// Rows selected so far. Safe to call at any time.
    pub fn export(&self, id: SessionId) -> Result<Vec<CatalogRow>> {
        Ok(self.slot(id)?.state.read().record.selected_rows.clone())
    }

    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Removed session");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Remove sessions idle for at least `max_idle`. Sessions with a run in
    /// progress are kept. Returns the number removed.
    pub fn reap_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let now = Utc::now();

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|id, slot| {
            if slot.run_gate.try_lock().is_err() {
                return true;
            }
            let idle = now - slot.state.read().updated_at;
            let keep = idle < max_idle;
            if !keep {
                tracing::info!(session_id = %id, idle_secs = idle.num_seconds(), "Reaped idle session");
            }
            keep
        });
        before - sessions.len()
    }

    fn slot(&self, id: SessionId) -> Result<Arc<SessionSlot>> {
        self.sessions
            .read()
            .get(&id)
            .map(Arc::clone)
            .ok_or(WorkflowError::SessionNotFound(id))
    }
}
