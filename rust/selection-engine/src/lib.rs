//! Resumable human-in-the-loop workflow for appliance catalog matching.
//!
//! This crate provides:
//! - The workflow record and stage graph (extract, match, save or resolve groups)
//! - A re-entry dispatcher that suspends at the selection point and resumes
//!   with an operator's decision
//! - An in-memory session registry that serializes runs per session
//! - Oracle and catalog store traits, with fixture and in-memory implementations
//!
//! # Architecture
//!
//! ```text
//! SessionRegistry
//! ├─> SessionSlot (run gate + committed WorkflowInstance)
//! └─> WorkflowEngine
//!     ├─> OracleSet (fixture | live)   ← extraction + matching
//!     └─> CatalogStore                 ← candidate lookup + append-only insert
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use selection_engine::prelude::*;
//!
//! let oracles = OracleSet::new(Arc::new(FixtureOracle::from_dir("data")?));
//! let registry = SessionRegistry::new(WorkflowEngine::new(oracles, catalog));
//!
//! let snapshot = registry.start(request).await?;
//! let snapshot = registry.resume(snapshot.session_id, Selection::new(3)).await?;
//! let rows = registry.export(snapshot.session_id)?;
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod instance;
pub mod oracle;
pub mod record;
pub mod registry;
pub mod stage;

// Re-exports
pub use engine::WorkflowEngine;
pub use error::{ErrorKind, OracleError, StoreError, WorkflowError};
pub use registry::SessionRegistry;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::catalog::{CatalogStore, InMemoryCatalog};
    pub use crate::engine::WorkflowEngine;
    pub use crate::error::{ErrorKind, OracleError, StoreError, WorkflowError};
    pub use crate::instance::{
        PendingSelection, RunStatus, Selection, SessionId, StartRequest, WorkflowInstance,
        WorkflowSnapshot,
    };
    pub use crate::oracle::{DeviceOracle, FixtureOracle, OracleSet};
    pub use crate::record::{
        CatalogRow, Device, MatchedDevice, Mode, NewCatalogRow, SourceDocument, WorkflowRecord,
    };
    pub use crate::registry::SessionRegistry;
    pub use crate::stage::{Stage, Transition};
}
