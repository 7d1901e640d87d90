//! Error taxonomy for the selection workflow.
//!
//! Every failure surfaced by the engine or the session registry is a
//! [`WorkflowError`]. Callers that need to translate errors into a transport
//! status should match on [`WorkflowError::kind`] rather than on variants.

use thiserror::Error;

use crate::instance::SessionId;
use crate::stage::Stage;

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown session id.
    NotFound,
    /// Bad caller input; the instance is unchanged and the call may be retried.
    Input,
    /// Extraction/matching produced unusable output.
    Oracle,
    /// Catalog lookup or insert failed.
    Store,
    /// Call was not valid for the current workflow position.
    Protocol,
    /// Broken internal invariant.
    Internal,
}

impl ErrorKind {
    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Input => "input",
            Self::Oracle => "oracle",
            Self::Store => "store",
            Self::Protocol => "protocol",
            Self::Internal => "internal",
        }
    }
}

/// Failures of the extraction/matching oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle returned no items during {stage}")]
    Empty { stage: &'static str },

    #[error("oracle returned malformed output: {0}")]
    Malformed(String),

    #[error("matching returned {matched} items for {extracted} extracted items")]
    ArityMismatch { extracted: usize, matched: usize },

    #[error("matched item {index} ({matched:?}) does not correspond to extracted item {extracted:?}")]
    Diverged {
        index: usize,
        extracted: String,
        matched: String,
    },

    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("oracle request failed: {0}")]
    Request(String),

    #[error("fixture error: {0}")]
    Fixture(String),
}

/// Failures of the catalog store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("catalog backend error: {0}")]
    Backend(String),

    #[error("catalog row could not be decoded: {0}")]
    Decode(String),
}

/// Errors returned by the workflow engine and session registry.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("device {row_id} is not a candidate for group {group_index}")]
    UnknownCandidate { row_id: i64, group_index: usize },

    #[error("workflow is awaiting a selection but none was supplied")]
    MissingSelection,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("selection targets group {expected} but the workflow is at group {current}")]
    StaleSelection { expected: usize, current: usize },

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("no catalog candidates for group {group_key:?}")]
    EmptyCandidates { group_key: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no selection is pending (workflow is at {stage})")]
    NoPendingSelection { stage: Stage },

    #[error("workflow has already completed")]
    AlreadyCompleted,

    #[error("session {0} is already running")]
    SessionBusy(SessionId),

    #[error("group index {index} out of bounds for {len} groups")]
    GroupOutOfBounds { index: usize, len: usize },

    #[error("workflow invariant violated: {0}")]
    Invariant(String),

    #[error("could not allocate a unique session id")]
    IdExhausted,
}

impl WorkflowError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_) => ErrorKind::NotFound,
            Self::UnknownCandidate { .. }
            | Self::MissingSelection
            | Self::InvalidInput(_) => ErrorKind::Input,
            Self::Oracle(_) | Self::EmptyCandidates { .. } => ErrorKind::Oracle,
            Self::Store(_) => ErrorKind::Store,
            Self::StaleSelection { .. }
            | Self::NoPendingSelection { .. }
            | Self::AlreadyCompleted
            | Self::SessionBusy(_) => ErrorKind::Protocol,
            Self::GroupOutOfBounds { .. } | Self::Invariant(_) | Self::IdExhausted => {
                ErrorKind::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            WorkflowError::UnknownCandidate {
                row_id: 9,
                group_index: 0
            }
            .kind(),
            ErrorKind::Input
        );
        assert_eq!(WorkflowError::AlreadyCompleted.kind(), ErrorKind::Protocol);
        assert_eq!(
            WorkflowError::from(OracleError::Empty { stage: "extract" }).kind(),
            ErrorKind::Oracle
        );
        assert_eq!(
            WorkflowError::from(StoreError::Backend("down".into())).kind(),
            ErrorKind::Store
        );
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
    }
}
