use thiserror::Error;
use uuid::Uuid;

use crate::interview::store::StoreError;
use crate::llm_client::{ExtractError, LlmError, OracleError};

/// Failures surfaced by the interview orchestrator. None of them leave a partial append
/// behind: the session stays at its last committed state.
#[derive(Debug, Error)]
pub enum InterviewError {
    #[error(transparent)]
    MalformedOracleResponse(#[from] ExtractError),

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(#[from] LlmError),

    #[error("interview session {0} not found")]
    SessionNotFound(Uuid),

    #[error("performance analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("{0}")]
    Validation(String),

    #[error("interview session {0} is already completed")]
    SessionCompleted(Uuid),

    #[error("interview session {0} has not been completed yet")]
    SessionInProgress(Uuid),

    #[error("stale turn: request was for turn {requested} but the session is at turn {actual}")]
    StaleTurn { requested: usize, actual: usize },

    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

impl From<OracleError> for InterviewError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Unavailable(e) => InterviewError::OracleUnavailable(e),
            OracleError::Malformed(e) => InterviewError::MalformedOracleResponse(e),
        }
    }
}
