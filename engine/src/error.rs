use thiserror::Error as ThisError;

use crate::store::StoreError;

/// Failure taxonomy for engine operations.
///
/// `Conflict` is the only transient variant: it is surfaced after the
/// orchestration layer has already retried the read-modify-write once.
/// Everything else is terminal for the request and commits no state.
#[derive(Debug, ThisError)]
pub enum EngineError {
    #[error("user not found")]
    UserNotFound,
    #[error("task not found")]
    TaskNotFound,
    #[error("task already completed")]
    AlreadyClaimed,
    #[error("no game sessions left")]
    InsufficientSessions,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("concurrent update conflict")]
    Conflict,
    #[error("store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => EngineError::Conflict,
            StoreError::DuplicateCompletion => EngineError::AlreadyClaimed,
            StoreError::Unavailable(source) => EngineError::Unavailable(source),
        }
    }
}

impl EngineError {
    /// Whether the caller may retry the whole request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict)
    }
}
