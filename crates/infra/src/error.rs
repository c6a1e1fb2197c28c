//! Engine error model.

use thiserror::Error;

use bullion_core::DomainError;

use crate::store::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failure of an engine operation. Any error aborts the unit of work.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input (bad purity, zero transfer value, missing party on confirm).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced party, stock item or draft does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stale version or identifier space exhausted after retries.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The change is not allowed in the draft's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A balance rule was broken (e.g. underflow under the `reject` policy).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// The store failed or refused a write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the error is a write-time identifier collision that a retry
    /// with a fresh identifier may resolve.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, EngineError::Store(StoreError::UniqueViolation { .. }))
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => EngineError::Validation(msg),
            DomainError::InvalidId(msg) => EngineError::Validation(msg),
            DomainError::InvariantViolation(msg) => EngineError::InvariantViolation(msg),
            DomainError::NotFound(msg) => EngineError::NotFound(msg),
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
            DomainError::InvalidState(msg) => EngineError::InvalidState(msg),
        }
    }
}
