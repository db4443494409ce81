//! Error types for the sync orchestrator.

use reconcile_protocol::{ResolveError, StoreError};
use thiserror::Error;

/// Result type for orchestrator operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while saving records.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// The store rejected a save.
    ///
    /// A [`StoreError::Conflict`] here means the retry ceiling was reached
    /// and carries the most recent conflict.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A conflict could not be resolved.
    #[error("conflict resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}

impl EngineError {
    /// Returns true if the save exhausted its conflict retries.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, EngineError::Store(e) if e.is_conflict())
    }

    /// Returns true if a fresh top-level save may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(StoreError::Conflict(_)) => true,
            EngineError::Store(StoreError::Network(_)) => true,
            _ => false,
        }
    }
}
