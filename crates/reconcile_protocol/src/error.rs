//! Error types raised by the remote store and the conflict resolver.

use crate::conflict::ConflictSignal;
use crate::record::RecordId;
use thiserror::Error;

/// Result type for remote store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for conflict resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors reported by a remote record store.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The saved record carried a stale version token.
    #[error("server record changed: {}", .0.describe())]
    Conflict(Box<ConflictSignal>),

    /// Network failure talking to the store.
    #[error("network error: {0}")]
    Network(String),

    /// The caller may not write this record.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The store refused the write for quota reasons.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// No record with this id exists.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Any other store failure.
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Wraps a conflict signal.
    pub fn conflict(signal: ConflictSignal) -> Self {
        Self::Conflict(Box::new(signal))
    }

    /// Returns true if this error is a version-token conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Returns the conflict signal, if this is a conflict.
    pub fn as_conflict(&self) -> Option<&ConflictSignal> {
        match self {
            StoreError::Conflict(signal) => Some(signal),
            _ => None,
        }
    }
}

/// Errors raised while planning a conflict resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Resolution was requested for an error that is not a conflict.
    #[error("error is not a version conflict")]
    NotAConflict,

    /// The conflict signal did not carry the server's record.
    #[error("conflict signal is missing the server record")]
    MissingServerRecord,

    /// The conflict signal did not carry the client's record.
    #[error("conflict signal is missing the client record")]
    MissingClientRecord,

    /// The losing record could not be duplicated into a conflict copy.
    #[error("failed to copy {record_type} record: {reason}")]
    RecordCopyFailed {
        /// Type of the record being copied.
        record_type: String,
        /// Why the copy could not be built.
        reason: String,
    },
}
