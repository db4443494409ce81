//! # Reconcile Protocol
//!
//! Record model and conflict resolution for Reconcile.
//!
//! This crate provides:
//! - `Record` with an open field map and typed access to well-known fields
//! - `StoreError` and `ConflictSignal`, the error shape of a remote store
//! - `ConflictResolver`, a whole-record last-write-wins resolver
//!
//! This is a pure crate with no I/O operations.
//!
//! ## Resolution rules
//!
//! - The version with the later logical timestamp wins
//! - Ties, including two missing timestamps, keep the server version
//! - The resolved record always carries the server's version token
//! - History-preserving types keep the losing version as a conflict copy

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod error;
mod record;
mod resolver;

pub use conflict::{ConflictSignal, LoserFate, ResolutionPlan, Winner};
pub use error::{ResolveError, ResolveResult, StoreError, StoreResult};
pub use record::{fields, FieldValue, Record, RecordId, VersionToken, ZoneId};
pub use resolver::{
    logical_timestamp, ConflictCopyRule, ConflictResolver, ResolverConfig,
    DEFAULT_CONFLICT_MARKER,
};
