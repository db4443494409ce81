//! # Reconcile Engine
//!
//! Conflict-resolving save orchestrator for Reconcile.
//!
//! This crate provides:
//! - `SyncOrchestrator`, which saves records and resolves version conflicts
//! - Bounded retry of cascading conflicts
//! - Partial-failure-tolerant batch saves
//! - `RecordStore`, the seam to the remote store, with an in-memory store
//! - Resolution notices delivered over a single channel
//!
//! ## Architecture
//!
//! A save flows one way:
//! 1. The record is saved to the store
//! 2. On a version conflict, the resolver computes a plan
//! 3. The resolved record is retried, up to the retry ceiling
//! 4. Conflict copies are saved best-effort once the winner is stored
//! 5. A resolution notice is posted
//!
//! ## Key Invariants
//!
//! - The retried record always carries the server's version token
//! - Non-conflict store errors are never retried
//! - A failed conflict copy never rolls back its winner
//! - In a batch, one failure never stops the remaining records

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod notify;
mod orchestrator;
mod store;

pub use config::{Backoff, EngineConfig, RetryConfig};
pub use error::{EngineError, EngineResult};
pub use notify::{ChannelNotifier, ConflictNotifier, NoopNotifier, ResolutionNotice};
pub use orchestrator::{BatchResult, SyncOrchestrator};
pub use store::{MemoryStore, RecordStore};
