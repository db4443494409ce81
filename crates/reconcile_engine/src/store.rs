//! Remote record store abstraction.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use reconcile_protocol::{
    ConflictSignal, Record, RecordId, StoreError, StoreResult, VersionToken,
};
use std::collections::HashMap;

/// A remote record store with optimistic concurrency.
///
/// This trait abstracts the remote side, allowing for different
/// implementations (cloud database, in-memory store for testing, etc.).
/// Saving a record whose version token is stale must fail with
/// [`StoreError::Conflict`] carrying the server's current record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Saves a record, returning the stored version with its new token.
    async fn save(&self, record: Record) -> StoreResult<Record>;

    /// Fetches the current version of a record.
    async fn fetch(&self, id: &RecordId) -> StoreResult<Record>;

    /// Deletes a record.
    async fn delete(&self, id: &RecordId) -> StoreResult<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<RecordId, Record>,
    /// Every version ever stored, keyed by token, for ancestor lookup.
    versions: HashMap<VersionToken, Record>,
    failures: HashMap<RecordId, StoreError>,
    next_token: u64,
    save_calls: u64,
}

impl MemoryState {
    fn next_token(&mut self) -> VersionToken {
        loop {
            self.next_token += 1;
            let token = VersionToken::new(format!("v{}", self.next_token));
            if !self.versions.contains_key(&token) {
                return token;
            }
        }
    }

    fn store(&mut self, mut record: Record) -> Record {
        let token = self.next_token();
        record.set_version_token(Some(token.clone()));
        record.set_store_modified_at(Some(Utc::now()));
        self.versions.insert(token, record.clone());
        self.records.insert(record.id().clone(), record.clone());
        record
    }
}

/// An in-memory record store that enforces version tokens.
///
/// Every successful save assigns a fresh token and modification time. Saving
/// with a token that does not match the stored one, or creating a record
/// whose id is already taken, raises a conflict.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record unconditionally, as if written by another device.
    pub fn insert(&self, record: Record) -> Record {
        self.state.write().store(record)
    }

    /// Stores a record keeping its own version token, if it has one.
    ///
    /// Used to load a snapshot of remote state whose tokens clients
    /// already hold.
    pub fn seed(&self, record: Record) -> Record {
        let mut state = self.state.write();
        match record.version_token().cloned() {
            Some(token) => {
                state.versions.insert(token, record.clone());
                state.records.insert(record.id().clone(), record.clone());
                record
            }
            None => state.store(record),
        }
    }

    /// Returns the current version of a record.
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.state.read().records.get(id).cloned()
    }

    /// Returns all current records, ordered by id.
    pub fn records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.state.read().records.values().cloned().collect();
        records.sort_by(|a, b| a.id().cmp(b.id()));
        records
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    /// Returns how many times `save` has been called.
    pub fn save_calls(&self) -> u64 {
        self.state.read().save_calls
    }

    /// Makes every save of `id` fail with `error`.
    pub fn fail_saves_for(&self, id: RecordId, error: StoreError) {
        self.state.write().failures.insert(id, error);
    }

    /// Removes all injected failures.
    pub fn clear_failures(&self) {
        self.state.write().failures.clear();
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, record: Record) -> StoreResult<Record> {
        let mut state = self.state.write();
        state.save_calls += 1;

        if let Some(error) = state.failures.get(record.id()) {
            return Err(error.clone());
        }

        if let Some(current) = state.records.get(record.id()) {
            if current.version_token() != record.version_token() {
                let ancestor = record
                    .version_token()
                    .and_then(|token| state.versions.get(token))
                    .cloned();
                return Err(StoreError::conflict(ConflictSignal::new(
                    current.clone(),
                    record,
                    ancestor,
                )));
            }
        }

        Ok(state.store(record))
    }

    async fn fetch(&self, id: &RecordId) -> StoreResult<Record> {
        self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn delete(&self, id: &RecordId) -> StoreResult<()> {
        self.state
            .write()
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
