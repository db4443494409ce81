//! Conflict signals and resolution plans.

use crate::record::{Record, RecordId};
use std::fmt;

/// The payload of a version-token conflict raised by the store.
///
/// Every record is optional because the store is an external collaborator;
/// the resolver rejects signals missing the server or client side.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictSignal {
    /// The record as the store currently holds it.
    pub server_record: Option<Record>,
    /// The record the caller tried to save.
    pub client_record: Option<Record>,
    /// The common ancestor, absent when both sides created the record.
    pub ancestor_record: Option<Record>,
}

impl ConflictSignal {
    /// Creates a complete conflict signal.
    pub fn new(server: Record, client: Record, ancestor: Option<Record>) -> Self {
        Self {
            server_record: Some(server),
            client_record: Some(client),
            ancestor_record: ancestor,
        }
    }

    /// Returns true if both sides created the record independently.
    pub fn is_create_conflict(&self) -> bool {
        self.ancestor_record.is_none()
    }

    /// Id of the conflicting record, taken from whichever side is present.
    pub fn record_id(&self) -> Option<&RecordId> {
        self.server_record
            .as_ref()
            .or(self.client_record.as_ref())
            .map(Record::id)
    }

    /// One-line summary for error messages.
    pub fn describe(&self) -> String {
        match self.record_id() {
            Some(id) => format!("record {id}"),
            None => "record unknown".to_string(),
        }
    }
}

/// Which side of a conflict won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winner {
    /// The store's current version.
    Server,
    /// The caller's version.
    Client,
}

impl Winner {
    /// Lowercase name used in descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Server => "server",
            Winner::Client => "client",
        }
    }

    /// The opposite side.
    pub fn other(&self) -> Winner {
        match self {
            Winner::Server => Winner::Client,
            Winner::Client => Winner::Server,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the losing version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoserFate {
    /// The losing fields were dropped.
    Discarded,
    /// The losing fields were kept in a new record with this id.
    PreservedAsCopy(RecordId),
}

impl fmt::Display for LoserFate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoserFate::Discarded => f.write_str("discarded"),
            LoserFate::PreservedAsCopy(id) => write!(f, "preserved as conflict copy {id}"),
        }
    }
}

/// The outcome of resolving one conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionPlan {
    /// Record to re-save under the original id, carrying the server's token.
    pub resolved_record: Record,
    /// Records to create in addition, such as conflict copies.
    pub extra_records: Vec<Record>,
    /// Human-readable summary. Not meant to be parsed.
    pub description: String,
    /// Type of the conflicting record.
    pub affected_type: String,
    /// What happened to the losing version.
    pub loser_fate: LoserFate,
    /// Which side won.
    pub winner: Winner,
}
