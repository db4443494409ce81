//! Last-write-wins conflict resolver.
//!
//! The resolver is pure: it turns a [`ConflictSignal`] into a
//! [`ResolutionPlan`] without touching the store. Resolution is whole-record:
//! the newer side's fields replace the older side's on a copy of the server
//! record, so the retried save carries the token the store expects.

use crate::conflict::{ConflictSignal, LoserFate, ResolutionPlan, Winner};
use crate::error::{ResolveError, ResolveResult, StoreError};
use crate::record::{fields, FieldValue, Record, RecordId};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use tracing::{info, warn};

/// Suffix appended to the content of a conflict copy.
pub const DEFAULT_CONFLICT_MARKER: &str = " (Conflict Copy)";

/// How to build a conflict copy for a history-preserving record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictCopyRule {
    /// Field holding the user-visible content; receives the marker suffix.
    pub content_field: String,
    /// Field mirroring the record's own id, rewritten on the copy.
    pub identity_field: Option<String>,
    /// Field stamped with the copy's creation time.
    pub timestamp_field: String,
}

impl ConflictCopyRule {
    /// Creates a rule for the given content field.
    pub fn new(content_field: impl Into<String>) -> Self {
        Self {
            content_field: content_field.into(),
            identity_field: None,
            timestamp_field: fields::MODIFIED_AT.to_string(),
        }
    }

    /// Sets the canonical-identity field.
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }

    /// Sets the field stamped with the copy time.
    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }
}

/// Configuration for the conflict resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Record types whose losing versions are kept as conflict copies.
    pub copy_rules: HashMap<String, ConflictCopyRule>,
    /// Suffix appended to a conflict copy's content.
    pub marker: String,
}

impl ResolverConfig {
    /// Creates a configuration where every loser is discarded.
    pub fn new() -> Self {
        Self {
            copy_rules: HashMap::new(),
            marker: DEFAULT_CONFLICT_MARKER.to_string(),
        }
    }

    /// Registers a history-preserving record type.
    pub fn with_history_preserving(
        mut self,
        record_type: impl Into<String>,
        rule: ConflictCopyRule,
    ) -> Self {
        self.copy_rules.insert(record_type.into(), rule);
        self
    }

    /// Sets the conflict-copy marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Returns the copy rule for a record type, if it preserves history.
    pub fn copy_rule(&self, record_type: &str) -> Option<&ConflictCopyRule> {
        self.copy_rules.get(record_type)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes resolution plans for version conflicts.
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    config: ResolverConfig,
}

impl ConflictResolver {
    /// Creates a resolver.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Plans the resolution of a store error.
    ///
    /// Fails with [`ResolveError::NotAConflict`] for anything other than
    /// [`StoreError::Conflict`].
    pub fn plan(&self, error: &StoreError) -> ResolveResult<ResolutionPlan> {
        let signal = error.as_conflict().ok_or(ResolveError::NotAConflict)?;
        self.plan_signal(signal)
    }

    /// Plans the resolution of a conflict signal.
    pub fn plan_signal(&self, signal: &ConflictSignal) -> ResolveResult<ResolutionPlan> {
        let server = signal
            .server_record
            .as_ref()
            .ok_or(ResolveError::MissingServerRecord)?;
        let client = signal
            .client_record
            .as_ref()
            .ok_or(ResolveError::MissingClientRecord)?;

        let server_ts = logical_timestamp(server);
        let client_ts = logical_timestamp(client);

        // Option orders None below Some, so a missing timestamp never wins.
        let winner = if client_ts.is_some() && client_ts > server_ts {
            Winner::Client
        } else {
            Winner::Server
        };

        if server_ts == client_ts {
            warn!(
                record_type = server.record_type(),
                record_id = %server.id(),
                tie_break = true,
                timestamps_missing = server_ts.is_none(),
                "conflict timestamps tied, keeping server version"
            );
        }

        let (winning, losing, winner_ts) = match winner {
            Winner::Server => (server, client, server_ts),
            Winner::Client => (client, server, client_ts),
        };

        let mut resolved = server.clone();
        resolved.overwrite_fields_from(winning);

        let affected_type = server.record_type().to_string();
        let (extra_records, loser_fate) = match self.config.copy_rule(&affected_type) {
            Some(rule) => {
                let copy = self.conflict_copy(losing, rule)?;
                let fate = LoserFate::PreservedAsCopy(copy.id().clone());
                (vec![copy], fate)
            }
            None => (Vec::new(), LoserFate::Discarded),
        };

        let description = format!(
            "{} {}: {} version won (modified {}); {} version {}",
            affected_type,
            server.id(),
            winner,
            format_timestamp(winner_ts),
            winner.other(),
            loser_fate,
        );

        info!(
            record_type = %affected_type,
            record_id = %server.id(),
            winner = %winner,
            loser_fate = %loser_fate,
            "resolved conflict"
        );

        Ok(ResolutionPlan {
            resolved_record: resolved,
            extra_records,
            description,
            affected_type,
            loser_fate,
            winner,
        })
    }

    /// Builds a new record preserving the losing version's content.
    fn conflict_copy(&self, losing: &Record, rule: &ConflictCopyRule) -> ResolveResult<Record> {
        let id = RecordId::generate(losing.id().zone.clone());
        let mut copy = losing.duplicate_as(id);

        let content = match copy.field(&rule.content_field) {
            None | Some(FieldValue::Null) => self.config.marker.clone(),
            Some(FieldValue::Text(text)) => format!("{text}{}", self.config.marker),
            Some(other) => {
                return Err(ResolveError::RecordCopyFailed {
                    record_type: losing.record_type().to_string(),
                    reason: format!(
                        "content field {:?} holds a {} value",
                        rule.content_field,
                        other.kind()
                    ),
                })
            }
        };
        copy.set_field(rule.content_field.clone(), content);

        if let Some(identity_field) = &rule.identity_field {
            let name = copy.id().name.clone();
            copy.set_field(identity_field.clone(), name);
        }

        copy.set_field(rule.timestamp_field.clone(), Utc::now());

        Ok(copy)
    }
}

/// The instant used to order conflicting versions of a record.
///
/// See [`Record::logical_timestamp`] for the field precedence.
pub fn logical_timestamp(record: &Record) -> Option<DateTime<Utc>> {
    record.logical_timestamp()
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{VersionToken, ZoneId};
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    fn annotations() -> ConflictResolver {
        ConflictResolver::new(ResolverConfig::new().with_history_preserving(
            "Annotation",
            ConflictCopyRule::new("content").with_identity_field("annotationId"),
        ))
    }

    fn pair(
        record_type: &str,
        server_ts: Option<DateTime<Utc>>,
        client_ts: Option<DateTime<Utc>>,
    ) -> (Record, Record) {
        let id = RecordId::new(ZoneId::new("notes"), "r1");
        let mut server = Record::new(record_type, id.clone())
            .with_version_token(VersionToken::new("server-token"))
            .with_field("content", "server text")
            .with_field("annotationId", "r1");
        let mut client = Record::new(record_type, id)
            .with_version_token(VersionToken::new("client-token"))
            .with_field("content", "client text")
            .with_field("annotationId", "r1");
        if let Some(ts) = server_ts {
            server.set_field(fields::MODIFIED_AT, ts);
        }
        if let Some(ts) = client_ts {
            client.set_field(fields::MODIFIED_AT, ts);
        }
        (server, client)
    }

    #[test]
    fn newer_client_wins() {
        let (server, client) = pair("Document", Some(at(10, 0)), Some(at(10, 5)));
        let plan = ConflictResolver::default()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();

        assert_eq!(plan.winner, Winner::Client);
        assert_eq!(plan.resolved_record.text_field("content"), Some("client text"));
        assert_eq!(
            plan.resolved_record.version_token(),
            Some(&VersionToken::new("server-token"))
        );
        assert_eq!(plan.loser_fate, LoserFate::Discarded);
        assert!(plan.extra_records.is_empty());
        assert!(plan.description.contains("client"));
        assert!(plan.description.contains("2024-03-01T10:05:00Z"));
    }

    #[test]
    fn newer_server_wins() {
        let (server, client) = pair("Document", Some(at(10, 0)), Some(at(9, 59)));
        let plan = ConflictResolver::default()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();

        assert_eq!(plan.winner, Winner::Server);
        assert_eq!(plan.resolved_record.text_field("content"), Some("server text"));
        assert!(plan.description.contains("discarded"));
    }

    #[test]
    fn ties_keep_server() {
        let (server, client) = pair("Document", Some(at(10, 0)), Some(at(10, 0)));
        let plan = ConflictResolver::default()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();
        assert_eq!(plan.winner, Winner::Server);

        let (server, client) = pair("Document", None, None);
        let plan = ConflictResolver::default()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();
        assert_eq!(plan.winner, Winner::Server);
        assert!(plan.description.contains("unknown"));
    }

    #[test]
    fn missing_server_timestamp_loses_to_client() {
        let (server, client) = pair("Document", None, Some(at(7, 0)));
        let plan = ConflictResolver::default()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();
        assert_eq!(plan.winner, Winner::Client);

        let (server, client) = pair("Document", Some(at(7, 0)), None);
        let plan = ConflictResolver::default()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();
        assert_eq!(plan.winner, Winner::Server);
    }

    #[test]
    fn server_only_fields_survive_overwrite() {
        let (mut server, client) = pair("Document", Some(at(9, 0)), Some(at(10, 0)));
        server.set_field("serverOnly", 7i64);
        let plan = ConflictResolver::default()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();

        assert_eq!(plan.resolved_record.field("serverOnly"), Some(&FieldValue::Integer(7)));
        assert_eq!(plan.resolved_record.text_field("content"), Some("client text"));
    }

    #[test]
    fn history_preserving_copy() {
        let (server, client) = pair("Annotation", Some(at(10, 1)), Some(at(10, 5)));
        let plan = annotations()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();

        assert_eq!(plan.winner, Winner::Client);
        assert_eq!(plan.extra_records.len(), 1);
        let copy = &plan.extra_records[0];
        assert_ne!(copy.id(), plan.resolved_record.id());
        assert_eq!(copy.id().zone, ZoneId::new("notes"));
        assert_eq!(copy.record_type(), "Annotation");
        assert_eq!(copy.text_field("content"), Some("server text (Conflict Copy)"));
        assert_eq!(copy.text_field("annotationId"), Some(copy.id().name.as_str()));
        assert!(copy.version_token().is_none());
        assert!(copy.modified_at().unwrap() > at(10, 5));
        assert_eq!(plan.loser_fate, LoserFate::PreservedAsCopy(copy.id().clone()));
    }

    #[test]
    fn copy_of_absent_content_is_marker_only() {
        let (server, mut client) = pair("Annotation", Some(at(10, 0)), Some(at(9, 0)));
        client.remove_field("content");
        let plan = annotations()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();

        let copy = &plan.extra_records[0];
        assert_eq!(copy.text_field("content"), Some(DEFAULT_CONFLICT_MARKER));
    }

    #[test]
    fn non_text_content_fails_copy() {
        let (server, mut client) = pair("Annotation", Some(at(10, 0)), Some(at(9, 0)));
        client.set_field("content", 42i64);
        let err = annotations()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap_err();
        assert!(matches!(err, ResolveError::RecordCopyFailed { .. }));
    }

    #[test]
    fn custom_marker() {
        let resolver = ConflictResolver::new(
            ResolverConfig::new()
                .with_marker(" [conflict]")
                .with_history_preserving("Annotation", ConflictCopyRule::new("content")),
        );
        let (server, client) = pair("Annotation", Some(at(10, 0)), Some(at(9, 0)));
        let plan = resolver
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();
        assert_eq!(
            plan.extra_records[0].text_field("content"),
            Some("client text [conflict]")
        );
    }

    #[test]
    fn malformed_signals() {
        let (server, client) = pair("Document", None, None);
        let resolver = ConflictResolver::default();

        let no_server = ConflictSignal {
            server_record: None,
            client_record: Some(client),
            ancestor_record: None,
        };
        assert_eq!(
            resolver.plan_signal(&no_server).unwrap_err(),
            ResolveError::MissingServerRecord
        );

        let no_client = ConflictSignal {
            server_record: Some(server),
            client_record: None,
            ancestor_record: None,
        };
        assert_eq!(
            resolver.plan_signal(&no_client).unwrap_err(),
            ResolveError::MissingClientRecord
        );
    }

    #[test]
    fn non_conflict_errors_are_rejected() {
        let err = StoreError::QuotaExceeded("zone full".into());
        assert_eq!(
            ConflictResolver::default().plan(&err).unwrap_err(),
            ResolveError::NotAConflict
        );
    }
}
