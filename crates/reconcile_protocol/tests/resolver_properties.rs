//! Property-based tests for the conflict resolver.
//!
//! - Determinism: the same signal always yields the same winner, fate and
//!   copies, up to the copy's generated id and creation time
//! - Token preservation: the resolved record carries the server token
//! - Tie-break: equal or missing timestamps keep the server version
//! - Conflict copies: exactly one per history-preserving conflict

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use proptest::prelude::*;
use reconcile_protocol::{
    fields, ConflictCopyRule, ConflictResolver, ConflictSignal, LoserFate, Record, RecordId,
    FieldValue, ResolverConfig, VersionToken, Winner, ZoneId, DEFAULT_CONFLICT_MARKER,
};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn timestamp_strategy() -> impl Strategy<Value = Option<DateTime<Utc>>> {
    prop::option::of((0i64..1_000_000).prop_map(|secs| {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }))
}

fn content_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::string::string_regex("[a-zA-Z0-9 ]{0,40}").unwrap())
}

fn type_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("Document"), Just("Annotation")]
}

fn make_record(
    record_type: &str,
    token: &str,
    ts: Option<DateTime<Utc>>,
    content: Option<String>,
) -> Record {
    let mut record = Record::new(record_type, RecordId::new(ZoneId::new("zone"), "shared"))
        .with_version_token(VersionToken::new(token));
    if let Some(ts) = ts {
        record.set_field(fields::MODIFIED_AT, ts);
    }
    if let Some(content) = content {
        record.set_field("content", content);
    }
    record
}

fn resolver() -> ConflictResolver {
    ConflictResolver::new(ResolverConfig::new().with_history_preserving(
        "Annotation",
        ConflictCopyRule::new("content").with_identity_field("annotationId"),
    ))
}

/// Copy fields that do not depend on the generated id or the clock.
fn stable_fields(copy: &Record) -> BTreeMap<String, FieldValue> {
    copy.fields()
        .iter()
        .filter(|(name, _)| *name != "annotationId" && *name != fields::MODIFIED_AT)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

proptest! {
    #[test]
    fn plans_are_deterministic(
        record_type in type_strategy(),
        server_ts in timestamp_strategy(),
        client_ts in timestamp_strategy(),
        server_content in content_strategy(),
        client_content in content_strategy(),
    ) {
        let signal = ConflictSignal::new(
            make_record(record_type, "s", server_ts, server_content),
            make_record(record_type, "c", client_ts, client_content),
            None,
        );
        let resolver = resolver();
        let first = resolver.plan_signal(&signal).unwrap();
        let second = resolver.plan_signal(&signal).unwrap();

        prop_assert_eq!(first.winner, second.winner);
        prop_assert_eq!(&first.resolved_record, &second.resolved_record);
        prop_assert_eq!(&first.affected_type, &second.affected_type);
        prop_assert_eq!(
            matches!(first.loser_fate, LoserFate::Discarded),
            matches!(second.loser_fate, LoserFate::Discarded)
        );

        prop_assert_eq!(first.extra_records.len(), second.extra_records.len());
        for (a, b) in first.extra_records.iter().zip(&second.extra_records) {
            prop_assert_eq!(a.record_type(), b.record_type());
            prop_assert_eq!(&a.id().zone, &b.id().zone);
            prop_assert_eq!(a.version_token(), b.version_token());
            prop_assert_eq!(stable_fields(a), stable_fields(b));
            prop_assert_eq!(a.text_field("annotationId"), Some(a.id().name.as_str()));
            prop_assert!(a.timestamp_field(fields::MODIFIED_AT).is_some());
        }
    }

    #[test]
    fn server_token_is_always_kept(
        record_type in type_strategy(),
        server_ts in timestamp_strategy(),
        client_ts in timestamp_strategy(),
    ) {
        let server = make_record(record_type, "server-token", server_ts, None);
        let client = make_record(record_type, "client-token", client_ts, None);
        let plan = resolver()
            .plan_signal(&ConflictSignal::new(server.clone(), client, None))
            .unwrap();

        prop_assert_eq!(plan.resolved_record.id(), server.id());
        prop_assert_eq!(plan.resolved_record.version_token(), server.version_token());
    }

    #[test]
    fn later_timestamp_wins_and_ties_keep_server(
        server_ts in timestamp_strategy(),
        client_ts in timestamp_strategy(),
    ) {
        let signal = ConflictSignal::new(
            make_record("Document", "s", server_ts, None),
            make_record("Document", "c", client_ts, None),
            None,
        );
        let plan = resolver().plan_signal(&signal).unwrap();

        let expected = match (server_ts, client_ts) {
            (_, None) => Winner::Server,
            (None, Some(_)) => Winner::Client,
            (Some(s), Some(c)) if c > s => Winner::Client,
            _ => Winner::Server,
        };
        prop_assert_eq!(plan.winner, expected);
    }

    #[test]
    fn equal_timestamps_keep_server(ts in timestamp_strategy()) {
        let signal = ConflictSignal::new(
            make_record("Document", "s", ts, Some("server".into())),
            make_record("Document", "c", ts, Some("client".into())),
            None,
        );
        let plan = resolver().plan_signal(&signal).unwrap();
        prop_assert_eq!(plan.winner, Winner::Server);
        prop_assert_eq!(plan.resolved_record.text_field("content"), Some("server"));
    }

    #[test]
    fn history_preserving_types_get_one_copy(
        server_ts in timestamp_strategy(),
        client_ts in timestamp_strategy(),
        client_content in content_strategy(),
    ) {
        let server = make_record("Annotation", "s", server_ts, Some("server".into()));
        let client = make_record("Annotation", "c", client_ts, client_content);
        let plan = resolver()
            .plan_signal(&ConflictSignal::new(server, client, None))
            .unwrap();

        prop_assert_eq!(plan.extra_records.len(), 1);
        let copy = &plan.extra_records[0];
        prop_assert_ne!(copy.id(), plan.resolved_record.id());
        let content = copy.text_field("content").unwrap();
        prop_assert!(content.ends_with(DEFAULT_CONFLICT_MARKER));
    }

    #[test]
    fn other_types_discard_the_loser(
        server_ts in timestamp_strategy(),
        client_ts in timestamp_strategy(),
    ) {
        let signal = ConflictSignal::new(
            make_record("Document", "s", server_ts, Some("server".into())),
            make_record("Document", "c", client_ts, Some("client".into())),
            None,
        );
        let plan = resolver().plan_signal(&signal).unwrap();
        prop_assert!(plan.extra_records.is_empty());
        prop_assert_eq!(plan.loser_fate, LoserFate::Discarded);
    }
}
