//! Sync command implementation.

use super::input::read_records;
use reconcile_engine::{
    BatchResult, ChannelNotifier, EngineConfig, MemoryStore, ResolutionNotice, SyncOrchestrator,
};
use reconcile_protocol::{ConflictResolver, Record, ResolverConfig};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Outcome of a sync run, as printed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Records stored, in save order.
    pub saved: Vec<Record>,
    /// Records that failed.
    pub failed: Vec<FailureReport>,
    /// Number of records whose conflicts were resolved.
    pub conflicts_resolved: usize,
    /// Types of the resolved records.
    pub conflict_types: Vec<String>,
    /// Resolution notices posted during the run.
    pub notices: Vec<NoticeReport>,
}

/// A failed record.
#[derive(Debug, Serialize)]
pub struct FailureReport {
    /// Record id.
    pub id: String,
    /// Error message.
    pub error: String,
}

/// A resolution notice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeReport {
    /// Number of resolved records.
    pub count: usize,
    /// Affected record types.
    pub record_types: Vec<String>,
    /// Affected record ids.
    pub record_ids: Vec<String>,
}

impl From<ResolutionNotice> for NoticeReport {
    fn from(notice: ResolutionNotice) -> Self {
        Self {
            count: notice.count,
            record_types: notice.record_types.into_iter().collect(),
            record_ids: notice.record_ids.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SyncReport {
    fn new(result: BatchResult, notices: Vec<ResolutionNotice>) -> Self {
        Self {
            saved: result.saved,
            failed: result
                .failed
                .into_iter()
                .map(|(id, error)| FailureReport {
                    id: id.to_string(),
                    error: error.to_string(),
                })
                .collect(),
            conflicts_resolved: result.conflicts_resolved,
            conflict_types: result.conflict_types.into_iter().collect(),
            notices: notices.into_iter().map(NoticeReport::from).collect(),
        }
    }
}

/// Runs the sync command.
pub async fn run(
    remote: &Path,
    local: &Path,
    resolver_config: ResolverConfig,
    engine_config: EngineConfig,
    notify: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = sync(remote, local, resolver_config, engine_config, notify).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} record(s) failed to save", report.failed.len()).into())
    }
}

/// Saves the local records against a store seeded with the remote ones.
async fn sync(
    remote: &Path,
    local: &Path,
    resolver_config: ResolverConfig,
    engine_config: EngineConfig,
    notify: bool,
) -> Result<SyncReport, Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    for record in read_records(remote)? {
        store.seed(record);
    }
    let local = read_records(local)?;
    info!(remote = store.len(), local = local.len(), "starting sync");

    let (notifier, mut receiver) = ChannelNotifier::new();
    let orchestrator = SyncOrchestrator::new(
        store,
        ConflictResolver::new(resolver_config),
        Arc::new(notifier),
        engine_config,
    );

    let result = orchestrator.save_all_resolving_conflicts(local, notify).await;

    let mut notices = Vec::new();
    while let Ok(notice) = receiver.try_recv() {
        notices.push(notice);
    }

    Ok(SyncReport::new(result, notices))
}

fn print_report(report: &SyncReport) {
    println!("Saved {} record(s):", report.saved.len());
    for record in &report.saved {
        println!(
            "  {} ({}) token={}",
            record.id(),
            record.record_type(),
            record
                .version_token()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        );
    }

    if !report.failed.is_empty() {
        println!();
        println!("Failed {} record(s):", report.failed.len());
        for failure in &report.failed {
            println!("  {}: {}", failure.id, failure.error);
        }
    }

    println!();
    println!(
        "Conflicts resolved: {} ({})",
        report.conflicts_resolved,
        report.conflict_types.join(", ")
    );

    for notice in &report.notices {
        println!(
            "Notice: {} conflict(s) in {} [{}]",
            notice.count,
            notice.record_types.join(", "),
            notice.record_ids.join(", ")
        );
    }
}
