//! Conflict-resolving save orchestration.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::notify::{ConflictNotifier, ResolutionNotice};
use crate::store::RecordStore;
use reconcile_protocol::{ConflictResolver, Record, RecordId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a batch save.
///
/// `saved` and the ids in `failed` together cover every input record and
/// every conflict copy produced while resolving them, including copies of
/// records whose retried save later failed.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Stored records: clean saves and resolved winners in input order,
    /// followed by conflict copies in resolution order.
    pub saved: Vec<Record>,
    /// Records that could not be saved, in the order they failed.
    pub failed: Vec<(RecordId, EngineError)>,
    /// Number of records that went through at least one resolution round,
    /// whether or not their retried save succeeded.
    pub conflicts_resolved: usize,
    /// Types of those records.
    pub conflict_types: BTreeSet<String>,
}

impl BatchResult {
    /// Returns true if every record was saved.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the failure recorded for a record.
    pub fn failure_for(&self, id: &RecordId) -> Option<&EngineError> {
        self.failed
            .iter()
            .find(|(failed_id, _)| failed_id == id)
            .map(|(_, error)| error)
    }

    /// Returns the saved records, or the first failure.
    pub fn into_result(self) -> EngineResult<Vec<Record>> {
        match self.failed.into_iter().next() {
            Some((_, error)) => Err(error),
            None => Ok(self.saved),
        }
    }
}

/// What the resolution rounds of one record produced, kept even when the
/// record's final save fails.
#[derive(Debug, Default)]
struct Rounds {
    /// Type of the record, set once a conflict has been resolved.
    affected_type: Option<String>,
    /// Conflict copies produced by every round, in order.
    extras: Vec<Record>,
}

/// Saves records to a remote store, resolving version conflicts.
///
/// The orchestrator holds no mutable state; every call runs on the caller's
/// task and suspends only on store I/O. Two callers saving the same record
/// concurrently may each resolve the conflict and each post a notice. The
/// store's version-token check is the only guard between them.
pub struct SyncOrchestrator<S: RecordStore + ?Sized> {
    store: Arc<S>,
    resolver: ConflictResolver,
    notifier: Arc<dyn ConflictNotifier>,
    config: EngineConfig,
}

impl<S: RecordStore + ?Sized> SyncOrchestrator<S> {
    /// Creates an orchestrator.
    pub fn new(
        store: Arc<S>,
        resolver: ConflictResolver,
        notifier: Arc<dyn ConflictNotifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            notifier,
            config,
        }
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the resolver.
    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Saves a record, resolving conflicts.
    ///
    /// On conflict the resolved record is retried, up to
    /// `retry.max_attempts` resolution rounds; past that the most recent
    /// conflict is returned. Non-conflict store errors are returned at once.
    /// Conflict copies are saved after the winner; their failures are logged
    /// and do not fail the call.
    pub async fn save_resolving_conflicts(
        &self,
        record: Record,
        notify: bool,
    ) -> EngineResult<Record> {
        let mut rounds = Rounds::default();
        let saved = self.save_until_resolved(record, &mut rounds).await?;

        for extra in rounds.extras {
            let id = extra.id().clone();
            if let Err(error) = self.store.save(extra).await {
                warn!(record_id = %id, %error, "failed to save conflict copy");
            }
        }

        if let (true, Some(record_type)) = (notify, rounds.affected_type) {
            self.notifier.post(ResolutionNotice {
                count: 1,
                record_types: BTreeSet::from([record_type]),
                record_ids: vec![saved.id().clone()],
            });
        }

        Ok(saved)
    }

    /// Saves records one by one, resolving conflicts.
    ///
    /// A failed record never stops the remaining ones. Conflict copies of
    /// every resolved record are saved after all input records have been
    /// attempted, even when the record's own retried save failed, so the
    /// losing edit is never dropped. At most one aggregated notice is posted.
    pub async fn save_all_resolving_conflicts(
        &self,
        records: Vec<Record>,
        notify: bool,
    ) -> BatchResult {
        let mut result = BatchResult::default();
        let mut deferred = Vec::new();
        let mut resolved_ids = Vec::new();

        for record in records {
            let id = record.id().clone();
            let mut rounds = Rounds::default();
            let outcome = self.save_until_resolved(record, &mut rounds).await;

            if let Some(record_type) = rounds.affected_type {
                result.conflicts_resolved += 1;
                result.conflict_types.insert(record_type);
                resolved_ids.push(id.clone());
            }
            deferred.extend(rounds.extras);

            match outcome {
                Ok(saved) => result.saved.push(saved),
                Err(error) => {
                    warn!(record_id = %id, %error, "failed to save record");
                    result.failed.push((id, error));
                }
            }
        }

        for extra in deferred {
            let id = extra.id().clone();
            match self.store.save(extra).await {
                Ok(saved) => result.saved.push(saved),
                Err(error) => {
                    warn!(record_id = %id, %error, "failed to save conflict copy");
                    result.failed.push((id, error.into()));
                }
            }
        }

        if notify && result.conflicts_resolved > 0 {
            self.notifier.post(ResolutionNotice {
                count: result.conflicts_resolved,
                record_types: result.conflict_types.clone(),
                record_ids: resolved_ids,
            });
        }

        info!(
            saved = result.saved.len(),
            failed = result.failed.len(),
            conflicts_resolved = result.conflicts_resolved,
            "batch save finished"
        );

        result
    }

    /// Saves records like [`Self::save_all_resolving_conflicts`], failing
    /// with the first recorded error if any record was not saved.
    pub async fn save_all_resolving_conflicts_or_throw(
        &self,
        records: Vec<Record>,
        notify: bool,
    ) -> EngineResult<Vec<Record>> {
        self.save_all_resolving_conflicts(records, notify)
            .await
            .into_result()
    }

    /// Saves a record, resolving and retrying conflicts up to the ceiling.
    ///
    /// Conflict copies and the affected type are recorded in `rounds`
    /// as each round is planned, not saved.
    async fn save_until_resolved(
        &self,
        record: Record,
        rounds: &mut Rounds,
    ) -> EngineResult<Record> {
        let max_rounds = self.config.retry.max_attempts;
        let mut candidate = record;
        let mut round = 0u32;

        loop {
            debug!(record_id = %candidate.id(), round, "saving record");

            let error = match self.store.save(candidate).await {
                Ok(saved) => return Ok(saved),
                Err(error) if error.is_conflict() => error,
                Err(error) => return Err(error.into()),
            };

            if round >= max_rounds {
                warn!(rounds = round, %error, "conflict retries exhausted");
                return Err(error.into());
            }

            let plan = self.resolver.plan(&error)?;
            round += 1;
            debug!(round, description = %plan.description, "retrying resolved record");

            rounds.affected_type = Some(plan.affected_type);
            rounds.extras.extend(plan.extra_records);
            candidate = plan.resolved_record;

            let delay = self.config.retry.delay_before_round(round);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
