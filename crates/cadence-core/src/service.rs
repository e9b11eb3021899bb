//! Orchestration layer: keeps the occurrence cache consistent with its date
//! records and answers temporal queries from the cache alone.
//!
//! Expansion happens at write time; the read path never touches the
//! expander. All collaborators are passed in at construction — there is no
//! ambient registry to fetch services from.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::expander::{self, OccurrenceSpan};
use crate::models::{
    DateRecord, NewDateData, Occurrence, ReconcileStats, RefreshSummary, TargetOccurrence,
    UpdateDateData,
};
use crate::repository::{DateRepository, OccurrenceRepository, SqliteRepository};
use crate::rrule::RecurrenceRule;

/// Collaborator boundary to the content-record system: the engine only ever
/// asks whether a resolved owner element or field still exists.
#[async_trait]
pub trait ElementLookup: Send + Sync {
    async fn element_exists(&self, element_id: Uuid, site_id: Uuid) -> bool;
    async fn field_exists(&self, field_id: Uuid) -> bool;
}

/// Lookup that trusts every reference. The default when the engine runs
/// standalone and owns its own referential integrity.
pub struct AllowAll;

#[async_trait]
impl ElementLookup for AllowAll {
    async fn element_exists(&self, _element_id: Uuid, _site_id: Uuid) -> bool {
        true
    }

    async fn field_exists(&self, _field_id: Uuid) -> bool {
        true
    }
}

/// Set-backed lookup for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct StaticLookup {
    elements: HashSet<(Uuid, Uuid)>,
    fields: HashSet<Uuid>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, element_id: Uuid, site_id: Uuid) -> Self {
        self.elements.insert((element_id, site_id));
        self
    }

    pub fn with_field(mut self, field_id: Uuid) -> Self {
        self.fields.insert(field_id);
        self
    }
}

#[async_trait]
impl ElementLookup for StaticLookup {
    async fn element_exists(&self, element_id: Uuid, site_id: Uuid) -> bool {
        self.elements.contains(&(element_id, site_id))
    }

    async fn field_exists(&self, field_id: Uuid) -> bool {
        self.fields.contains(&field_id)
    }
}

/// Tuning for reconciliation behavior.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Ceiling on generated rows per record for rules without their own
    /// termination; hitting it logs a warning rather than filling the
    /// table forever.
    pub max_generated_occurrences: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_generated_occurrences: 10_000,
        }
    }
}

/// The occurrence engine's service facade.
pub struct OccurrenceService {
    repo: SqliteRepository,
    lookup: Arc<dyn ElementLookup>,
    config: ReconcileConfig,
    // at most one in-flight reconciliation per date record
    locks: StdMutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl OccurrenceService {
    pub fn new(
        repo: SqliteRepository,
        lookup: Arc<dyn ElementLookup>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            repo,
            lookup,
            config,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Service over a trusting lookup and default tuning.
    pub fn with_defaults(repo: SqliteRepository) -> Self {
        Self::new(repo, Arc::new(AllowAll), ReconcileConfig::default())
    }

    /// Read access for hosts that render date records directly.
    pub fn repository(&self) -> &SqliteRepository {
        &self.repo
    }

    // ------------------------------------------------------------------
    // Write path: every mutation ends in a reconcile
    // ------------------------------------------------------------------

    pub async fn save_date(&self, data: NewDateData) -> Result<DateRecord, CoreError> {
        let record = self.repo.add_date(data).await?;
        self.reconcile(&record, false).await?;
        Ok(record)
    }

    pub async fn update_date(
        &self,
        id: Uuid,
        data: UpdateDateData,
    ) -> Result<DateRecord, CoreError> {
        let record = self.repo.update_date(id, data).await?;
        self.reconcile(&record, false).await?;
        Ok(record)
    }

    /// Soft-deletes a record alongside its owner; cache rows flip their
    /// mirror flag and survive for a later restore.
    pub async fn delete_date(&self, id: Uuid) -> Result<(), CoreError> {
        self.repo.set_date_deleted(id, true).await?;
        self.repo.set_entries_deleted(id, true).await
    }

    /// Restores a soft-deleted record. No re-expansion happens: the cache
    /// rows come back exactly as they were.
    pub async fn restore_date(&self, id: Uuid) -> Result<(), CoreError> {
        self.repo.set_date_deleted(id, false).await?;
        self.repo.set_entries_deleted(id, false).await
    }

    pub async fn hard_delete_date(&self, id: Uuid) -> Result<(), CoreError> {
        self.repo.delete_date_rows(id).await
    }

    /// Copies a record to another owner element/site (element duplication
    /// and site propagation both land here) and expands the copy.
    pub async fn duplicate_date(
        &self,
        id: Uuid,
        new_element_id: Uuid,
        new_site_id: Uuid,
    ) -> Result<DateRecord, CoreError> {
        let copy = self.repo.duplicate_date(id, new_element_id, new_site_id).await?;
        self.reconcile(&copy, false).await?;
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Resynchronizes the occurrence cache of one date record with its
    /// current rule and anchor. With `only_future` the diff is scoped to
    /// occurrences ending at or after now, leaving history untouched.
    pub async fn reconcile(
        &self,
        date: &DateRecord,
        only_future: bool,
    ) -> Result<ReconcileStats, CoreError> {
        if date.deleted_with_owner {
            debug!(date_id = %date.id, "skipping reconcile of soft-deleted record");
            return Ok(ReconcileStats::default());
        }
        if !self.lookup.element_exists(date.element_id, date.site_id).await {
            return Err(CoreError::InvalidOwner {
                element_id: date.element_id,
                site_id: date.site_id,
            });
        }
        if !self.lookup.field_exists(date.field_id).await {
            return Err(CoreError::InvalidField(date.field_id));
        }

        let lock = self.date_lock(date.id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let target = self.target_occurrences(date, only_future, now);

        let horizon = if only_future { Some(now) } else { None };
        let existing = self.repo.entries_for_date(date.id, horizon).await?;

        type Key = (DateTime<Utc>, DateTime<Utc>, bool, bool);
        let target_keys: HashSet<Key> = target
            .iter()
            .map(|t| (t.start_at, t.end_at, t.all_day, t.first))
            .collect();
        let existing_keys: HashSet<Key> = existing
            .iter()
            .map(|e| (e.start_at, e.end_at, e.all_day, e.first))
            .collect();

        let inserts: Vec<TargetOccurrence> = target
            .iter()
            .filter(|t| !existing_keys.contains(&(t.start_at, t.end_at, t.all_day, t.first)))
            .copied()
            .collect();
        let delete_ids: Vec<Uuid> = existing
            .iter()
            .filter(|e| !target_keys.contains(&(e.start_at, e.end_at, e.all_day, e.first)))
            .map(|e| e.id)
            .collect();

        let stats = ReconcileStats {
            inserted: inserts.len(),
            deleted: delete_ids.len(),
            retained: existing.len() - delete_ids.len(),
        };

        if !stats.is_noop() {
            self.repo
                .apply_diff(date, &delete_ids, &inserts)
                .await
                .map_err(|source| CoreError::Reconciliation {
                    date_id: date.id,
                    source: Box::new(source),
                })?;
        }

        debug!(
            date_id = %date.id,
            inserted = stats.inserted,
            deleted = stats.deleted,
            retained = stats.retained,
            "reconciled occurrence cache"
        );
        Ok(stats)
    }

    /// Reconciles every date record of one owner+field, the unit the host's
    /// save hooks operate on. Errors propagate (interactive path).
    pub async fn reconcile_field(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        only_future: bool,
    ) -> Result<ReconcileStats, CoreError> {
        let mut total = ReconcileStats::default();
        for date in self
            .repo
            .find_dates_for_field(element_id, site_id, field_id)
            .await?
        {
            let stats = self.reconcile(&date, only_future).await?;
            total.inserted += stats.inserted;
            total.deleted += stats.deleted;
            total.retained += stats.retained;
        }
        Ok(total)
    }

    /// Bulk refresh across all live records. Each record is an isolated
    /// unit of work: failures are logged and skipped, never fatal to the
    /// batch. `progress` receives (done, total) after each record, so a
    /// driver can render fractional progress and interrupt between records.
    pub async fn refresh_all<F>(
        &self,
        only_future: bool,
        mut progress: F,
    ) -> Result<RefreshSummary, CoreError>
    where
        F: FnMut(usize, usize) + Send,
    {
        let started = Instant::now();
        let dates = self.repo.find_live_dates().await?;
        let total = dates.len();
        let mut summary = RefreshSummary::default();

        for (done, date) in dates.iter().enumerate() {
            match self.reconcile(date, only_future).await {
                Ok(stats) => {
                    summary.records_processed += 1;
                    summary.rows_inserted += stats.inserted;
                    summary.rows_deleted += stats.deleted;
                }
                Err(err) => {
                    warn!(date_id = %date.id, error = %err, "skipping date record during refresh");
                    summary.records_skipped += 1;
                    summary.errors.push(format!("{}: {}", date.id, err));
                }
            }
            progress(done + 1, total);
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// The target cache state of one record: its own anchor as the `first`
    /// entry, plus every instant the rule generates past the anchor.
    fn target_occurrences(
        &self,
        date: &DateRecord,
        only_future: bool,
        now: DateTime<Utc>,
    ) -> Vec<TargetOccurrence> {
        let mut target = Vec::new();
        let mut seen: HashSet<(DateTime<Utc>, DateTime<Utc>)> = HashSet::new();

        if !only_future || date.end_at >= now {
            target.push(TargetOccurrence {
                start_at: date.start_at,
                end_at: date.end_at,
                all_day: date.all_day,
                first: true,
            });
            seen.insert((date.start_at, date.end_at));
        }

        if let Some(rule) = &date.rrule {
            let lower_bound = if only_future && date.end_at < now {
                now
            } else {
                date.end_at + Duration::seconds(1)
            };
            for span in expander::expand(rule, date.start_at, date.end_at, lower_bound, None) {
                if target.len() >= self.config.max_generated_occurrences {
                    warn!(
                        date_id = %date.id,
                        cap = self.config.max_generated_occurrences,
                        "expansion cap reached; cache is truncated"
                    );
                    break;
                }
                if !seen.insert((span.start, span.end)) {
                    continue;
                }
                target.push(TargetOccurrence {
                    start_at: span.start,
                    end_at: span.end,
                    all_day: date.all_day,
                    first: false,
                });
            }
        }

        target
    }

    fn date_lock(&self, id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(id).or_default().clone()
    }

    // ------------------------------------------------------------------
    // Query layer: cache reads only, the expander is never consulted
    // ------------------------------------------------------------------

    /// First occurrence starting at or after now; `None` when the record
    /// has no future occurrences.
    pub async fn next_occurrence(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
    ) -> Result<Option<Occurrence>, CoreError> {
        self.repo
            .next_occurrence(element_id, site_id, field_id, Utc::now())
            .await
    }

    /// Like [`Self::next_occurrence`], falling back to the chronologically
    /// last occurrence (past included) when nothing lies ahead.
    pub async fn next_or_last_occurrence(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
    ) -> Result<Option<Occurrence>, CoreError> {
        if let Some(next) = self
            .repo
            .next_occurrence(element_id, site_id, field_id, Utc::now())
            .await?
        {
            return Ok(Some(next));
        }
        self.repo.last_occurrence(element_id, site_id, field_id).await
    }

    /// Occurrences overlapping [from, to], ascending by start.
    pub async fn occurrences_in_range(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        include_first: bool,
    ) -> Result<Vec<Occurrence>, CoreError> {
        self.repo
            .occurrences_in_range(element_id, site_id, field_id, from, to, include_first)
            .await
    }

    /// Every cached occurrence of an owner+field, ascending by start.
    pub async fn all_occurrences(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        only_future: bool,
        include_first: bool,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let future_from = only_future.then(Utc::now);
        self.repo
            .all_occurrences(element_id, site_id, field_id, future_from, include_first)
            .await
    }

    /// Bounded expansion of a raw rule text for UI previews; nothing is
    /// persisted.
    pub fn preview(
        &self,
        rule_text: &str,
        anchor_start: DateTime<Utc>,
        anchor_end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OccurrenceSpan>, CoreError> {
        let rule = RecurrenceRule::parse(rule_text)?;
        Ok(expander::preview(&rule, anchor_start, anchor_end, limit))
    }
}
