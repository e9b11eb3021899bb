use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::rrule::RecurrenceRule;

/// Durable definition of one authored date: the anchor start/end pair, the
/// all-day flag, an optional recurrence rule and the owning element/field
/// references. The rule is parsed once on load and held as an immutable
/// value; the raw text only exists at the storage boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRecord {
    pub id: Uuid,
    /// Owning content element (weak reference, resolved externally).
    pub element_id: Uuid,
    pub site_id: Uuid,
    /// Field configuration that owns this record's semantics.
    pub field_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    /// IANA timezone used for all-day normalization.
    pub timezone: String,
    pub rrule: Option<RecurrenceRule>,
    /// Display/iteration order among sibling dates of the same owner+field.
    pub sort_order: i64,
    /// Mirrors the owner's soft-deletion state.
    pub deleted_with_owner: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new date record.
#[derive(Debug, Clone)]
pub struct NewDateData {
    pub element_id: Uuid,
    pub site_id: Uuid,
    pub field_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    /// IANA timezone name; defaults to UTC when absent.
    pub timezone: Option<String>,
    /// Raw rule text in the grammar of [`crate::rrule`].
    pub rrule: Option<String>,
    /// Explicit position among siblings; appended at the end when absent.
    pub sort_order: Option<i64>,
}

/// Data for modifying an existing date record. `Option<Option<_>>` fields
/// distinguish "leave unchanged" from "clear".
#[derive(Debug, Clone, Default)]
pub struct UpdateDateData {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub timezone: Option<String>,
    pub rrule: Option<Option<String>>,
    pub sort_order: Option<i64>,
}

/// One persisted occurrence cache row.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct OccurrenceEntry {
    pub id: Uuid,
    pub date_id: Uuid,
    pub element_id: Uuid,
    pub site_id: Uuid,
    pub field_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    /// True for exactly one row per date record: the record's own anchor.
    pub first: bool,
    /// Soft-delete flag mirroring the owning record, so rows survive a
    /// delete/restore cycle without re-expansion.
    pub deleted: bool,
}

/// Ephemeral query-result value backed by a cache row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    pub date_id: Uuid,
    pub element_id: Uuid,
    pub site_id: Uuid,
    pub field_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    /// Marks the occurrence equal to the record's own anchor pair.
    pub is_first: bool,
}

impl From<OccurrenceEntry> for Occurrence {
    fn from(entry: OccurrenceEntry) -> Self {
        Occurrence {
            date_id: entry.date_id,
            element_id: entry.element_id,
            site_id: entry.site_id,
            field_id: entry.field_id,
            start_at: entry.start_at,
            end_at: entry.end_at,
            all_day: entry.all_day,
            is_first: entry.first,
        }
    }
}

/// One occurrence the reconciliation wants persisted; the diff against the
/// existing rows decides whether it becomes an insert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetOccurrence {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub first: bool,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub inserted: usize,
    pub deleted: usize,
    pub retained: usize,
}

impl ReconcileStats {
    /// True when the run performed no writes.
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.deleted == 0
    }
}

/// Summary of a bulk refresh job across all live date records.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSummary {
    pub records_processed: usize,
    pub records_skipped: usize,
    pub rows_inserted: usize,
    pub rows_deleted: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}
