use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    DateRecord, NewDateData, Occurrence, OccurrenceEntry, TargetOccurrence, UpdateDateData,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// Re-export domain modules
pub mod dates;
pub mod occurrences;

// Traits are defined in this module and implemented in respective domain modules

/// Domain-specific trait for date record operations
#[async_trait]
pub trait DateRepository {
    async fn add_date(&self, data: NewDateData) -> Result<DateRecord, CoreError>;
    async fn find_date_by_id(&self, id: Uuid) -> Result<Option<DateRecord>, CoreError>;
    async fn find_dates_for_field(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
    ) -> Result<Vec<DateRecord>, CoreError>;
    async fn find_live_dates(&self) -> Result<Vec<DateRecord>, CoreError>;
    async fn update_date(&self, id: Uuid, data: UpdateDateData) -> Result<DateRecord, CoreError>;
    async fn set_date_deleted(&self, id: Uuid, deleted: bool) -> Result<(), CoreError>;
    async fn delete_date_rows(&self, id: Uuid) -> Result<(), CoreError>;
    async fn duplicate_date(
        &self,
        id: Uuid,
        new_element_id: Uuid,
        new_site_id: Uuid,
    ) -> Result<DateRecord, CoreError>;
}

/// Domain-specific trait for occurrence cache operations. Cache rows are
/// derived state: only the reconciliation algorithm writes them.
#[async_trait]
pub trait OccurrenceRepository {
    /// Non-deleted cache rows for one date record, ordered by start. A
    /// `horizon` scopes the load to rows ending at or after it, matching
    /// the window an only-future reconciliation targets.
    async fn entries_for_date(
        &self,
        date_id: Uuid,
        horizon: Option<DateTime<Utc>>,
    ) -> Result<Vec<OccurrenceEntry>, CoreError>;

    /// Applies one reconciliation diff atomically: all row deletes and
    /// batch inserts commit together or not at all.
    async fn apply_diff(
        &self,
        date: &DateRecord,
        delete_ids: &[Uuid],
        inserts: &[TargetOccurrence],
    ) -> Result<(), CoreError>;

    /// Flips the soft-delete mirror on every cache row of a date record.
    async fn set_entries_deleted(&self, date_id: Uuid, deleted: bool) -> Result<(), CoreError>;

    async fn next_occurrence(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Option<Occurrence>, CoreError>;

    /// Chronologically last occurrence, past ones included.
    async fn last_occurrence(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
    ) -> Result<Option<Occurrence>, CoreError>;

    async fn occurrences_in_range(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        include_first: bool,
    ) -> Result<Vec<Occurrence>, CoreError>;

    async fn all_occurrences(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        future_from: Option<DateTime<Utc>>,
        include_first: bool,
    ) -> Result<Vec<Occurrence>, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository: DateRepository + OccurrenceRepository {
    // Individual domain operations are defined in their respective traits
}

/// SQLite implementation of the repository pattern
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}
