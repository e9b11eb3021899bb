use crate::error::CoreError;
use crate::models::{DateRecord, NewDateData, UpdateDateData};
use crate::rrule::RecurrenceRule;
use crate::timezone::{normalize_all_day, validate_timezone};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::SqliteRepository;

/// Storage shape of a date record: the rule travels as text plus the
/// denormalized COUNT/UNTIL columns extracted from it on every save.
#[derive(Debug, Clone, FromRow)]
struct DateRow {
    id: Uuid,
    element_id: Uuid,
    site_id: Uuid,
    field_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    all_day: bool,
    timezone: String,
    rrule: Option<String>,
    #[allow(dead_code)]
    occurrence_count: Option<i64>,
    #[allow(dead_code)]
    until_at: Option<DateTime<Utc>>,
    sort_order: i64,
    deleted_with_owner: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DateRow> for DateRecord {
    type Error = CoreError;

    fn try_from(row: DateRow) -> Result<Self, Self::Error> {
        let rrule = match row.rrule.as_deref() {
            Some(text) => Some(RecurrenceRule::parse(text)?),
            None => None,
        };
        Ok(DateRecord {
            id: row.id,
            element_id: row.element_id,
            site_id: row.site_id,
            field_id: row.field_id,
            start_at: row.start_at,
            end_at: row.end_at,
            all_day: row.all_day,
            timezone: row.timezone,
            rrule,
            sort_order: row.sort_order,
            deleted_with_owner: row.deleted_with_owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn denormalized_termination(
    rule: Option<&RecurrenceRule>,
) -> (Option<i64>, Option<DateTime<Utc>>) {
    match rule {
        Some(rule) => (rule.count().map(i64::from), rule.until()),
        None => (None, None),
    }
}

#[async_trait]
impl super::DateRepository for SqliteRepository {
    async fn add_date(&self, data: NewDateData) -> Result<DateRecord, CoreError> {
        let timezone = data.timezone.unwrap_or_else(|| "UTC".to_string());
        validate_timezone(&timezone)?;

        let rrule = match data.rrule.as_deref() {
            Some(text) => Some(RecurrenceRule::parse(text)?),
            None => None,
        };

        let (mut start_at, mut end_at) = (data.start_at, data.end_at);
        if data.all_day {
            (start_at, end_at) = normalize_all_day(start_at, end_at, &timezone)?;
        }

        let mut tx = self.pool().begin().await?;

        let sort_order = match data.sort_order {
            Some(order) => order,
            None => {
                let (next,): (i64,) = sqlx::query_as(
                    r#"SELECT COALESCE(MAX(sort_order) + 1, 0) FROM dates
                    WHERE element_id = $1 AND site_id = $2 AND field_id = $3"#,
                )
                .bind(data.element_id)
                .bind(data.site_id)
                .bind(data.field_id)
                .fetch_one(&mut *tx)
                .await?;
                next
            }
        };

        let now = Utc::now();
        let record = DateRecord {
            id: Uuid::now_v7(),
            element_id: data.element_id,
            site_id: data.site_id,
            field_id: data.field_id,
            start_at,
            end_at,
            all_day: data.all_day,
            timezone,
            rrule,
            sort_order,
            deleted_with_owner: false,
            created_at: now,
            updated_at: now,
        };

        insert_record(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn find_date_by_id(&self, id: Uuid) -> Result<Option<DateRecord>, CoreError> {
        let row: Option<DateRow> = sqlx::query_as("SELECT * FROM dates WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(DateRecord::try_from).transpose()
    }

    async fn find_dates_for_field(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
    ) -> Result<Vec<DateRecord>, CoreError> {
        let rows: Vec<DateRow> = sqlx::query_as(
            r#"SELECT * FROM dates
            WHERE element_id = $1 AND site_id = $2 AND field_id = $3 AND deleted_with_owner = 0
            ORDER BY sort_order, start_at"#,
        )
        .bind(element_id)
        .bind(site_id)
        .bind(field_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(DateRecord::try_from).collect()
    }

    async fn find_live_dates(&self) -> Result<Vec<DateRecord>, CoreError> {
        let rows: Vec<DateRow> = sqlx::query_as(
            r#"SELECT * FROM dates WHERE deleted_with_owner = 0
            ORDER BY element_id, field_id, sort_order"#,
        )
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(DateRecord::try_from).collect()
    }

    async fn update_date(&self, id: Uuid, data: UpdateDateData) -> Result<DateRecord, CoreError> {
        let mut tx = self.pool().begin().await?;

        let row: DateRow = sqlx::query_as("SELECT * FROM dates WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let mut record = DateRecord::try_from(row)?;

        if let Some(timezone) = data.timezone {
            validate_timezone(&timezone)?;
            record.timezone = timezone;
        }
        if let Some(start_at) = data.start_at {
            record.start_at = start_at;
        }
        if let Some(end_at) = data.end_at {
            record.end_at = end_at;
        }
        if let Some(all_day) = data.all_day {
            record.all_day = all_day;
        }
        if let Some(rrule) = data.rrule {
            record.rrule = match rrule.as_deref() {
                Some(text) => Some(RecurrenceRule::parse(text)?),
                None => None,
            };
        }
        if let Some(sort_order) = data.sort_order {
            record.sort_order = sort_order;
        }

        // every mutation re-normalizes an all-day pair
        if record.all_day {
            (record.start_at, record.end_at) =
                normalize_all_day(record.start_at, record.end_at, &record.timezone)?;
        }
        record.updated_at = Utc::now();

        let (count, until) = denormalized_termination(record.rrule.as_ref());
        sqlx::query(
            r#"UPDATE dates SET
                start_at = $1, end_at = $2, all_day = $3, timezone = $4,
                rrule = $5, occurrence_count = $6, until_at = $7,
                sort_order = $8, updated_at = $9
            WHERE id = $10"#,
        )
        .bind(record.start_at)
        .bind(record.end_at)
        .bind(record.all_day)
        .bind(&record.timezone)
        .bind(record.rrule.as_ref().map(|r| r.encode()))
        .bind(count)
        .bind(until)
        .bind(record.sort_order)
        .bind(record.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn set_date_deleted(&self, id: Uuid, deleted: bool) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE dates SET deleted_with_owner = $1, updated_at = $2 WHERE id = $3")
            .bind(deleted)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_date_rows(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM occurrences WHERE date_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM dates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn duplicate_date(
        &self,
        id: Uuid,
        new_element_id: Uuid,
        new_site_id: Uuid,
    ) -> Result<DateRecord, CoreError> {
        let mut tx = self.pool().begin().await?;

        let row: DateRow = sqlx::query_as("SELECT * FROM dates WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let source = DateRecord::try_from(row)?;

        let (next_order,): (i64,) = sqlx::query_as(
            r#"SELECT COALESCE(MAX(sort_order) + 1, 0) FROM dates
            WHERE element_id = $1 AND site_id = $2 AND field_id = $3"#,
        )
        .bind(new_element_id)
        .bind(new_site_id)
        .bind(source.field_id)
        .fetch_one(&mut *tx)
        .await?;

        let now = Utc::now();
        let copy = DateRecord {
            id: Uuid::now_v7(),
            element_id: new_element_id,
            site_id: new_site_id,
            deleted_with_owner: false,
            sort_order: next_order,
            created_at: now,
            updated_at: now,
            ..source
        };

        insert_record(&mut tx, &copy).await?;
        tx.commit().await?;
        Ok(copy)
    }
}

async fn insert_record(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    record: &DateRecord,
) -> Result<(), CoreError> {
    let (count, until) = denormalized_termination(record.rrule.as_ref());
    sqlx::query(
        r#"INSERT INTO dates (
            id, element_id, site_id, field_id, start_at, end_at, all_day, timezone,
            rrule, occurrence_count, until_at, sort_order, deleted_with_owner,
            created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
    )
    .bind(record.id)
    .bind(record.element_id)
    .bind(record.site_id)
    .bind(record.field_id)
    .bind(record.start_at)
    .bind(record.end_at)
    .bind(record.all_day)
    .bind(&record.timezone)
    .bind(record.rrule.as_ref().map(|r| r.encode()))
    .bind(count)
    .bind(until)
    .bind(record.sort_order)
    .bind(record.deleted_with_owner)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
