use crate::error::CoreError;
use crate::models::{DateRecord, Occurrence, OccurrenceEntry, TargetOccurrence};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use super::SqliteRepository;

// SQLite's default bind limit is 999; chunk sizes keep each statement well
// under it (10 columns per inserted row).
const INSERT_CHUNK: usize = 50;
const DELETE_CHUNK: usize = 100;

#[async_trait]
impl super::OccurrenceRepository for SqliteRepository {
    async fn entries_for_date(
        &self,
        date_id: Uuid,
        horizon: Option<DateTime<Utc>>,
    ) -> Result<Vec<OccurrenceEntry>, CoreError> {
        let entries = match horizon {
            Some(horizon) => {
                sqlx::query_as(
                    r#"SELECT * FROM occurrences
                    WHERE date_id = $1 AND deleted = 0 AND end_at >= $2
                    ORDER BY start_at"#,
                )
                .bind(date_id)
                .bind(horizon)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT * FROM occurrences WHERE date_id = $1 AND deleted = 0 ORDER BY start_at",
                )
                .bind(date_id)
                .fetch_all(self.pool())
                .await?
            }
        };
        Ok(entries)
    }

    async fn apply_diff(
        &self,
        date: &DateRecord,
        delete_ids: &[Uuid],
        inserts: &[TargetOccurrence],
    ) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        for chunk in delete_ids.chunks(DELETE_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM occurrences WHERE date_id = ");
            qb.push_bind(date.id);
            qb.push(" AND id IN (");
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            qb.push(")");
            qb.build().execute(&mut *tx).await?;
        }

        for chunk in inserts.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                r#"INSERT INTO occurrences
                (id, date_id, element_id, site_id, field_id, start_at, end_at, all_day, first, deleted) "#,
            );
            qb.push_values(chunk, |mut b, occ| {
                b.push_bind(Uuid::now_v7())
                    .push_bind(date.id)
                    .push_bind(date.element_id)
                    .push_bind(date.site_id)
                    .push_bind(date.field_id)
                    .push_bind(occ.start_at)
                    .push_bind(occ.end_at)
                    .push_bind(occ.all_day)
                    .push_bind(occ.first)
                    .push_bind(false);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_entries_deleted(&self, date_id: Uuid, deleted: bool) -> Result<(), CoreError> {
        sqlx::query("UPDATE occurrences SET deleted = $1 WHERE date_id = $2")
            .bind(deleted)
            .bind(date_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn next_occurrence(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Option<Occurrence>, CoreError> {
        let entry: Option<OccurrenceEntry> = sqlx::query_as(
            r#"SELECT * FROM occurrences
            WHERE element_id = $1 AND site_id = $2 AND field_id = $3
              AND deleted = 0 AND start_at >= $4
            ORDER BY start_at ASC
            LIMIT 1"#,
        )
        .bind(element_id)
        .bind(site_id)
        .bind(field_id)
        .bind(after)
        .fetch_optional(self.pool())
        .await?;
        Ok(entry.map(Occurrence::from))
    }

    async fn last_occurrence(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
    ) -> Result<Option<Occurrence>, CoreError> {
        let entry: Option<OccurrenceEntry> = sqlx::query_as(
            r#"SELECT * FROM occurrences
            WHERE element_id = $1 AND site_id = $2 AND field_id = $3 AND deleted = 0
            ORDER BY start_at DESC
            LIMIT 1"#,
        )
        .bind(element_id)
        .bind(site_id)
        .bind(field_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(entry.map(Occurrence::from))
    }

    async fn occurrences_in_range(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        include_first: bool,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM occurrences WHERE element_id = ");
        qb.push_bind(element_id);
        qb.push(" AND site_id = ");
        qb.push_bind(site_id);
        qb.push(" AND field_id = ");
        qb.push_bind(field_id);
        qb.push(" AND deleted = 0 AND start_at <= ");
        qb.push_bind(to);
        qb.push(" AND end_at >= ");
        qb.push_bind(from);
        if !include_first {
            qb.push(" AND first = 0");
        }
        qb.push(" ORDER BY start_at ASC");

        let entries: Vec<OccurrenceEntry> =
            qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(entries.into_iter().map(Occurrence::from).collect())
    }

    async fn all_occurrences(
        &self,
        element_id: Uuid,
        site_id: Uuid,
        field_id: Uuid,
        future_from: Option<DateTime<Utc>>,
        include_first: bool,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM occurrences WHERE element_id = ");
        qb.push_bind(element_id);
        qb.push(" AND site_id = ");
        qb.push_bind(site_id);
        qb.push(" AND field_id = ");
        qb.push_bind(field_id);
        qb.push(" AND deleted = 0");
        if let Some(from) = future_from {
            qb.push(" AND start_at >= ");
            qb.push_bind(from);
        }
        if !include_first {
            qb.push(" AND first = 0");
        }
        qb.push(" ORDER BY start_at ASC");

        let entries: Vec<OccurrenceEntry> =
            qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(entries.into_iter().map(Occurrence::from).collect())
    }
}
