use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{RecurrenceDay, RecurrenceDayStatus};

const DAY_COLUMNS: &str = "id, requisition_id, date, day_start, day_end, lunch_start, lunch_end, status, archived, created_at, updated_at";

/// A shift's times already converted to UTC, ready for insert.
#[derive(Debug, Clone)]
pub struct NewRecurrenceDay {
    pub date: NaiveDate,
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    pub lunch_start: Option<DateTime<Utc>>,
    pub lunch_end: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct RecurrenceDayRepository {
    pool: PgPool,
}

impl RecurrenceDayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bulk insert; the whole batch lands or none of it does.
    pub async fn create_days(
        &self,
        requisition_id: Uuid,
        days: Vec<NewRecurrenceDay>,
    ) -> Result<Vec<RecurrenceDay>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(days.len());

        for day in days {
            let row = sqlx::query_as::<_, RecurrenceDay>(&format!(
                r#"
                INSERT INTO recurrence_days (requisition_id, date, day_start, day_end, lunch_start, lunch_end, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
                RETURNING {DAY_COLUMNS}
                "#
            ))
            .bind(requisition_id)
            .bind(day.date)
            .bind(day.day_start)
            .bind(day.day_end)
            .bind(day.lunch_start)
            .bind(day.lunch_end)
            .bind(RecurrenceDayStatus::Open)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RecurrenceDay>> {
        let day = sqlx::query_as::<_, RecurrenceDay>(&format!(
            "SELECT {DAY_COLUMNS} FROM recurrence_days WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(day)
    }

    pub async fn get_days_by_requisition(&self, requisition_id: Uuid) -> Result<Vec<RecurrenceDay>> {
        let days = sqlx::query_as::<_, RecurrenceDay>(&format!(
            "SELECT {DAY_COLUMNS} FROM recurrence_days WHERE requisition_id = $1 AND archived = FALSE ORDER BY date"
        ))
        .bind(requisition_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }

    /// Shifts for one requisition inside one Sunday-based week.
    pub async fn get_days_in_week(
        &self,
        requisition_id: Uuid,
        week_begin: NaiveDate,
    ) -> Result<Vec<RecurrenceDay>> {
        let days = sqlx::query_as::<_, RecurrenceDay>(&format!(
            "SELECT {DAY_COLUMNS} FROM recurrence_days WHERE requisition_id = $1 AND archived = FALSE AND date >= $2 AND date < $3 ORDER BY date"
        ))
        .bind(requisition_id)
        .bind(week_begin)
        .bind(week_begin + chrono::Duration::days(7))
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }

    pub async fn update_day(
        &self,
        id: Uuid,
        day: NewRecurrenceDay,
    ) -> Result<Option<RecurrenceDay>> {
        let row = sqlx::query_as::<_, RecurrenceDay>(&format!(
            r#"
            UPDATE recurrence_days
            SET date = $1, day_start = $2, day_end = $3, lunch_start = $4, lunch_end = $5, updated_at = $6
            WHERE id = $7
            RETURNING {DAY_COLUMNS}
            "#
        ))
        .bind(day.date)
        .bind(day.day_start)
        .bind(day.day_end)
        .bind(day.lunch_start)
        .bind(day.lunch_end)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn delete_day(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recurrence_days WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: RecurrenceDayStatus,
    ) -> Result<Option<RecurrenceDay>> {
        let row = sqlx::query_as::<_, RecurrenceDay>(&format!(
            r#"
            UPDATE recurrence_days
            SET status = $1, updated_at = $2
            WHERE id = $3
            RETURNING {DAY_COLUMNS}
            "#
        ))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Guarded status transition inside a claim/cancel transaction.
    pub async fn update_status_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        from: RecurrenceDayStatus,
        to: RecurrenceDayStatus,
    ) -> Result<Option<RecurrenceDay>, sqlx::Error> {
        sqlx::query_as::<_, RecurrenceDay>(&format!(
            r#"
            UPDATE recurrence_days
            SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING {DAY_COLUMNS}
            "#
        ))
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .bind(from)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn find_by_id_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<RecurrenceDay>, sqlx::Error> {
        sqlx::query_as::<_, RecurrenceDay>(&format!(
            "SELECT {DAY_COLUMNS} FROM recurrence_days WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn count_open_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        requisition_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM recurrence_days WHERE requisition_id = $1 AND archived = FALSE AND status = 'open'",
        )
        .bind(requisition_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Close out leftover OPEN shifts when the aging batch retires a
    /// requisition. Returns how many rows moved.
    pub async fn close_open_days(
        &self,
        requisition_id: Uuid,
        to: RecurrenceDayStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE recurrence_days
            SET status = $1, updated_at = $2
            WHERE requisition_id = $3 AND archived = FALSE AND status = 'open'
            "#,
        )
        .bind(to)
        .bind(observed_at)
        .bind(requisition_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
