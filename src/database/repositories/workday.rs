use anyhow::Result;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::Workday;

const WORKDAY_COLUMNS: &str =
    "id, requisition_id, recurrence_day_id, candidate_id, timesheet_id, created_at";

#[derive(Clone)]
pub struct WorkdayRepository {
    pool: PgPool,
}

impl WorkdayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert inside the claim transaction. The unique index on
    /// recurrence_day_id makes the losing side of a concurrent claim fail
    /// with a unique violation; the caller maps that to `AlreadyClaimed`.
    pub async fn insert_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        requisition_id: Uuid,
        recurrence_day_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Workday, sqlx::Error> {
        sqlx::query_as::<_, Workday>(&format!(
            r#"
            INSERT INTO workdays (requisition_id, recurrence_day_id, candidate_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {WORKDAY_COLUMNS}
            "#
        ))
        .bind(requisition_id)
        .bind(recurrence_day_id)
        .bind(candidate_id)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn set_timesheet_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        workday_id: Uuid,
        timesheet_id: Uuid,
    ) -> Result<Option<Workday>, sqlx::Error> {
        sqlx::query_as::<_, Workday>(&format!(
            r#"
            UPDATE workdays
            SET timesheet_id = $1
            WHERE id = $2
            RETURNING {WORKDAY_COLUMNS}
            "#
        ))
        .bind(timesheet_id)
        .bind(workday_id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn find_by_id_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Workday>, sqlx::Error> {
        sqlx::query_as::<_, Workday>(&format!(
            "SELECT {WORKDAY_COLUMNS} FROM workdays WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Workday>> {
        let workday = sqlx::query_as::<_, Workday>(&format!(
            "SELECT {WORKDAY_COLUMNS} FROM workdays WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(workday)
    }

    pub async fn find_by_recurrence_day(&self, recurrence_day_id: Uuid) -> Result<Option<Workday>> {
        let workday = sqlx::query_as::<_, Workday>(&format!(
            "SELECT {WORKDAY_COLUMNS} FROM workdays WHERE recurrence_day_id = $1"
        ))
        .bind(recurrence_day_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(workday)
    }

    pub async fn get_by_candidate(&self, candidate_id: Uuid) -> Result<Vec<Workday>> {
        let workdays = sqlx::query_as::<_, Workday>(&format!(
            "SELECT {WORKDAY_COLUMNS} FROM workdays WHERE candidate_id = $1 ORDER BY created_at DESC"
        ))
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(workdays)
    }

    pub async fn get_by_candidate_and_requisition(
        &self,
        candidate_id: Uuid,
        requisition_id: Uuid,
    ) -> Result<Vec<Workday>> {
        let workdays = sqlx::query_as::<_, Workday>(&format!(
            "SELECT {WORKDAY_COLUMNS} FROM workdays WHERE candidate_id = $1 AND requisition_id = $2 ORDER BY created_at"
        ))
        .bind(candidate_id)
        .bind(requisition_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(workdays)
    }

    pub async fn delete_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Workday>, sqlx::Error> {
        sqlx::query_as::<_, Workday>(&format!(
            "DELETE FROM workdays WHERE id = $1 RETURNING {WORKDAY_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// How many workdays still point at a timesheet. Guards draft-timesheet
    /// deletion when a claim is canceled.
    pub async fn count_for_timesheet_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        timesheet_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM workdays WHERE timesheet_id = $1")
            .bind(timesheet_id)
            .fetch_one(&mut **tx)
            .await
    }
}
