use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{Timesheet, TimesheetStatus};

const TIMESHEET_COLUMNS: &str = "id, candidate_id, requisition_id, week_begin_date, hours_raw, total_hours_worked, total_hours_billed, candidate_rate_base, candidate_rate_ot, status, validated, awaiting_client_signature, created_at, updated_at";

#[derive(Clone)]
pub struct TimesheetRepository {
    pool: PgPool,
}

impl TimesheetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One timesheet per (candidate, requisition, week). Created lazily as
    /// DRAFT by the claim engine. ON CONFLICT DO NOTHING keeps a lost
    /// creation race from aborting the surrounding claim transaction; the
    /// loser reads the winner's row.
    pub async fn find_or_create_draft_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        candidate_id: Uuid,
        requisition_id: Uuid,
        week_begin_date: NaiveDate,
    ) -> Result<Timesheet, sqlx::Error> {
        let now = Utc::now();
        if let Some(created) = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            INSERT INTO timesheets (candidate_id, requisition_id, week_begin_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (candidate_id, requisition_id, week_begin_date) DO NOTHING
            RETURNING {TIMESHEET_COLUMNS}
            "#
        ))
        .bind(candidate_id)
        .bind(requisition_id)
        .bind(week_begin_date)
        .bind(TimesheetStatus::Draft)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?
        {
            return Ok(created);
        }

        sqlx::query_as::<_, Timesheet>(&format!(
            "SELECT {TIMESHEET_COLUMNS} FROM timesheets WHERE candidate_id = $1 AND requisition_id = $2 AND week_begin_date = $3"
        ))
        .bind(candidate_id)
        .bind(requisition_id)
        .bind(week_begin_date)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Timesheet>> {
        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            "SELECT {TIMESHEET_COLUMNS} FROM timesheets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(timesheet)
    }

    pub async fn find_by_triple(
        &self,
        candidate_id: Uuid,
        requisition_id: Uuid,
        week_begin_date: NaiveDate,
    ) -> Result<Option<Timesheet>> {
        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            "SELECT {TIMESHEET_COLUMNS} FROM timesheets WHERE candidate_id = $1 AND requisition_id = $2 AND week_begin_date = $3"
        ))
        .bind(candidate_id)
        .bind(requisition_id)
        .bind(week_begin_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(timesheet)
    }

    pub async fn get_by_candidate(&self, candidate_id: Uuid) -> Result<Vec<Timesheet>> {
        let timesheets = sqlx::query_as::<_, Timesheet>(&format!(
            "SELECT {TIMESHEET_COLUMNS} FROM timesheets WHERE candidate_id = $1 ORDER BY week_begin_date DESC"
        ))
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(timesheets)
    }

    pub async fn get_by_requisition(&self, requisition_id: Uuid) -> Result<Vec<Timesheet>> {
        let timesheets = sqlx::query_as::<_, Timesheet>(&format!(
            "SELECT {TIMESHEET_COLUMNS} FROM timesheets WHERE requisition_id = $1 ORDER BY week_begin_date DESC"
        ))
        .bind(requisition_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(timesheets)
    }

    /// Fill in a DRAFT timesheet and move it to PENDING. Returns None when
    /// the row was not in DRAFT (already submitted).
    pub async fn submit(
        &self,
        id: Uuid,
        hours_raw: serde_json::Value,
        total_hours_worked: BigDecimal,
        candidate_rate_base: BigDecimal,
        candidate_rate_ot: BigDecimal,
    ) -> Result<Option<Timesheet>> {
        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            UPDATE timesheets
            SET hours_raw = $1,
                total_hours_worked = $2,
                candidate_rate_base = $3,
                candidate_rate_ot = $4,
                status = $5,
                awaiting_client_signature = TRUE,
                updated_at = $6
            WHERE id = $7 AND status = $8
            RETURNING {TIMESHEET_COLUMNS}
            "#
        ))
        .bind(hours_raw)
        .bind(total_hours_worked)
        .bind(candidate_rate_base)
        .bind(candidate_rate_ot)
        .bind(TimesheetStatus::Pending)
        .bind(Utc::now())
        .bind(id)
        .bind(TimesheetStatus::Draft)
        .fetch_optional(&self.pool)
        .await?;

        Ok(timesheet)
    }

    /// Guarded transition; None means the row was not in `from`.
    pub async fn update_status_guarded(
        &self,
        id: Uuid,
        from: TimesheetStatus,
        to: TimesheetStatus,
    ) -> Result<Option<Timesheet>> {
        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            UPDATE timesheets
            SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING {TIMESHEET_COLUMNS}
            "#
        ))
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;

        Ok(timesheet)
    }

    /// The settlement rollback primitive: APPROVED back to PENDING.
    pub async fn revert_to_pending(&self, id: Uuid) -> Result<Option<Timesheet>> {
        self.update_status_guarded(id, TimesheetStatus::Approved, TimesheetStatus::Pending)
            .await
    }

    pub async fn set_total_hours_billed(
        &self,
        id: Uuid,
        total_hours_billed: BigDecimal,
    ) -> Result<Option<Timesheet>> {
        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            UPDATE timesheets
            SET total_hours_billed = $1, updated_at = $2
            WHERE id = $3
            RETURNING {TIMESHEET_COLUMNS}
            "#
        ))
        .bind(total_hours_billed)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(timesheet)
    }

    pub async fn set_validated(&self, id: Uuid, validated: bool) -> Result<Option<Timesheet>> {
        let timesheet = sqlx::query_as::<_, Timesheet>(&format!(
            r#"
            UPDATE timesheets
            SET validated = $1, updated_at = $2
            WHERE id = $3
            RETURNING {TIMESHEET_COLUMNS}
            "#
        ))
        .bind(validated)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(timesheet)
    }

    /// Delete only while still DRAFT; submitted timesheets are never
    /// hard-deleted.
    pub async fn delete_draft_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM timesheets WHERE id = $1 AND status = 'draft'")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
