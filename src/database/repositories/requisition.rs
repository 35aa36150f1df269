use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{Requisition, RequisitionInput, RequisitionStatus};

const REQUISITION_COLUMNS: &str = "id, title, client_id, location, discipline, experience_level, hourly_rate, permanent_position, reference_timezone, status, archived, created_at, updated_at";

/// One row of the aging scan: a requisition's fill counts and most recent
/// shift date, observed in a single query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequisitionAgingSnapshot {
    pub requisition_id: Uuid,
    pub total_days: i64,
    pub filled_days: i64,
    pub latest_date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct RequisitionRepository {
    pool: PgPool,
}

impl RequisitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_requisition(&self, input: RequisitionInput) -> Result<Requisition> {
        let now = Utc::now();
        let requisition = sqlx::query_as::<_, Requisition>(&format!(
            r#"
            INSERT INTO requisitions (title, client_id, location, discipline, experience_level, hourly_rate, permanent_position, reference_timezone, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {REQUISITION_COLUMNS}
            "#
        ))
        .bind(input.title)
        .bind(input.client_id)
        .bind(input.location)
        .bind(input.discipline)
        .bind(input.experience_level)
        .bind(input.hourly_rate)
        .bind(input.permanent_position)
        .bind(input.reference_timezone)
        .bind(RequisitionStatus::Pending)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(requisition)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Requisition>> {
        let requisition = sqlx::query_as::<_, Requisition>(&format!(
            "SELECT {REQUISITION_COLUMNS} FROM requisitions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(requisition)
    }

    pub async fn get_requisitions(&self, client_id: Option<Uuid>) -> Result<Vec<Requisition>> {
        let requisitions = if let Some(client_id) = client_id {
            sqlx::query_as::<_, Requisition>(&format!(
                "SELECT {REQUISITION_COLUMNS} FROM requisitions WHERE archived = FALSE AND client_id = $1 ORDER BY created_at DESC"
            ))
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Requisition>(&format!(
                "SELECT {REQUISITION_COLUMNS} FROM requisitions WHERE archived = FALSE ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        Ok(requisitions)
    }

    pub async fn update_requisition(
        &self,
        id: Uuid,
        input: RequisitionInput,
    ) -> Result<Option<Requisition>> {
        let requisition = sqlx::query_as::<_, Requisition>(&format!(
            r#"
            UPDATE requisitions
            SET title = $1, client_id = $2, location = $3, discipline = $4, experience_level = $5, hourly_rate = $6, permanent_position = $7, reference_timezone = $8, updated_at = $9
            WHERE id = $10
            RETURNING {REQUISITION_COLUMNS}
            "#
        ))
        .bind(input.title)
        .bind(input.client_id)
        .bind(input.location)
        .bind(input.discipline)
        .bind(input.experience_level)
        .bind(input.hourly_rate)
        .bind(input.permanent_position)
        .bind(input.reference_timezone)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(requisition)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: RequisitionStatus,
    ) -> Result<Option<Requisition>> {
        let requisition = sqlx::query_as::<_, Requisition>(&format!(
            r#"
            UPDATE requisitions
            SET status = $1, updated_at = $2
            WHERE id = $3
            RETURNING {REQUISITION_COLUMNS}
            "#
        ))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(requisition)
    }

    pub async fn find_by_id_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Requisition>, sqlx::Error> {
        sqlx::query_as::<_, Requisition>(&format!(
            "SELECT {REQUISITION_COLUMNS} FROM requisitions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn update_status_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        from: RequisitionStatus,
        to: RequisitionStatus,
    ) -> Result<Option<Requisition>, sqlx::Error> {
        sqlx::query_as::<_, Requisition>(&format!(
            r#"
            UPDATE requisitions
            SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING {REQUISITION_COLUMNS}
            "#
        ))
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .bind(from)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn set_archived(&self, id: Uuid, archived: bool) -> Result<Option<Requisition>> {
        let requisition = sqlx::query_as::<_, Requisition>(&format!(
            r#"
            UPDATE requisitions
            SET archived = $1, updated_at = $2
            WHERE id = $3
            RETURNING {REQUISITION_COLUMNS}
            "#
        ))
        .bind(archived)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(requisition)
    }

    /// Fill statistics for every non-archived, non-permanent OPEN
    /// requisition, observed in one statement so the aging batch sees a
    /// consistent snapshot.
    pub async fn aging_snapshots(&self) -> Result<Vec<RequisitionAgingSnapshot>> {
        let rows = sqlx::query_as::<_, RequisitionAgingSnapshot>(
            r#"
            SELECT
                r.id AS requisition_id,
                COUNT(d.id) AS total_days,
                COUNT(d.id) FILTER (WHERE d.status = 'filled') AS filled_days,
                MAX(d.date) AS latest_date
            FROM requisitions r
            LEFT JOIN recurrence_days d ON d.requisition_id = r.id AND d.archived = FALSE
            WHERE r.archived = FALSE
                AND r.permanent_position = FALSE
                AND r.status = 'open'
            GROUP BY r.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
