use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{AuditRecord, CreateAuditInput};

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(&self, input: CreateAuditInput) -> Result<AuditRecord, sqlx::Error> {
        let metadata = input
            .metadata
            .map(|m| serde_json::to_value(m).unwrap_or(serde_json::Value::Null));

        let record = sqlx::query_as::<_, AuditRecord>(
            r#"
            INSERT INTO audit_records (actor_id, entity_type, entity_id, action, description, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, actor_id, entity_type, entity_id, action, description, metadata, created_at
            "#,
        )
        .bind(input.actor_id)
        .bind(input.entity_type)
        .bind(input.entity_id)
        .bind(input.action)
        .bind(input.description)
        .bind(metadata)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, actor_id, entity_type, entity_id, action, description, metadata, created_at
            FROM audit_records
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
