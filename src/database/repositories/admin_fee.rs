use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;

use crate::database::models::{AdminFeeConfig, AdminFeeConfigInput};

#[derive(Clone)]
pub struct AdminFeeRepository {
    pool: PgPool,
}

impl AdminFeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The singleton fee row, seeded by migration.
    pub async fn get_fee_config(&self) -> Result<AdminFeeConfig> {
        let config = sqlx::query_as::<_, AdminFeeConfig>(
            "SELECT id, fee_amount, fee_type, updated_at FROM admin_fee_config ORDER BY updated_at DESC LIMIT 1",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(config)
    }

    pub async fn update_fee_config(&self, input: AdminFeeConfigInput) -> Result<AdminFeeConfig> {
        let config = sqlx::query_as::<_, AdminFeeConfig>(
            r#"
            UPDATE admin_fee_config
            SET fee_amount = $1, fee_type = $2, updated_at = $3
            RETURNING id, fee_amount, fee_type, updated_at
            "#,
        )
        .bind(input.fee_amount)
        .bind(input.fee_type)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(config)
    }
}
