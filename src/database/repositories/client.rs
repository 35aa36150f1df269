use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Client, ClientInput};

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_client(&self, input: ClientInput) -> Result<Client> {
        let now = Utc::now();
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (name, contact_email, billing_customer_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, name, contact_email, billing_customer_id, created_at, updated_at
            "#,
        )
        .bind(input.name)
        .bind(input.contact_email)
        .bind(input.billing_customer_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, name, contact_email, billing_customer_id, created_at, updated_at FROM clients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn get_clients(&self) -> Result<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT id, name, contact_email, billing_customer_id, created_at, updated_at FROM clients ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    pub async fn update_billing_customer(
        &self,
        id: Uuid,
        billing_customer_id: Option<String>,
    ) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET billing_customer_id = $1, updated_at = $2
            WHERE id = $3
            RETURNING id, name, contact_email, billing_customer_id, created_at, updated_at
            "#,
        )
        .bind(billing_customer_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }
}
