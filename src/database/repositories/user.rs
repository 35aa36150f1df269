use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{CandidateDiscipline, User, UserRole};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: UserRole,
    ) -> Result<User> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, email, password_hash, name, role, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(role)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, name, role, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, name, role, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_disciplines(&self, user_id: Uuid) -> Result<Vec<CandidateDiscipline>> {
        let disciplines = sqlx::query_as::<_, CandidateDiscipline>(
            "SELECT user_id, discipline, experience_level FROM candidate_disciplines WHERE user_id = $1 ORDER BY discipline",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(disciplines)
    }

    pub async fn add_discipline(
        &self,
        user_id: Uuid,
        discipline: &str,
        experience_level: &str,
    ) -> Result<CandidateDiscipline> {
        let row = sqlx::query_as::<_, CandidateDiscipline>(
            r#"
            INSERT INTO candidate_disciplines (user_id, discipline, experience_level)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, discipline) DO UPDATE SET experience_level = $3
            RETURNING user_id, discipline, experience_level
            "#,
        )
        .bind(user_id)
        .bind(discipline)
        .bind(experience_level)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
