use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::common::UserId;

/// User model - created once, never mutated or deleted
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Insert a new user; the id and creation timestamp are assigned here
    pub async fn create(pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (id, created_at) VALUES ($1, NOW()) RETURNING *",
        )
        .bind(UserId::new())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// All user ids, oldest first
    pub async fn find_all_ids(pool: &PgPool) -> Result<Vec<UserId>> {
        let rows = sqlx::query_as::<_, (UserId,)>("SELECT id FROM users ORDER BY created_at, id")
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
