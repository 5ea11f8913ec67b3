use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::common::SegmentId;

/// Segment model - a named group users can belong to
///
/// `slug` is unique at the store level. `auto_pct` drives both how many users
/// are enrolled at creation time and how many days those memberships last.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    pub slug: String,
    pub auto_add: bool,
    pub auto_pct: i32,
    pub created_at: DateTime<Utc>,
}

impl Segment {
    /// Insert a new segment. A duplicate slug surfaces as a unique violation.
    pub async fn create(slug: &str, auto_add: bool, auto_pct: i32, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO segments (id, slug, auto_add, auto_pct, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(SegmentId::new())
        .bind(slug)
        .bind(auto_add)
        .bind(auto_pct)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_slug(slug: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM segments WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Delete by slug. Memberships and history rows are left untouched.
    pub async fn delete_by_slug(slug: &str, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM segments WHERE slug = $1")
            .bind(slug)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
