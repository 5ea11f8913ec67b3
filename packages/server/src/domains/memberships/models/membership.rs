use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::common::{MembershipId, SegmentId, UserId};

/// Queries over `user_segments`, the (user, segment) links with an expiration
///
/// The table has no uniqueness on the pair, so repeated adds produce duplicate
/// rows. `expires_at` is stored but never enforced on reads.
pub struct Membership;

impl Membership {
    /// Append one membership row. Accepts a pool or an open transaction.
    pub async fn insert<'e, E>(
        user_id: UserId,
        segment_id: SegmentId,
        expires_at: DateTime<Utc>,
        executor: E,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO user_segments (id, user_id, segment_id, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(MembershipId::new())
        .bind(user_id)
        .bind(segment_id)
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Remove every row for the pair, whatever its expiration
    pub async fn delete_all<'e, E>(
        user_id: UserId,
        segment_id: SegmentId,
        executor: E,
    ) -> Result<u64>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM user_segments WHERE user_id = $1 AND segment_id = $2")
            .bind(user_id)
            .bind(segment_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn is_linked(user_id: UserId, segment_id: SegmentId, pool: &PgPool) -> Result<bool> {
        let (linked,) = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS(SELECT 1 FROM user_segments WHERE user_id = $1 AND segment_id = $2)",
        )
        .bind(user_id)
        .bind(segment_id)
        .fetch_one(pool)
        .await?;

        Ok(linked)
    }

    /// Slugs of every segment linked to the user, one per membership row
    ///
    /// Rows whose segment has been deleted drop out of the join.
    pub async fn find_segment_slugs(user_id: UserId, pool: &PgPool) -> Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT s.slug
            FROM user_segments us
            JOIN segments s ON s.id = us.segment_id
            WHERE us.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(slug,)| slug).collect())
    }
}
