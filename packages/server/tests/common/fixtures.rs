//! Test fixtures built on the sqlx models.

use anyhow::Result;
use segment_core::common::{SegmentId, UserId};
use segment_core::domains::segments::models::Segment;
use segment_core::domains::users::models::User;
use sqlx::PgPool;
use uuid::Uuid;

/// Slug that cannot collide with other tests sharing the database
pub fn unique_slug(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

pub async fn create_test_user(pool: &PgPool) -> Result<UserId> {
    Ok(User::create(pool).await?.id)
}

pub async fn create_test_segment(pool: &PgPool, slug: &str) -> Result<SegmentId> {
    Ok(Segment::create(slug, false, 0, pool).await?.id)
}

/// Number of history rows recorded for the pair
pub async fn history_count(pool: &PgPool, user_id: UserId, segment_id: SegmentId) -> Result<i64> {
    let (count,) = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM segment_history WHERE user_id = $1 AND segment_id = $2",
    )
    .bind(user_id)
    .bind(segment_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
