//! Postgres implementation of the storage traits.
//!
//! Thin adapter over the sqlx models in `domains/*/models`; it only maps
//! `anyhow` errors onto `MembershipError` kinds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::common::{is_unique_violation, MembershipError, MembershipResult, SegmentId, UserId};
use crate::domains::memberships::models::{
    HistoryEntry, Membership, MembershipOperation, SegmentHistory,
};
use crate::domains::segments::models::Segment;
use crate::domains::users::models::User;
use crate::kernel::{
    BaseHistoryLog, BaseMembershipScope, BaseMembershipStore, BaseSegmentDirectory,
    BaseUserDirectory,
};

/// Storage backed by a shared connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Open Postgres transaction; rolls back on drop if never committed
pub struct PgMembershipScope {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BaseMembershipScope for PgMembershipScope {
    async fn insert(
        &mut self,
        user_id: UserId,
        segment_id: SegmentId,
        expires_at: DateTime<Utc>,
    ) -> MembershipResult<()> {
        Membership::insert(user_id, segment_id, expires_at, &mut *self.tx).await?;
        Ok(())
    }

    async fn delete_all(
        &mut self,
        user_id: UserId,
        segment_id: SegmentId,
    ) -> MembershipResult<u64> {
        Ok(Membership::delete_all(user_id, segment_id, &mut *self.tx).await?)
    }

    async fn commit(self: Box<Self>) -> MembershipResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> MembershipResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl BaseUserDirectory for PgStore {
    async fn create_user(&self) -> MembershipResult<User> {
        Ok(User::create(&self.pool).await?)
    }

    async fn user_exists(&self, user_id: UserId) -> MembershipResult<bool> {
        Ok(User::find_by_id(user_id, &self.pool).await?.is_some())
    }
}

#[async_trait]
impl BaseSegmentDirectory for PgStore {
    async fn create_segment(
        &self,
        slug: &str,
        auto_add: bool,
        auto_pct: i32,
    ) -> MembershipResult<Segment> {
        Segment::create(slug, auto_add, auto_pct, &self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MembershipError::Conflict(format!("segment \"{}\"", slug))
                } else {
                    MembershipError::Storage(e)
                }
            })
    }

    async fn resolve_slug(&self, slug: &str) -> MembershipResult<SegmentId> {
        Segment::find_by_slug(slug, &self.pool)
            .await?
            .map(|segment| segment.id)
            .ok_or_else(|| MembershipError::not_found(format!("segment \"{}\"", slug)))
    }

    async fn delete_segment(&self, slug: &str) -> MembershipResult<u64> {
        let removed = Segment::delete_by_slug(slug, &self.pool).await?;
        debug!(slug = %slug, removed, "segment delete executed");
        Ok(removed)
    }
}

#[async_trait]
impl BaseMembershipStore for PgStore {
    async fn begin(&self) -> MembershipResult<Box<dyn BaseMembershipScope>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgMembershipScope { tx }))
    }

    async fn is_linked(&self, user_id: UserId, segment_id: SegmentId) -> MembershipResult<bool> {
        Ok(Membership::is_linked(user_id, segment_id, &self.pool).await?)
    }

    async fn list_segment_slugs(&self, user_id: UserId) -> MembershipResult<Vec<String>> {
        Ok(Membership::find_segment_slugs(user_id, &self.pool).await?)
    }

    async fn list_all_user_ids(&self) -> MembershipResult<Vec<UserId>> {
        Ok(User::find_all_ids(&self.pool).await?)
    }
}

#[async_trait]
impl BaseHistoryLog for PgStore {
    async fn append(
        &self,
        user_id: UserId,
        segment_id: SegmentId,
        operation: MembershipOperation,
        timestamp: DateTime<Utc>,
    ) -> MembershipResult<()> {
        SegmentHistory::append(user_id, segment_id, operation, timestamp, &self.pool).await?;
        Ok(())
    }

    async fn query_by_period(&self, year: i32, month: u32) -> MembershipResult<Vec<HistoryEntry>> {
        Ok(SegmentHistory::find_by_period(year, month, &self.pool).await?)
    }
}
