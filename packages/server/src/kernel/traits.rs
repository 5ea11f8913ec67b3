// Trait definitions for dependency injection
//
// These are STORAGE traits only - no business logic. The transition engine,
// enrollment sampler and slug workflows live in domains/*/actions and talk to
// storage exclusively through these traits.
//
// Naming convention: Base* for trait names (e.g., BaseMembershipStore)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::{MembershipResult, SegmentId, UserId};
use crate::domains::memberships::models::{HistoryEntry, MembershipOperation};
use crate::domains::segments::models::Segment;
use crate::domains::users::models::User;

// =============================================================================
// User Directory
// =============================================================================

#[async_trait]
pub trait BaseUserDirectory: Send + Sync {
    /// Create a user; id and creation timestamp are assigned by the store
    async fn create_user(&self) -> MembershipResult<User>;

    async fn user_exists(&self, user_id: UserId) -> MembershipResult<bool>;
}

// =============================================================================
// Segment Directory
// =============================================================================

#[async_trait]
pub trait BaseSegmentDirectory: Send + Sync {
    /// Fails with `Conflict` when the slug is taken
    async fn create_segment(
        &self,
        slug: &str,
        auto_add: bool,
        auto_pct: i32,
    ) -> MembershipResult<Segment>;

    /// Fails with `NotFound` when no segment has this slug
    async fn resolve_slug(&self, slug: &str) -> MembershipResult<SegmentId>;

    /// Returns the number of segments removed; an unknown slug removes zero
    async fn delete_segment(&self, slug: &str) -> MembershipResult<u64>;
}

// =============================================================================
// Membership Store
// =============================================================================

/// One open atomic scope against the membership table.
///
/// Nothing written through a scope is observable until `commit` succeeds.
/// Dropping a scope without committing discards its writes.
#[async_trait]
pub trait BaseMembershipScope: Send {
    async fn insert(
        &mut self,
        user_id: UserId,
        segment_id: SegmentId,
        expires_at: DateTime<Utc>,
    ) -> MembershipResult<()>;

    /// Deletes every row for the pair; returns how many rows went away
    async fn delete_all(&mut self, user_id: UserId, segment_id: SegmentId)
        -> MembershipResult<u64>;

    async fn commit(self: Box<Self>) -> MembershipResult<()>;

    async fn rollback(self: Box<Self>) -> MembershipResult<()>;
}

#[async_trait]
pub trait BaseMembershipStore: Send + Sync {
    async fn begin(&self) -> MembershipResult<Box<dyn BaseMembershipScope>>;

    async fn is_linked(&self, user_id: UserId, segment_id: SegmentId) -> MembershipResult<bool>;

    /// Slugs of every linked segment, one per membership row, any order
    async fn list_segment_slugs(&self, user_id: UserId) -> MembershipResult<Vec<String>>;

    async fn list_all_user_ids(&self) -> MembershipResult<Vec<UserId>>;
}

// =============================================================================
// History Log
// =============================================================================

#[async_trait]
pub trait BaseHistoryLog: Send + Sync {
    async fn append(
        &self,
        user_id: UserId,
        segment_id: SegmentId,
        operation: MembershipOperation,
        timestamp: DateTime<Utc>,
    ) -> MembershipResult<()>;

    /// Entries in the given UTC calendar month, joined to segment slugs
    async fn query_by_period(&self, year: i32, month: u32) -> MembershipResult<Vec<HistoryEntry>>;
}
