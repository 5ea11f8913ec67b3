//! Typed ids for every persisted entity.

pub use super::id::Id;

/// Marker type for users.
pub struct User;

/// Marker type for segments.
pub struct Segment;

/// Marker type for membership rows (`user_segments`).
pub struct Membership;

/// Marker type for audit rows (`segment_history`).
pub struct HistoryEntry;

pub type UserId = Id<User>;

pub type SegmentId = Id<Segment>;

pub type MembershipId = Id<Membership>;

pub type HistoryEntryId = Id<HistoryEntry>;
