//! Memberships domain - the transition engine, audit log and enrollment sampler
//!
//! Architecture:
//!   HTTP route / CLI → actions (transition, update_user_segments, enroll_segment, report)
//!   actions → kernel storage traits → models (sqlx) or InMemoryStore (tests)

pub mod actions;
pub mod models;

pub use models::{HistoryEntry, Membership, MembershipOperation, SegmentHistory};
