pub mod history;
pub mod membership;

pub use history::{HistoryEntry, MembershipOperation, SegmentHistory};
pub use membership::Membership;
