// Common types shared across the kernel, domains and HTTP layer

pub mod entity_ids;
pub mod errors;
pub mod id;

pub use entity_ids::*;
pub use errors::{is_unique_violation, MembershipError, MembershipResult};
pub use id::Id;
