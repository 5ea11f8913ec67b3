//! Membership actions - business logic functions
//!
//! Called directly from HTTP routes and the CLI with `&ServerDeps`.

mod enroll;
mod queries;
mod report;
mod transition;
mod update_user_segments;

pub use enroll::{enroll_segment, enrollment_count, enrollment_expiry, sample_users};
pub use queries::user_segment_slugs;
pub use report::{render_csv, report};
pub use transition::{transition, Transition, TransitionReport};
pub use update_user_segments::{update_user_segments, SegmentUpdate, SlugOutcome};
