//! Segment directory actions

mod create_segment;
mod delete_segment;

pub use create_segment::{create_segment, CreatedSegment};
pub use delete_segment::delete_segment;
