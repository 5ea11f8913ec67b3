//! Segments domain - segment definitions addressed by slug

pub mod actions;
pub mod models;

pub use models::Segment;
