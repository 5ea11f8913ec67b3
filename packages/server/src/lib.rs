// Segment Membership Service - API Core
//
// Manages dynamic user segments: segment definitions, atomic membership
// transitions with an audit trail, percentage-based auto-enrollment and
// monthly history reports.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
