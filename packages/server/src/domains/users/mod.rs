//! Users domain - the population segments are drawn from

pub mod actions;
pub mod models;

pub use models::User;
