// Business domains
pub mod memberships;
pub mod segments;
pub mod users;
