// HTTP routes
pub mod health;
pub mod segments;
pub mod users;

pub use health::*;
pub use segments::*;
pub use users::*;
