// Infrastructure layer - storage traits, adapters and the dependency container

pub mod deps;
pub mod pg_store;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use pg_store::{PgMembershipScope, PgStore};
pub use test_dependencies::InMemoryStore;
pub use traits::*;
