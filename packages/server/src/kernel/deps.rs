//! Server dependencies (using traits for testability)
//!
//! Every action receives `&ServerDeps`. Production wires all four storage
//! roles to one `PgStore`; tests wire them to one `InMemoryStore`.

use sqlx::PgPool;
use std::sync::Arc;

use crate::kernel::{
    BaseHistoryLog, BaseMembershipStore, BaseSegmentDirectory, BaseUserDirectory, PgStore,
};

#[derive(Clone)]
pub struct ServerDeps {
    pub users: Arc<dyn BaseUserDirectory>,
    pub segments: Arc<dyn BaseSegmentDirectory>,
    pub memberships: Arc<dyn BaseMembershipStore>,
    pub history: Arc<dyn BaseHistoryLog>,
}

impl ServerDeps {
    pub fn new(
        users: Arc<dyn BaseUserDirectory>,
        segments: Arc<dyn BaseSegmentDirectory>,
        memberships: Arc<dyn BaseMembershipStore>,
        history: Arc<dyn BaseHistoryLog>,
    ) -> Self {
        Self {
            users,
            segments,
            memberships,
            history,
        }
    }

    /// Wire every role to the same backing store
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: BaseUserDirectory
            + BaseSegmentDirectory
            + BaseMembershipStore
            + BaseHistoryLog
            + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store)
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }
}
