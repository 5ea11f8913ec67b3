//! Membership transition engine.
//!
//! A transition is one atomic batch of membership inserts and deletes for a
//! single user, followed by one history append per operation.
//!
//! The two phases are deliberately separate:
//!
//! 1. All inserts and deletes run inside one storage scope. Any failure rolls
//!    the whole scope back and nothing is logged.
//! 2. After the commit, history entries are appended one by one, outside the
//!    scope. A failed append fails the call, but the memberships stay
//!    committed: the caller is looking at a missing audit entry, not a rolled
//!    back change. A crash between the phases has the same effect.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::common::{MembershipResult, SegmentId, UserId};
use crate::domains::memberships::models::MembershipOperation;
use crate::kernel::{BaseMembershipScope, ServerDeps};

/// One batch of adds and removes for a single user
#[derive(Debug, Clone)]
pub struct Transition {
    pub user_id: UserId,
    pub add: BTreeSet<SegmentId>,
    pub remove: BTreeSet<SegmentId>,
    pub expires_at: DateTime<Utc>,
}

impl Transition {
    pub fn new(user_id: UserId, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            add: BTreeSet::new(),
            remove: BTreeSet::new(),
            expires_at,
        }
    }

    pub fn add(mut self, segment_id: SegmentId) -> Self {
        self.add.insert(segment_id);
        self
    }

    pub fn remove(mut self, segment_id: SegmentId) -> Self {
        self.remove.insert(segment_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// What a committed transition did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionReport {
    pub inserted: usize,
    pub removed_rows: u64,
    pub logged: usize,
}

/// Apply `transition` atomically, then log every operation it performed.
pub async fn transition(
    transition: &Transition,
    deps: &ServerDeps,
) -> MembershipResult<TransitionReport> {
    if transition.is_empty() {
        return Ok(TransitionReport::default());
    }

    let user_id = transition.user_id;
    let mut scope = deps.memberships.begin().await?;

    let staged = stage(transition, scope.as_mut()).await;
    let removed_rows = match staged {
        Ok(removed_rows) => removed_rows,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "membership transition failed, rolling back");
            if let Err(rollback_err) = scope.rollback().await {
                warn!(user_id = %user_id, error = %rollback_err, "rollback failed");
            }
            return Err(e);
        }
    };

    scope.commit().await?;

    debug!(
        user_id = %user_id,
        added = transition.add.len(),
        removed = transition.remove.len(),
        removed_rows,
        "membership transition committed"
    );

    // Phase 2: audit log, outside the membership scope
    let mut logged = 0;
    let operations = transition
        .add
        .iter()
        .map(|id| (*id, MembershipOperation::Add))
        .chain(transition.remove.iter().map(|id| (*id, MembershipOperation::Remove)));

    for (segment_id, operation) in operations {
        if let Err(e) = deps
            .history
            .append(user_id, segment_id, operation, Utc::now())
            .await
        {
            warn!(
                user_id = %user_id,
                segment_id = %segment_id,
                operation = %operation,
                error = %e,
                "history append failed after commit; membership change is durable but unlogged"
            );
            return Err(e);
        }
        logged += 1;
    }

    info!(user_id = %user_id, logged, "membership transition logged");

    Ok(TransitionReport {
        inserted: transition.add.len(),
        removed_rows,
        logged,
    })
}

async fn stage(
    transition: &Transition,
    scope: &mut dyn BaseMembershipScope,
) -> MembershipResult<u64> {
    for segment_id in &transition.add {
        scope
            .insert(transition.user_id, *segment_id, transition.expires_at)
            .await?;
    }

    let mut removed_rows = 0;
    for segment_id in &transition.remove {
        removed_rows += scope.delete_all(transition.user_id, *segment_id).await?;
    }

    Ok(removed_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::memberships::models::MembershipOperation::{Add, Remove};
    use crate::kernel::{BaseMembershipStore, BaseSegmentDirectory, InMemoryStore};
    use chrono::Duration;

    async fn setup(store: &InMemoryStore, slugs: &[&str]) -> (UserId, Vec<SegmentId>) {
        let user = store.seed_users(1)[0];
        let mut ids = Vec::new();
        for slug in slugs {
            ids.push(store.create_segment(slug, false, 0).await.unwrap().id);
        }
        (user, ids)
    }

    fn tomorrow() -> DateTime<Utc> {
        Utc::now() + Duration::days(1)
    }

    #[tokio::test]
    async fn add_then_remove_leaves_pair_unlinked_with_two_entries() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let (user, segments) = setup(&store, &["vip"]).await;
        let vip = segments[0];

        transition(&Transition::new(user, tomorrow()).add(vip), &deps)
            .await
            .unwrap();
        assert!(store.is_linked(user, vip).await.unwrap());

        let report = transition(&Transition::new(user, tomorrow()).remove(vip), &deps)
            .await
            .unwrap();
        assert_eq!(report.removed_rows, 1);
        assert!(!store.is_linked(user, vip).await.unwrap());

        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!((history[0].segment_id, history[0].operation), (vip, Add));
        assert_eq!((history[1].segment_id, history[1].operation), (vip, Remove));
        assert!(history[0].timestamp <= history[1].timestamp);
    }

    #[tokio::test]
    async fn failing_second_insert_rolls_back_everything() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let (user, segments) = setup(&store, &["a", "b"]).await;
        store.fail_insert_call(2);

        let batch = Transition::new(user, tomorrow())
            .add(segments[0])
            .add(segments[1]);
        let err = transition(&batch, &deps).await.unwrap_err();

        assert!(err.is_storage());
        assert!(store.memberships().is_empty());
        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_trace() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let (user, segments) = setup(&store, &["a"]).await;
        store.fail_commits();

        let result = transition(&Transition::new(user, tomorrow()).add(segments[0]), &deps).await;

        assert!(result.unwrap_err().is_storage());
        assert!(store.memberships().is_empty());
        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn history_failure_after_commit_keeps_membership() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let (user, segments) = setup(&store, &["a", "b"]).await;
        store.fail_history_after(1);

        let batch = Transition::new(user, tomorrow())
            .add(segments[0])
            .add(segments[1]);
        let err = transition(&batch, &deps).await.unwrap_err();

        assert!(err.is_storage());
        // Both memberships committed, only the first one was logged
        assert_eq!(store.memberships().len(), 2);
        assert_eq!(store.history().len(), 1);
    }

    #[tokio::test]
    async fn adds_and_removes_share_one_scope() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let (user, segments) = setup(&store, &["old", "new"]).await;

        transition(&Transition::new(user, tomorrow()).add(segments[0]), &deps)
            .await
            .unwrap();
        let begins = store.begin_calls();

        let swap = Transition::new(user, tomorrow())
            .add(segments[1])
            .remove(segments[0]);
        let report = transition(&swap, &deps).await.unwrap();

        assert_eq!(store.begin_calls(), begins + 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.logged, 2);
        assert!(store.is_linked(user, segments[1]).await.unwrap());
        assert!(!store.is_linked(user, segments[0]).await.unwrap());
    }

    #[tokio::test]
    async fn repeated_adds_create_duplicate_rows_and_remove_clears_all() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let (user, segments) = setup(&store, &["vip"]).await;
        let add = Transition::new(user, tomorrow()).add(segments[0]);

        transition(&add, &deps).await.unwrap();
        transition(&add, &deps).await.unwrap();
        assert_eq!(store.memberships().len(), 2);

        let report = transition(&Transition::new(user, tomorrow()).remove(segments[0]), &deps)
            .await
            .unwrap();
        assert_eq!(report.removed_rows, 2);
        assert!(store.memberships().is_empty());
    }

    #[tokio::test]
    async fn empty_transition_touches_nothing() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let (user, _) = setup(&store, &[]).await;

        let report = transition(&Transition::new(user, tomorrow()), &deps)
            .await
            .unwrap();

        assert_eq!(report, TransitionReport::default());
        assert_eq!(store.begin_calls(), 0);
    }
}
