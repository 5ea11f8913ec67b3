// InMemoryStore - storage double for tests
//
// Implements every storage trait over plain vectors, with failure injection
// and call counters so tests can observe exactly what the engine did.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use std::sync::{Arc, Mutex};

use crate::common::{MembershipError, MembershipResult, SegmentId, UserId};
use crate::domains::memberships::models::{HistoryEntry, MembershipOperation};
use crate::domains::segments::models::Segment;
use crate::domains::users::models::User;
use crate::kernel::{
    BaseHistoryLog, BaseMembershipScope, BaseMembershipStore, BaseSegmentDirectory,
    BaseUserDirectory, ServerDeps,
};

/// Committed membership row
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMembership {
    pub user_id: UserId,
    pub segment_id: SegmentId,
    pub expires_at: DateTime<Utc>,
}

/// Raw history row (segment kept as an id, like the table)
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryHistoryRow {
    pub user_id: UserId,
    pub segment_id: SegmentId,
    pub operation: MembershipOperation,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct Failures {
    /// 1-based insert call that fails
    insert_call: Option<usize>,
    commit: bool,
    /// Number of appends allowed before every further append fails
    history_after: Option<usize>,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    segments: Vec<Segment>,
    memberships: Vec<MemoryMembership>,
    history: Vec<MemoryHistoryRow>,
    failures: Failures,
    begin_calls: usize,
    insert_calls: usize,
    append_calls: usize,
}

enum StagedOp {
    Insert(MemoryMembership),
    DeleteAll(UserId, SegmentId),
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap this store in a `ServerDeps`, keeping a handle for assertions
    pub fn deps(&self) -> ServerDeps {
        ServerDeps::from_store(Arc::new(self.clone()))
    }

    /// Make the n-th insert (1-based, counted across all scopes) fail
    pub fn fail_insert_call(&self, n: usize) -> &Self {
        self.state.lock().unwrap().failures.insert_call = Some(n);
        self
    }

    pub fn fail_commits(&self) -> &Self {
        self.state.lock().unwrap().failures.commit = true;
        self
    }

    /// Allow `n` more history appends, then fail every one after
    pub fn fail_history_after(&self, n: usize) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.failures.history_after = Some(state.append_calls + n);
        self
    }

    pub fn begin_calls(&self) -> usize {
        self.state.lock().unwrap().begin_calls
    }

    pub fn memberships(&self) -> Vec<MemoryMembership> {
        self.state.lock().unwrap().memberships.clone()
    }

    pub fn history(&self) -> Vec<MemoryHistoryRow> {
        self.state.lock().unwrap().history.clone()
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.state.lock().unwrap().users.iter().map(|u| u.id).collect()
    }

    /// Add `n` users directly, bypassing the directory trait
    pub fn seed_users(&self, n: usize) -> Vec<UserId> {
        let mut state = self.state.lock().unwrap();
        (0..n)
            .map(|_| {
                let user = User {
                    id: UserId::new(),
                    created_at: Utc::now(),
                };
                let id = user.id;
                state.users.push(user);
                id
            })
            .collect()
    }
}

pub struct MemoryScope {
    state: Arc<Mutex<MemoryState>>,
    staged: Vec<StagedOp>,
}

fn injected(what: &str) -> MembershipError {
    MembershipError::Storage(anyhow::anyhow!("injected {} failure", what))
}

#[async_trait]
impl BaseMembershipScope for MemoryScope {
    async fn insert(
        &mut self,
        user_id: UserId,
        segment_id: SegmentId,
        expires_at: DateTime<Utc>,
    ) -> MembershipResult<()> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        if state.failures.insert_call == Some(state.insert_calls) {
            return Err(injected("insert"));
        }
        self.staged.push(StagedOp::Insert(MemoryMembership {
            user_id,
            segment_id,
            expires_at,
        }));
        Ok(())
    }

    async fn delete_all(
        &mut self,
        user_id: UserId,
        segment_id: SegmentId,
    ) -> MembershipResult<u64> {
        let state = self.state.lock().unwrap();
        let committed = state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.segment_id == segment_id)
            .count();
        // Rows visible inside this scope: replay staged ops over the committed count
        let visible = self.staged.iter().fold(committed, |rows, op| match op {
            StagedOp::Insert(m) if m.user_id == user_id && m.segment_id == segment_id => rows + 1,
            StagedOp::DeleteAll(u, s) if *u == user_id && *s == segment_id => 0,
            _ => rows,
        });
        self.staged.push(StagedOp::DeleteAll(user_id, segment_id));
        Ok(visible as u64)
    }

    async fn commit(self: Box<Self>) -> MembershipResult<()> {
        let MemoryScope { state, staged } = *self;
        let mut state = state.lock().unwrap();
        if state.failures.commit {
            return Err(injected("commit"));
        }
        for op in staged {
            match op {
                StagedOp::Insert(row) => state.memberships.push(row),
                StagedOp::DeleteAll(user_id, segment_id) => state
                    .memberships
                    .retain(|m| !(m.user_id == user_id && m.segment_id == segment_id)),
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> MembershipResult<()> {
        Ok(())
    }
}

#[async_trait]
impl BaseUserDirectory for InMemoryStore {
    async fn create_user(&self) -> MembershipResult<User> {
        let user = User {
            id: UserId::new(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().users.push(user.clone());
        Ok(user)
    }

    async fn user_exists(&self, user_id: UserId) -> MembershipResult<bool> {
        Ok(self.state.lock().unwrap().users.iter().any(|u| u.id == user_id))
    }
}

#[async_trait]
impl BaseSegmentDirectory for InMemoryStore {
    async fn create_segment(
        &self,
        slug: &str,
        auto_add: bool,
        auto_pct: i32,
    ) -> MembershipResult<Segment> {
        let mut state = self.state.lock().unwrap();
        if state.segments.iter().any(|s| s.slug == slug) {
            return Err(MembershipError::Conflict(format!("segment \"{}\"", slug)));
        }
        let segment = Segment {
            id: SegmentId::new(),
            slug: slug.to_string(),
            auto_add,
            auto_pct,
            created_at: Utc::now(),
        };
        state.segments.push(segment.clone());
        Ok(segment)
    }

    async fn resolve_slug(&self, slug: &str) -> MembershipResult<SegmentId> {
        self.state
            .lock()
            .unwrap()
            .segments
            .iter()
            .find(|s| s.slug == slug)
            .map(|s| s.id)
            .ok_or_else(|| MembershipError::not_found(format!("segment \"{}\"", slug)))
    }

    async fn delete_segment(&self, slug: &str) -> MembershipResult<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.segments.len();
        state.segments.retain(|s| s.slug != slug);
        Ok((before - state.segments.len()) as u64)
    }
}

#[async_trait]
impl BaseMembershipStore for InMemoryStore {
    async fn begin(&self) -> MembershipResult<Box<dyn BaseMembershipScope>> {
        self.state.lock().unwrap().begin_calls += 1;
        Ok(Box::new(MemoryScope {
            state: self.state.clone(),
            staged: Vec::new(),
        }))
    }

    async fn is_linked(&self, user_id: UserId, segment_id: SegmentId) -> MembershipResult<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .memberships
            .iter()
            .any(|m| m.user_id == user_id && m.segment_id == segment_id))
    }

    async fn list_segment_slugs(&self, user_id: UserId) -> MembershipResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| state.segments.iter().find(|s| s.id == m.segment_id))
            .map(|s| s.slug.clone())
            .collect())
    }

    async fn list_all_user_ids(&self) -> MembershipResult<Vec<UserId>> {
        Ok(self.user_ids())
    }
}

#[async_trait]
impl BaseHistoryLog for InMemoryStore {
    async fn append(
        &self,
        user_id: UserId,
        segment_id: SegmentId,
        operation: MembershipOperation,
        timestamp: DateTime<Utc>,
    ) -> MembershipResult<()> {
        let mut state = self.state.lock().unwrap();
        state.append_calls += 1;
        if matches!(state.failures.history_after, Some(limit) if state.append_calls > limit) {
            return Err(injected("history append"));
        }
        state.history.push(MemoryHistoryRow {
            user_id,
            segment_id,
            operation,
            timestamp,
        });
        Ok(())
    }

    async fn query_by_period(&self, year: i32, month: u32) -> MembershipResult<Vec<HistoryEntry>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter(|row| row.timestamp.year() == year && row.timestamp.month() == month)
            .filter_map(|row| {
                let segment = state.segments.iter().find(|s| s.id == row.segment_id)?;
                Some(HistoryEntry {
                    user_id: row.user_id,
                    segment_slug: segment.slug.clone(),
                    operation: row.operation,
                    timestamp: row.timestamp,
                })
            })
            .collect();
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}
