//! Percentage-based auto-enrollment, run once when a segment is created.
//!
//! The permutation source is always passed in; production builds a fresh
//! `StdRng` per request and tests seed one.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::common::{MembershipResult, UserId};
use crate::domains::segments::models::Segment;
use crate::kernel::ServerDeps;

use super::transition::{transition, Transition};

/// `floor(total * pct / 100)`, never rounded
pub fn enrollment_count(total: usize, auto_pct: i32) -> usize {
    let pct = auto_pct.clamp(0, 100) as usize;
    total * pct / 100
}

/// Auto-enrolled memberships last `auto_pct` days
pub fn enrollment_expiry(auto_pct: i32, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(i64::from(auto_pct))
}

/// Shuffle `users` uniformly and keep the first `enrollment_count` of them
pub fn sample_users<R>(mut users: Vec<UserId>, auto_pct: i32, rng: &mut R) -> Vec<UserId>
where
    R: Rng + ?Sized,
{
    let count = enrollment_count(users.len(), auto_pct);
    users.shuffle(rng);
    users.truncate(count);
    users
}

/// Enroll a random share of existing users into a freshly created segment.
///
/// Each user gets a separate single-segment transition. The first failure
/// aborts; users enrolled before it stay enrolled. Returns how many users
/// were enrolled. Segments without `auto_add` enroll nobody.
pub async fn enroll_segment<R>(
    segment: &Segment,
    deps: &ServerDeps,
    rng: &mut R,
) -> MembershipResult<usize>
where
    R: Rng + ?Sized + Send,
{
    if !segment.auto_add {
        return Ok(0);
    }

    let users = deps.memberships.list_all_user_ids().await?;
    let total = users.len();
    let chosen = sample_users(users, segment.auto_pct, rng);
    let expires_at = enrollment_expiry(segment.auto_pct, Utc::now());

    debug!(
        slug = %segment.slug,
        auto_pct = segment.auto_pct,
        total,
        chosen = chosen.len(),
        "auto-enrolling users"
    );

    for user_id in &chosen {
        transition(&Transition::new(*user_id, expires_at).add(segment.id), deps).await?;
    }

    info!(slug = %segment.slug, enrolled = chosen.len(), total, "auto-enrollment complete");

    Ok(chosen.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{BaseSegmentDirectory, InMemoryStore};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn count_is_floored() {
        assert_eq!(enrollment_count(10, 100), 10);
        assert_eq!(enrollment_count(10, 0), 0);
        assert_eq!(enrollment_count(3, 50), 1);
        assert_eq!(enrollment_count(7, 99), 6);
        assert_eq!(enrollment_count(1, 99), 0);
    }

    #[test]
    fn expiry_is_pct_days_out() {
        let now = Utc::now();
        assert_eq!(enrollment_expiry(30, now), now + Duration::days(30));
        assert_eq!(enrollment_expiry(0, now), now);
    }

    #[test]
    fn sample_is_a_subset_without_repeats() {
        let users: Vec<UserId> = (0..20).map(|_| UserId::new()).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let chosen = sample_users(users.clone(), 25, &mut rng);

        assert_eq!(chosen.len(), 5);
        let unique: HashSet<_> = chosen.iter().collect();
        assert_eq!(unique.len(), 5);
        assert!(chosen.iter().all(|id| users.contains(id)));
    }

    #[test]
    fn same_seed_same_sample() {
        let users: Vec<UserId> = (0..50).map(|_| UserId::new()).collect();

        let a = sample_users(users.clone(), 40, &mut StdRng::seed_from_u64(42));
        let b = sample_users(users, 40, &mut StdRng::seed_from_u64(42));

        assert_eq!(a, b);
    }

    #[test]
    fn every_user_can_be_picked() {
        let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = HashSet::new();

        for _ in 0..200 {
            seen.extend(sample_users(users.clone(), 25, &mut rng));
        }

        assert_eq!(seen.len(), users.len());
    }

    #[tokio::test]
    async fn full_percentage_enrolls_everyone_and_logs_each() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        store.seed_users(8);
        let segment = store.create_segment("all", true, 100).await.unwrap();

        let enrolled = enroll_segment(&segment, &deps, &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();

        assert_eq!(enrolled, 8);
        assert_eq!(store.memberships().len(), 8);
        assert_eq!(store.history().len(), 8);
    }

    #[tokio::test]
    async fn zero_percentage_enrolls_nobody() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        store.seed_users(8);
        let segment = store.create_segment("none", true, 0).await.unwrap();

        let enrolled = enroll_segment(&segment, &deps, &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();

        assert_eq!(enrolled, 0);
        assert!(store.memberships().is_empty());
    }

    #[tokio::test]
    async fn memberships_expire_after_pct_days() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        store.seed_users(4);
        let segment = store.create_segment("half", true, 50).await.unwrap();
        let before = Utc::now();

        enroll_segment(&segment, &deps, &mut StdRng::seed_from_u64(9))
            .await
            .unwrap();

        let rows = store.memberships();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert!(row.expires_at >= before + Duration::days(50));
            assert!(row.expires_at <= Utc::now() + Duration::days(50));
        }
    }

    #[tokio::test]
    async fn auto_add_off_skips_sampling() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        store.seed_users(4);
        let segment = store.create_segment("manual", false, 100).await.unwrap();

        let enrolled = enroll_segment(&segment, &deps, &mut StdRng::seed_from_u64(0))
            .await
            .unwrap();

        assert_eq!(enrolled, 0);
        assert_eq!(store.begin_calls(), 0);
    }

    #[tokio::test]
    async fn failure_keeps_users_enrolled_before_it() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        store.seed_users(5);
        let segment = store.create_segment("flaky", true, 100).await.unwrap();
        store.fail_insert_call(3);

        let err = enroll_segment(&segment, &deps, &mut StdRng::seed_from_u64(5))
            .await
            .unwrap_err();

        assert!(err.is_storage());
        assert_eq!(store.memberships().len(), 2);
        assert_eq!(store.history().len(), 2);
    }
}
