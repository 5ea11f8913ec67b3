use rand::Rng;
use tracing::info;

use crate::common::{MembershipError, MembershipResult};
use crate::domains::memberships::actions::enroll_segment;
use crate::domains::segments::models::Segment;
use crate::kernel::ServerDeps;

/// Segment as created, with how many users were auto-enrolled
#[derive(Debug, Clone)]
pub struct CreatedSegment {
    pub segment: Segment,
    pub enrolled: usize,
}

/// Create a segment and, when `auto_add` is set, run auto-enrollment.
///
/// If enrollment fails part way the segment and the users enrolled so far
/// are kept; the error is still returned.
pub async fn create_segment<R>(
    slug: &str,
    auto_add: bool,
    auto_pct: i32,
    deps: &ServerDeps,
    rng: &mut R,
) -> MembershipResult<CreatedSegment>
where
    R: Rng + ?Sized + Send,
{
    if slug.trim().is_empty() {
        return Err(MembershipError::invalid("slug must not be empty"));
    }
    if !(0..=100).contains(&auto_pct) {
        return Err(MembershipError::invalid(format!(
            "auto_pct must be between 0 and 100, got {}",
            auto_pct
        )));
    }

    let segment = deps.segments.create_segment(slug, auto_add, auto_pct).await?;
    info!(slug = %segment.slug, segment_id = %segment.id, auto_add, auto_pct, "segment created");

    let enrolled = enroll_segment(&segment, deps, rng).await?;

    Ok(CreatedSegment { segment, enrolled })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::memberships::actions::{update_user_segments, SegmentUpdate, SlugOutcome};
    use crate::kernel::{BaseSegmentDirectory, InMemoryStore};
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test]
    async fn duplicate_slug_conflicts() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let mut rng = StdRng::seed_from_u64(0);

        create_segment("vip", false, 0, &deps, &mut rng).await.unwrap();
        let err = create_segment("vip", false, 0, &deps, &mut rng)
            .await
            .unwrap_err();

        assert!(matches!(err, MembershipError::Conflict(_)));
    }

    #[tokio::test]
    async fn slug_is_stored_verbatim() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let user = store.seed_users(1)[0];
        let mut rng = StdRng::seed_from_u64(0);

        let created = create_segment(" vip ", false, 0, &deps, &mut rng).await.unwrap();
        assert_eq!(created.segment.slug, " vip ");
        assert!(store.resolve_slug("vip").await.is_err());

        let outcomes = update_user_segments(
            &SegmentUpdate {
                user_id: user,
                segments_to_add: vec![" vip ".to_string()],
                segments_to_remove: vec![],
                expires_at: Utc::now() + Duration::days(1),
            },
            &deps,
        )
        .await
        .unwrap();
        assert_eq!(outcomes, vec![SlugOutcome::Added(" vip ".to_string())]);
    }

    #[tokio::test]
    async fn blank_slug_is_invalid() {
        let store = InMemoryStore::new();
        let mut rng = StdRng::seed_from_u64(0);

        let err = create_segment("   ", false, 0, &store.deps(), &mut rng)
            .await
            .unwrap_err();

        assert!(matches!(err, MembershipError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn out_of_range_percentage_is_invalid() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        let mut rng = StdRng::seed_from_u64(0);

        for pct in [-1, 101] {
            let err = create_segment("vip", true, pct, &deps, &mut rng)
                .await
                .unwrap_err();
            assert!(matches!(err, MembershipError::InvalidInput(_)));
        }
        assert!(store.resolve_slug("vip").await.is_err());
    }

    #[tokio::test]
    async fn auto_add_enrolls_share_of_existing_users() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        store.seed_users(10);

        let created = create_segment("promo", true, 30, &deps, &mut StdRng::seed_from_u64(11))
            .await
            .unwrap();

        assert_eq!(created.enrolled, 3);
        assert_eq!(store.memberships().len(), 3);
        assert!(store
            .memberships()
            .iter()
            .all(|m| m.segment_id == created.segment.id));
    }

    #[tokio::test]
    async fn failed_enrollment_keeps_segment() {
        let store = InMemoryStore::new();
        let deps = store.deps();
        store.seed_users(3);
        store.fail_insert_call(1);

        let err = create_segment("promo", true, 100, &deps, &mut StdRng::seed_from_u64(0))
            .await
            .unwrap_err();

        assert!(err.is_storage());
        assert!(store.resolve_slug("promo").await.is_ok());
        assert!(store.memberships().is_empty());
    }
}
