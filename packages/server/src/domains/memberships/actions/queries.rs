use crate::common::{MembershipResult, UserId};
use crate::kernel::ServerDeps;

/// Slugs of every segment the user is linked to (duplicates kept)
pub async fn user_segment_slugs(
    user_id: UserId,
    deps: &ServerDeps,
) -> MembershipResult<Vec<String>> {
    deps.memberships.list_segment_slugs(user_id).await
}
