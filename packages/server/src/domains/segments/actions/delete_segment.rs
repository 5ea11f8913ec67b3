use tracing::info;

use crate::common::{MembershipError, MembershipResult};
use crate::kernel::ServerDeps;

/// Delete a segment by slug. Unknown slugs are not an error.
///
/// Memberships and history rows that reference the segment are kept; they
/// stop showing up in slug listings and reports because those join on
/// `segments`.
pub async fn delete_segment(slug: &str, deps: &ServerDeps) -> MembershipResult<u64> {
    if slug.trim().is_empty() {
        return Err(MembershipError::invalid("slug must not be empty"));
    }

    let removed = deps.segments.delete_segment(slug).await?;
    info!(slug = %slug, removed, "segment deleted");
    Ok(removed)
}
