//! Add/remove-by-slug workflow.
//!
//! Each resolved slug runs as its own single-segment transition. Unknown
//! slugs and removals of unlinked segments are recorded per item and skipped;
//! the first storage error stops the batch, leaving earlier items committed
//! and logged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::common::{MembershipError, MembershipResult, SegmentId, UserId};
use crate::kernel::ServerDeps;

use super::transition::{transition, Transition};

/// A batch of slug changes for one user
#[derive(Debug, Clone)]
pub struct SegmentUpdate {
    pub user_id: UserId,
    pub segments_to_add: Vec<String>,
    pub segments_to_remove: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Result of one requested slug
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "slug", rename_all = "snake_case")]
pub enum SlugOutcome {
    Added(String),
    Removed(String),
    Missing(String),
    NotLinked(String),
}

impl fmt::Display for SlugOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlugOutcome::Added(slug) => write!(f, "\"{}\" added successfully", slug),
            SlugOutcome::Removed(slug) => write!(f, "\"{}\" removed successfully", slug),
            SlugOutcome::Missing(slug) => write!(f, "\"{}\" doesn't exist", slug),
            SlugOutcome::NotLinked(slug) => write!(f, "\"{}\" is not linked to the user", slug),
        }
    }
}

/// Apply a slug batch: adds first, then removes, each in request order.
pub async fn update_user_segments(
    update: &SegmentUpdate,
    deps: &ServerDeps,
) -> MembershipResult<Vec<SlugOutcome>> {
    let user_id = update.user_id;

    if !deps.users.user_exists(user_id).await? {
        return Err(MembershipError::not_found(format!("user {}", user_id)));
    }

    let mut outcomes =
        Vec::with_capacity(update.segments_to_add.len() + update.segments_to_remove.len());

    for slug in &update.segments_to_add {
        let Some(segment_id) = resolve(slug, deps).await? else {
            outcomes.push(SlugOutcome::Missing(slug.clone()));
            continue;
        };

        transition(&Transition::new(user_id, update.expires_at).add(segment_id), deps).await?;
        outcomes.push(SlugOutcome::Added(slug.clone()));
    }

    for slug in &update.segments_to_remove {
        let Some(segment_id) = resolve(slug, deps).await? else {
            outcomes.push(SlugOutcome::Missing(slug.clone()));
            continue;
        };

        if !deps.memberships.is_linked(user_id, segment_id).await? {
            debug!(user_id = %user_id, slug = %slug, "skipping removal of unlinked segment");
            outcomes.push(SlugOutcome::NotLinked(slug.clone()));
            continue;
        }

        transition(&Transition::new(user_id, update.expires_at).remove(segment_id), deps).await?;
        outcomes.push(SlugOutcome::Removed(slug.clone()));
    }

    info!(user_id = %user_id, items = outcomes.len(), "user segments updated");

    Ok(outcomes)
}

/// `Ok(None)` for an unknown slug; storage errors propagate
async fn resolve(slug: &str, deps: &ServerDeps) -> MembershipResult<Option<SegmentId>> {
    match deps.segments.resolve_slug(slug).await {
        Ok(id) => Ok(Some(id)),
        Err(MembershipError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
