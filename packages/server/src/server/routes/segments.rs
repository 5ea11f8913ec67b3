//! Segment routes: creation (with auto-enrollment), deletion, per-user listing.

use axum::{
    extract::{Extension, Query},
    Json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::common::{MembershipError, MembershipResult, SegmentId};
use crate::domains::memberships::actions::user_segment_slugs;
use crate::domains::segments::actions::{create_segment, delete_segment};
use crate::server::app::AppState;

use super::users::parse_user_id;

#[derive(Deserialize)]
pub struct CreateSegmentRequest {
    pub slug: String,
    #[serde(default)]
    pub auto_add: bool,
    #[serde(default)]
    pub auto_pct: i32,
}

#[derive(Serialize)]
pub struct CreateSegmentResponse {
    pub message: String,
    pub segment_id: SegmentId,
    pub enrolled: usize,
}

/// POST /segments/create
pub async fn create_segment_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<CreateSegmentRequest>,
) -> MembershipResult<Json<CreateSegmentResponse>> {
    let mut rng = StdRng::from_entropy();
    let created = create_segment(
        &request.slug,
        request.auto_add,
        request.auto_pct,
        &state.deps,
        &mut rng,
    )
    .await?;

    Ok(Json(CreateSegmentResponse {
        message: "Segment created".to_string(),
        segment_id: created.segment.id,
        enrolled: created.enrolled,
    }))
}

#[derive(Deserialize)]
pub struct SlugQuery {
    pub slug: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// DELETE /segments/delete?slug=vip
pub async fn delete_segment_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<SlugQuery>,
) -> MembershipResult<Json<MessageResponse>> {
    let slug = query
        .slug
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| MembershipError::invalid("Missing 'slug' parameter"))?;

    delete_segment(&slug, &state.deps).await?;

    Ok(Json(MessageResponse {
        message: "Segment deleted".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct UserSegmentsResponse {
    pub segments: Vec<String>,
}

/// GET /segments/user-segments?user_id=...
pub async fn user_segments_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<UserQuery>,
) -> MembershipResult<Json<UserSegmentsResponse>> {
    let user_id = parse_user_id(query.user_id.as_deref().unwrap_or_default())?;
    let segments = user_segment_slugs(user_id, &state.deps).await?;
    Ok(Json(UserSegmentsResponse { segments }))
}
