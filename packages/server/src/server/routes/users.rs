//! User routes: creation, slug-based segment updates, history report.

use axum::{
    extract::{Extension, Query},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{MembershipError, MembershipResult, UserId};
use crate::domains::memberships::actions::{render_csv, report, update_user_segments, SegmentUpdate};
use crate::domains::users::actions::create_user;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub user_id: UserId,
}

/// POST /users/create
pub async fn create_user_handler(
    Extension(state): Extension<AppState>,
) -> MembershipResult<Json<CreateUserResponse>> {
    let user = create_user(&state.deps).await?;
    Ok(Json(CreateUserResponse { user_id: user.id }))
}

#[derive(Deserialize)]
pub struct UpdateSegmentsRequest {
    pub user_id: String,
    #[serde(default)]
    pub segments_to_add: Vec<String>,
    #[serde(default)]
    pub segments_to_remove: Vec<String>,
    /// RFC 3339 datetime
    pub expires_at: String,
}

#[derive(Serialize)]
pub struct MessagesResponse {
    pub message: Vec<String>,
}

/// POST /users/update-segments
///
/// Per-slug outcomes are returned as messages; only storage errors (and an
/// unknown user) fail the whole request.
pub async fn update_user_segments_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<UpdateSegmentsRequest>,
) -> MembershipResult<Json<MessagesResponse>> {
    let user_id = parse_user_id(&request.user_id)?;
    let expires_at = DateTime::parse_from_rfc3339(request.expires_at.trim())
        .map_err(|_| MembershipError::invalid("Invalid datetime format for expires_at"))?
        .with_timezone(&Utc);

    let update = SegmentUpdate {
        user_id,
        segments_to_add: request.segments_to_add,
        segments_to_remove: request.segments_to_remove,
        expires_at,
    };

    let outcomes = update_user_segments(&update, &state.deps).await?;

    Ok(Json(MessagesResponse {
        message: outcomes.iter().map(ToString::to_string).collect(),
    }))
}

#[derive(Deserialize)]
pub struct HistoryReportQuery {
    pub year: Option<String>,
    pub month: Option<String>,
}

/// GET /users/history-report?year=2023&month=8
pub async fn history_report_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<HistoryReportQuery>,
) -> MembershipResult<impl IntoResponse> {
    let year: i32 = query
        .year
        .as_deref()
        .and_then(|y| y.trim().parse().ok())
        .ok_or_else(|| MembershipError::invalid("Invalid year format"))?;
    let month: u32 = query
        .month
        .as_deref()
        .and_then(|m| m.trim().parse().ok())
        .ok_or_else(|| MembershipError::invalid("Invalid month format"))?;

    let entries = report(year, month, &state.deps).await?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=segment_history.csv",
            ),
        ],
        render_csv(&entries),
    ))
}

pub(crate) fn parse_user_id(raw: &str) -> MembershipResult<UserId> {
    UserId::parse(raw).map_err(|_| MembershipError::invalid("Invalid 'user_id' parameter"))
}
