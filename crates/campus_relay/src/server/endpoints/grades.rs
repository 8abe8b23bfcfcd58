use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::assignments::sort_by_due;
use crate::grading::{calculate_gpa, recent_grades};
use crate::server::types::ApiErrorType;
use crate::types::RelayState;

#[derive(Debug, Deserialize)]
pub struct UpcomingQueryParams {
    /// Sort by due date instead of API order
    #[serde(default)]
    pub sorted: bool,
    /// Only work that has not been turned in yet
    #[serde(default)]
    pub pending: bool,
}

/// GET /gpa
pub async fn get_gpa(State(s): State<Arc<RelayState>>) -> Response {
    let course_ids = s.directory.list_ids();

    match calculate_gpa(s.source.as_ref(), &course_ids).await {
        Some(summary) => (StatusCode::OK, Json(summary)).into_response(),
        None => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "No grades found",
            Some(format!("None of {} cached courses had a grade", course_ids.len())),
        ))
        .into_response(),
    }
}

/// GET /assignments/upcoming
///
/// Query parameters:
/// - `sorted` (optional): Set to `true` to order by due date
/// - `pending` (optional): Set to `true` to skip submitted work
pub async fn get_upcoming(
    State(s): State<Arc<RelayState>>,
    Query(params): Query<UpcomingQueryParams>,
) -> Response {
    info!(
        "GET /assignments/upcoming (sorted={}, pending={})",
        params.sorted, params.pending
    );

    let feed = if params.pending {
        s.assignments.clone().only_unsubmitted()
    } else {
        s.assignments.clone()
    };
    let mut upcoming = feed.upcoming(&s.directory.list_ids(), s.due_horizon).await;
    if params.sorted {
        sort_by_due(&mut upcoming);
    }
    let message = upcoming
        .is_empty()
        .then(|| format!("No assignments due in the next {} days", s.due_horizon.num_days()));

    (
        StatusCode::OK,
        Json(json!({ "assignments": upcoming, "message": message })),
    )
        .into_response()
}

/// GET /grades/recent
pub async fn get_recent(State(s): State<Arc<RelayState>>) -> Response {
    let recent = recent_grades(
        s.source.as_ref(),
        &s.directory.courses(),
        s.clock.now(),
        s.recent_horizon,
    )
    .await;
    let message = recent
        .is_empty()
        .then(|| format!("No grades posted in the last {} days", s.recent_horizon.num_days()));

    (StatusCode::OK, Json(json!({ "grades": recent, "message": message }))).into_response()
}
