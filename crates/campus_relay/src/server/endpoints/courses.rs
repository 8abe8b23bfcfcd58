use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::canvas::CourseId;
use crate::grading::current_grade;
use crate::server::types::ApiErrorType;
use crate::types::RelayState;

/// GET /classes
pub async fn get_classes(State(s): State<Arc<RelayState>>) -> Response {
    if !s.directory.is_synced() {
        return ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "No classes cached yet",
            Some("POST /classes/sync to populate the cache".to_string()),
        ))
        .into_response();
    }

    (
        StatusCode::OK,
        Json(json!({
            "synced_at": s.directory.synced_at(),
            "classes": s.directory.courses(),
        })),
    )
        .into_response()
}

/// POST /classes/sync
pub async fn post_sync(State(s): State<Arc<RelayState>>) -> Response {
    info!("POST /classes/sync");

    match s.directory.sync().await {
        Ok(count) => (StatusCode::OK, Json(json!({ "synced": count }))).into_response(),
        Err(e) => {
            error!("Failed to sync classes: {}", e);
            ApiErrorType::from((
                StatusCode::BAD_GATEWAY,
                "Failed to sync classes",
                Some(e.to_string()),
            ))
            .into_response()
        }
    }
}

/// GET /classes/:course_id/grade
pub async fn get_class_grade(
    Path(course_id): Path<CourseId>,
    State(s): State<Arc<RelayState>>,
) -> Response {
    let Some(name) = s.directory.name_for(course_id) else {
        warn!("Course not found: {}", course_id);
        return ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "Course not found",
            Some(format!("No cached course with ID: {}", course_id)),
        ))
        .into_response();
    };

    match current_grade(s.source.as_ref(), course_id).await {
        Ok(Some(grade)) => (
            StatusCode::OK,
            Json(json!({
                "course_id": course_id,
                "name": name,
                "letter": grade.letter,
                "percent": grade.percent,
            })),
        )
            .into_response(),
        Ok(None) => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "No grade data available",
            Some(format!("{} has no student enrollment with grades", name)),
        ))
        .into_response(),
        Err(e) => {
            error!("Failed to fetch grade for {}: {}", course_id, e);
            ApiErrorType::from((
                StatusCode::BAD_GATEWAY,
                "Failed to fetch grade",
                Some(e.to_string()),
            ))
            .into_response()
        }
    }
}
