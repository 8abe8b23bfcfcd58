use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::types::RelayState;

/// GET /health
pub async fn get_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// GET /status
///
/// Uptime, course cache state and per-feed dispatch totals.
pub async fn get_status(State(s): State<Arc<RelayState>>) -> Response {
    let now = s.clock.now();

    (
        StatusCode::OK,
        Json(json!({
            "started_at": s.started_at,
            "uptime_secs": (now - s.started_at).num_seconds().max(0),
            "courses_cached": s.directory.list_ids().len(),
            "courses_synced_at": s.directory.synced_at(),
            "recipients_with_preferences": s.preferences.len(),
            "open_menu_sessions": s.menus.len(),
            "feeds": s.dispatcher.statuses(),
        })),
    )
        .into_response()
}
