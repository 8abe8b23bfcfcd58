use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::endpoints::{chat, courses, grades, preferences, status};
use crate::types::RelayState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The relay state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<RelayState>) -> Router {
    let preferences_router = Router::new()
        .route("/preferences/available", get(preferences::get_available))
        .route("/preferences/:recipient", get(preferences::get_preferences))
        .route("/preferences/:recipient/add", post(preferences::post_add))
        .route("/preferences/:recipient/remove", post(preferences::post_remove));

    let courses_router = Router::new()
        .route("/classes", get(courses::get_classes))
        .route("/classes/sync", post(courses::post_sync))
        .route("/classes/:course_id/grade", get(courses::get_class_grade));

    let grades_router = Router::new()
        .route("/gpa", get(grades::get_gpa))
        .route("/assignments/upcoming", get(grades::get_upcoming))
        .route("/grades/recent", get(grades::get_recent));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/status", get(status::get_status))
        .route("/commands", post(chat::post_command))
        .route("/menu/:session", post(chat::post_menu_action))
        .merge(preferences_router)
        .merge(courses_router)
        .merge(grades_router)
        .with_state(app_state)
}
