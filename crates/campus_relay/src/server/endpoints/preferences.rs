use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::preferences::{normalize_tags, Category};
use crate::types::RelayState;

#[derive(Debug, Deserialize)]
pub struct CategoriesRequest {
    pub categories: Vec<String>,
}

fn preferences_body(recipient: &str, categories: &BTreeSet<Category>, ignored: Vec<String>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "recipient": recipient,
            "categories": categories,
            "ignored": ignored,
        })),
    )
        .into_response()
}

/// GET /preferences/available
pub async fn get_available() -> Response {
    (StatusCode::OK, Json(Category::ALL)).into_response()
}

/// GET /preferences/:recipient
pub async fn get_preferences(
    Path(recipient): Path<String>,
    State(s): State<Arc<RelayState>>,
) -> Response {
    let categories = s.preferences.get(&recipient);
    preferences_body(&recipient, &categories, Vec::new())
}

/// POST /preferences/:recipient/add
pub async fn post_add(
    Path(recipient): Path<String>,
    State(s): State<Arc<RelayState>>,
    Json(request): Json<CategoriesRequest>,
) -> Response {
    info!("POST /preferences/:recipient/add ({:?})", request.categories);

    let (_, ignored) = normalize_tags(&request.categories);
    let categories = s.preferences.add(&recipient, &request.categories);
    preferences_body(&recipient, &categories, ignored)
}

/// POST /preferences/:recipient/remove
pub async fn post_remove(
    Path(recipient): Path<String>,
    State(s): State<Arc<RelayState>>,
    Json(request): Json<CategoriesRequest>,
) -> Response {
    info!("POST /preferences/:recipient/remove ({:?})", request.categories);

    let (_, ignored) = normalize_tags(&request.categories);
    let categories = s.preferences.remove(&recipient, &request.categories);
    preferences_body(&recipient, &categories, ignored)
}
