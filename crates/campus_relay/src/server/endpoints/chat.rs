//! Entry points for a chat front-end: free-text commands and menu clicks.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::commands::{self, Command};
use crate::menu::{self, MenuAction};
use crate::server::types::ApiErrorType;
use crate::types::RelayState;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub invoker: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MenuRequest {
    pub recipient: String,
    pub action: MenuAction,
}

/// POST /commands
pub async fn post_command(
    State(s): State<Arc<RelayState>>,
    Json(request): Json<CommandRequest>,
) -> Response {
    let Some(command) = Command::parse(&request.text) else {
        return ApiErrorType::from((
            StatusCode::BAD_REQUEST,
            "Not a command",
            Some("Commands start with `!`; try `!help`".to_string()),
        ))
        .into_response();
    };

    let reply = commands::execute(&s, &request.invoker, command).await;
    (StatusCode::OK, Json(json!({ "reply": reply }))).into_response()
}

/// POST /menu/:session
pub async fn post_menu_action(
    Path(session): Path<String>,
    State(s): State<Arc<RelayState>>,
    Json(request): Json<MenuRequest>,
) -> Response {
    info!("POST /menu/:session ({:?})", request.action);

    let reply = menu::handle(&s, &session, &request.recipient, request.action).await;
    (StatusCode::OK, Json(reply)).into_response()
}
