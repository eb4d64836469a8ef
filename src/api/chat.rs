use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{ai::ChatTurn, error::ApiError, state::AppState, utils::now_rfc3339};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: Option<String>,
    /// Prior turns of the conversation, oldest first.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
    pub timestamp: String,
}

#[utoipa::path(
    context_path = "/api",
    path = "/chat",
    method(post),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Tutor reply", body = ChatResponse),
        (status = 400, description = "Empty message")
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }
    let response = state
        .ai
        .chat(message, &req.history)
        .await
        .map_err(ApiError::ai)?;
    Ok(Json(ChatResponse {
        response,
        timestamp: now_rfc3339(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}
