use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{auth::AuthUser, error::ApiError, state::AppState, utils::now_rfc3339};

#[derive(Debug, Deserialize, ToSchema)]
pub struct DebugRequest {
    pub code: Option<String>,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DebugResponse {
    pub suggestion: String,
    pub timestamp: String,
}

#[utoipa::path(
    context_path = "/api",
    path = "/debug",
    method(post),
    request_body = DebugRequest,
    responses(
        (status = 200, description = "Debugging help", body = DebugResponse),
        (status = 400, description = "Empty code"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn debug_code(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<DebugRequest>,
) -> Result<Json<DebugResponse>, ApiError> {
    let code = req.code.as_deref().map(str::trim).unwrap_or_default();
    if code.is_empty() {
        return Err(ApiError::bad_request("Code is required"));
    }
    let suggestion = state
        .ai
        .debug_code(code, req.error_message.as_deref().unwrap_or_default())
        .await
        .map_err(ApiError::ai)?;
    Ok(Json(DebugResponse {
        suggestion,
        timestamp: now_rfc3339(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/debug", post(debug_code))
}
