use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    ai::{ReviewAnalysis, ReviewSuggestion},
    auth::AuthUser,
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub code: Option<String>,
    /// Defaults to `html`.
    pub language: Option<String>,
}

#[utoipa::path(
    context_path = "/api/code-review",
    path = "/review",
    method(post),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Structured review with score and suggestions", body = ReviewAnalysis),
        (status = 400, description = "Missing code"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn review_code(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<ReviewAnalysis>, ApiError> {
    let Some(code) = req.code.filter(|c| !c.is_empty()) else {
        return Err(ApiError::bad_request("Code is required"));
    };
    // whitespace-only code gets a canned perfect score instead of an AI call
    if code.trim().is_empty() {
        return Ok(Json(ReviewAnalysis::empty_editor()));
    }
    let language = req.language.as_deref().unwrap_or("html");
    let analysis = state
        .ai
        .review_code(&code, language)
        .await
        .map_err(ApiError::ai)?;
    Ok(Json(analysis))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SuggestionsRequest {
    pub code: Option<String>,
    /// The issue the student wants addressed.
    pub issue: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<ReviewSuggestion>,
}

#[utoipa::path(
    context_path = "/api/code-review",
    path = "/suggestions",
    method(post),
    request_body = SuggestionsRequest,
    responses(
        (status = 200, description = "Suggestions focused on the named issue", body = SuggestionsResponse),
        (status = 400, description = "Missing code or issue"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_suggestions(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<SuggestionsRequest>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let (Some(code), Some(issue)) = (
        req.code.filter(|c| !c.is_empty()),
        req.issue.filter(|i| !i.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Code and issue are required"));
    };
    let language = req.language.as_deref().unwrap_or("html");
    let suggestions = state
        .ai
        .suggest_fixes(&code, &issue, language)
        .await
        .map_err(ApiError::ai)?;
    Ok(Json(SuggestionsResponse { suggestions }))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/code-review",
        Router::new()
            .route("/review", post(review_code))
            .route("/suggestions", post(get_suggestions)),
    )
}
