use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    error::ApiError,
    progress::{self, ProgressEntry, UserStats},
    state::AppState,
};

use super::MessageResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    pub progress: HashMap<i64, ProgressEntry>,
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "/progress",
    method(get),
    responses(
        (status = 200, description = "Per-lesson progress keyed by lesson id", body = ProgressResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_progress(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProgressResponse>, ApiError> {
    let map = progress::progress_map(&state.database, user_id).await?;
    Ok(Json(ProgressResponse { progress: map }))
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "/stats",
    method(get),
    responses(
        (status = 200, description = "Aggregate learning statistics", body = UserStats),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserStats>, ApiError> {
    let stats = progress::user_stats(&state.database, user_id).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "/lesson/{lesson_id}/access",
    method(post),
    responses(
        (status = 200, description = "Access recorded", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn track_access(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    progress::track_access(&state.database, user_id, lesson_id).await?;
    Ok(Json(MessageResponse {
        message: "Progress tracked",
    }))
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "/lesson/{lesson_id}/complete",
    method(post),
    responses(
        (status = 200, description = "Lesson completed", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn mark_completed(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    progress::mark_completed(&state.database, user_id, lesson_id).await?;
    Ok(Json(MessageResponse {
        message: "Lesson marked as completed",
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/progress",
        Router::new()
            .route("/progress", get(get_progress))
            .route("/stats", get(get_stats))
            .route("/lesson/{lesson_id}/access", post(track_access))
            .route("/lesson/{lesson_id}/complete", post(mark_completed)),
    )
}
