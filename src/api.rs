pub mod auth;
pub mod chat;
pub mod code_review;
pub mod debug;
pub mod lessons;
pub mod progress;
pub mod quizzes;
pub mod streaks;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};

use crate::{error::ApiError, state::AppState};

#[derive(OpenApi)]
#[openapi(paths(
    health,
    auth::signup,
    auth::login,
    auth::profile,
    lessons::list_lessons,
    lessons::get_lesson,
    lessons::explain_line,
    lessons::generate_quiz,
    quizzes::get_quiz,
    quizzes::submit_quiz,
    quizzes::quiz_history,
    quizzes::quiz_attempts,
    chat::chat,
    debug::debug_code,
    code_review::review_code,
    code_review::get_suggestions,
    progress::get_progress,
    progress::get_stats,
    progress::track_access,
    progress::mark_completed,
    streaks::get_streak,
    streaks::record_activity,
    streaks::complete_challenge,
    streaks::today_challenge,
))]
pub struct ApiDoc;

pub fn openapi_json() -> String {
    ApiDoc::openapi().to_pretty_json().unwrap_or_default()
}

/// Fixed-message response used by tracking and gamification endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[utoipa::path(
    context_path = "/api",
    path = "/health",
    method(get),
    responses((status = 200, description = "Liveness check", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Luno API is running",
    })
}

async fn openapi_doc() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);
    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!("FRONTEND_URL is not a valid CORS origin: {e}"),
    }
    cors
}

/// The whole application: every feature router under `/api`, the OpenAPI
/// document, and a JSON 404 for everything else.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_url);
    let api = Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(lessons::router())
        .merge(quizzes::router())
        .merge(chat::router())
        .merge(debug::router())
        .merge(code_review::router())
        .merge(progress::router())
        .merge(streaks::router());
    Router::new()
        .nest("/api", api)
        .route("/api-docs/openapi.json", get(openapi_doc))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
