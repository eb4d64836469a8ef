use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

static INCLUDE_DETAILS: AtomicBool = AtomicBool::new(true);

/// Controls whether 500 responses carry the underlying error text. Turned off
/// for production deployments at startup.
pub fn set_include_details(include: bool) {
    INCLUDE_DETAILS.store(include, Ordering::Relaxed);
}

/// Error type returned by every API handler, rendered as `{"error": ...}` with
/// the matching HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    /// Upstream AI failure with a message already safe to show to users.
    #[error("{0}")]
    Ai(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn ai(err: anyhow::Error) -> Self {
        Self::Ai(format!("{err:#}"))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { error: msg, details: None },
            ),
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody { error: msg, details: None },
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody { error: msg, details: None },
            ),
            ApiError::Ai(msg) => {
                tracing::error!("AI request failed: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { error: msg, details: None },
                )
            }
            ApiError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                let details = INCLUDE_DETAILS
                    .load(Ordering::Relaxed)
                    .then(|| format!("{err:#}"));
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { error: "Internal server error".into(), details },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let resp = ApiError::bad_request("Answers are required").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = ApiError::not_found("Quiz not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = ApiError::unauthorized("Authentication required").into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_errors_map_to_500() {
        let resp = ApiError::from(anyhow::anyhow!("db gone")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
