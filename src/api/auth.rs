use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{AuthUser, hash_password, issue_token, verify_password},
    error::ApiError,
    state::AppState,
    users::{self, UserInfo, UserProfile},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

#[utoipa::path(
    context_path = "/api/auth",
    path = "/signup",
    method(post),
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Missing fields, short password, or duplicate user")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(email), Some(password)) = (req.username, req.email, req.password)
    else {
        return Err(ApiError::bad_request("All fields are required"));
    };
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("All fields are required"));
    }
    if password.chars().count() < 6 {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters",
        ));
    }
    if users::is_taken(&state.database, &email, &username).await? {
        return Err(ApiError::bad_request(
            "User already exists with this email or username",
        ));
    }
    let password_hash = hash_password(&password)?;
    let user_id = users::create_user(&state.database, &username, &email, &password_hash).await?;
    let token = issue_token(
        user_id,
        state.config.jwt_secret.as_bytes(),
        time::Duration::days(state.config.jwt_expiry_days),
    )?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully",
            token,
            user: UserInfo {
                id: user_id,
                username,
                email,
            },
        }),
    ))
}

#[utoipa::path(
    context_path = "/api/auth",
    path = "/login",
    method(post),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    // one message for both unknown email and wrong password
    let Some(user) = users::find_by_email(&state.database, &email).await? else {
        return Err(ApiError::unauthorized("Invalid credentials"));
    };
    if !verify_password(&password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }
    let token = issue_token(
        user.id,
        state.config.jwt_secret.as_bytes(),
        time::Duration::days(state.config.jwt_expiry_days),
    )?;
    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: UserInfo {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}

#[utoipa::path(
    context_path = "/api/auth",
    path = "/profile",
    method(get),
    responses(
        (status = 200, description = "Current user", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Some(user) = users::find_profile(&state.database, user_id).await? else {
        return Err(ApiError::not_found("User not found"));
    };
    Ok(Json(ProfileResponse { user }))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/signup", post(signup))
            .route("/login", post(login))
            .route("/profile", get(profile)),
    )
}
