use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::Date;
use utoipa::ToSchema;

use crate::{
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    state::AppState,
    streaks::{self, BadgeRow, ChallengeRow},
    utils::today_utc,
};

/// Today's challenge with the caller's completion state folded in.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeStatus {
    #[serde(flatten)]
    pub challenge: ChallengeRow,
    pub completed: bool,
}

/// Everything the streak widget renders in one round trip.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreakOverview {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub total_days_active: i32,
    pub last_activity_date: Option<Date>,
    pub today_activity_count: i64,
    pub today_challenge: Option<ChallengeStatus>,
    pub badges: Vec<BadgeRow>,
    pub is_active_today: bool,
}

#[utoipa::path(
    context_path = "/api/streak",
    path = "/",
    method(get),
    responses(
        (status = 200, description = "Streak counters, badges and today's challenge", body = StreakOverview),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_streak(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StreakOverview>, ApiError> {
    let today = today_utc();
    let mut streak = streaks::get_or_create_streak(&state.database, user_id).await?;
    streaks::zero_stale_streak(&state.database, user_id, &mut streak, today).await?;

    let today_activity_count =
        streaks::today_activity_count(&state.database, user_id, today).await?;
    let today_challenge = match streaks::challenge_for_date(&state.database, today).await? {
        Some(challenge) => {
            let completed =
                streaks::is_challenge_completed(&state.database, user_id, challenge.id).await?;
            Some(ChallengeStatus {
                challenge,
                completed,
            })
        }
        None => None,
    };
    let badges = streaks::list_badges(&state.database, user_id).await?;

    Ok(Json(StreakOverview {
        current_streak: streak.current_streak,
        longest_streak: streak.longest_streak,
        total_days_active: streak.total_days_active,
        last_activity_date: streak.last_activity_date,
        today_activity_count,
        today_challenge,
        badges,
        is_active_today: today_activity_count > 0,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    /// For example `lesson`, `quiz` or `practice`.
    pub activity_type: Option<String>,
    pub activity_id: Option<i64>,
    #[serde(default)]
    pub points: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_earned: Option<i32>,
}

#[utoipa::path(
    context_path = "/api/streak",
    path = "/activity",
    method(post),
    request_body = ActivityRequest,
    responses(
        (status = 200, description = "Activity recorded, or a same-day duplicate", body = ActivityResponse),
        (status = 400, description = "Missing activity type"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn record_activity(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<ActivityRequest>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let Some(activity_type) = req.activity_type.filter(|t| !t.is_empty()) else {
        return Err(ApiError::bad_request("Activity type is required"));
    };
    let today = today_utc();
    let points = req.points.unwrap_or(0);

    let inserted = streaks::record_daily_activity(
        &state.database,
        user_id,
        today,
        &activity_type,
        req.activity_id,
        points,
    )
    .await?;
    if !inserted {
        return Ok(Json(ActivityResponse {
            message: "Activity already recorded today",
            points_earned: None,
        }));
    }

    let streak = streaks::advance_streak(&state.database, user_id, today).await?;
    streaks::award_new_badges(&state.database, user_id, &streak).await?;

    Ok(Json(ActivityResponse {
        message: "Activity recorded",
        points_earned: Some(points),
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteChallengeRequest {
    pub challenge_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeCompletionResponse {
    pub message: &'static str,
    pub points_earned: i32,
}

#[utoipa::path(
    context_path = "/api/streak",
    path = "/challenge/complete",
    method(post),
    request_body = CompleteChallengeRequest,
    responses(
        (status = 200, description = "Challenge completed, or already was", body = ChallengeCompletionResponse),
        (status = 400, description = "Missing challenge id"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such challenge")
    )
)]
pub async fn complete_challenge(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CompleteChallengeRequest>,
) -> Result<Json<ChallengeCompletionResponse>, ApiError> {
    let Some(challenge_id) = req.challenge_id else {
        return Err(ApiError::bad_request("Challenge ID is required"));
    };
    let Some(challenge) = streaks::challenge_by_id(&state.database, challenge_id).await? else {
        return Err(ApiError::not_found("Challenge not found"));
    };
    if streaks::is_challenge_completed(&state.database, user_id, challenge_id).await? {
        return Ok(Json(ChallengeCompletionResponse {
            message: "Challenge already completed",
            points_earned: challenge.points_reward,
        }));
    }

    streaks::record_challenge_completion(
        &state.database,
        user_id,
        challenge_id,
        challenge.points_reward,
    )
    .await?;
    let today = today_utc();
    streaks::record_daily_activity(
        &state.database,
        user_id,
        today,
        "challenge",
        Some(challenge_id),
        challenge.points_reward,
    )
    .await?;
    let streak = streaks::advance_streak(&state.database, user_id, today).await?;
    streaks::award_new_badges(&state.database, user_id, &streak).await?;

    Ok(Json(ChallengeCompletionResponse {
        message: "Challenge completed",
        points_earned: challenge.points_reward,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayChallengeResponse {
    pub challenge: Option<ChallengeRow>,
    pub completed: bool,
}

#[utoipa::path(
    context_path = "/api/streak",
    path = "/challenge/today",
    method(get),
    responses(
        (status = 200, description = "Today's challenge, minted on first request", body = TodayChallengeResponse)
    )
)]
pub async fn today_challenge(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
) -> Result<Json<TodayChallengeResponse>, ApiError> {
    let today = today_utc();
    let challenge = streaks::get_or_create_today_challenge(&state.database, today).await?;
    let completed = match (&challenge, user_id) {
        (Some(challenge), Some(user_id)) => {
            streaks::is_challenge_completed(&state.database, user_id, challenge.id).await?
        }
        _ => false,
    };
    Ok(Json(TodayChallengeResponse {
        challenge,
        completed,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/streak",
        Router::new()
            .route("/", get(get_streak))
            .route("/activity", post(record_activity))
            .route("/challenge/complete", post(complete_challenge))
            .route("/challenge/today", get(today_challenge)),
    )
}
