use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use utoipa::ToSchema;

use crate::{
    ai::QuestionOptions,
    auth::AuthUser,
    error::ApiError,
    progress,
    quizzes::{self, AnswerResult, AttemptRow, HistoryRow, QuizRow, percentage, score_answers},
    state::AppState,
};

const COMPLETION_THRESHOLD_PERCENT: i32 = 80;

/// Question as shown while taking a quiz: no correct answer, no explanation.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: QuestionOptions,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: QuizRow,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizResponse {
    pub quiz: QuizDetail,
}

#[utoipa::path(
    context_path = "/api/quiz",
    path = "/{id}",
    method(get),
    responses(
        (status = 200, description = "Quiz with its questions, answer key withheld", body = QuizResponse),
        (status = 404, description = "Quiz not found")
    )
)]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
) -> Result<Json<QuizResponse>, ApiError> {
    let Some(quiz) = quizzes::get_quiz(&state.database, quiz_id).await? else {
        return Err(ApiError::not_found("Quiz not found"));
    };
    let questions = quizzes::get_questions(&state.database, quiz_id)
        .await?
        .into_iter()
        .map(|row| PublicQuestion {
            id: row.id,
            question: row.question_text,
            options: QuestionOptions {
                a: row.option_a,
                b: row.option_b,
                c: row.option_c,
                d: row.option_d,
            },
        })
        .collect();
    Ok(Json(QuizResponse {
        quiz: QuizDetail { quiz, questions },
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Question id (as a string key) to the chosen option letter.
    pub answers: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub score: i32,
    pub total_questions: i32,
    pub percentage: i32,
    pub results: Vec<AnswerResult>,
}

#[utoipa::path(
    context_path = "/api/quiz",
    path = "/{id}/submit",
    method(post),
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Graded submission", body = SubmitResponse),
        (status = 400, description = "Missing answers"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Quiz not found")
    )
)]
pub async fn submit_quiz(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(quiz_id): Path<i64>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Some(answers) = req.answers else {
        return Err(ApiError::bad_request("Answers are required"));
    };
    let questions = quizzes::get_questions(&state.database, quiz_id).await?;
    if questions.is_empty() {
        return Err(ApiError::not_found("Quiz not found"));
    }
    let (score, results) = score_answers(&questions, &answers);
    let total = questions.len() as i32;
    let answers_json = serde_json::to_string(&answers).map_err(anyhow::Error::from)?;
    quizzes::record_attempt(&state.database, user_id, quiz_id, score, total, &answers_json).await?;

    let percent = percentage(score, total);
    if percent >= COMPLETION_THRESHOLD_PERCENT {
        // passing the quiz completes the lesson; best effort only
        match quizzes::lesson_id_for_quiz(&state.database, quiz_id).await {
            Ok(Some(lesson_id)) => {
                if let Err(e) = progress::mark_completed(&state.database, user_id, lesson_id).await
                {
                    tracing::warn!("failed to mark lesson completed: {e:#}");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("failed to look up lesson for quiz {quiz_id}: {e:#}"),
        }
    }

    Ok(Json(SubmitResponse {
        score,
        total_questions: total,
        percentage: percent,
        results,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub quiz_id: i64,
    pub lesson_id: i64,
    pub lesson_title: String,
    pub quiz_title: Option<String>,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: i32,
    pub completed_at: PrimitiveDateTime,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            quiz_id: row.quiz_id,
            lesson_id: row.lesson_id,
            lesson_title: row.lesson_title,
            quiz_title: row.quiz_title,
            score: row.score,
            total_questions: row.total_questions,
            percentage: percentage(row.score, row.total_questions),
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

#[utoipa::path(
    context_path = "/api/quiz",
    path = "/history",
    method(get),
    responses(
        (status = 200, description = "Most recent 50 attempts across all quizzes", body = HistoryResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn quiz_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = quizzes::attempt_history(&state.database, user_id)
        .await?
        .into_iter()
        .map(HistoryEntry::from)
        .collect();
    Ok(Json(HistoryResponse { history }))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEntry {
    pub id: i64,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: i32,
    pub completed_at: PrimitiveDateTime,
    pub answers: serde_json::Value,
}

impl From<AttemptRow> for AttemptEntry {
    fn from(row: AttemptRow) -> Self {
        let answers = row
            .answers
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        Self {
            id: row.id,
            score: row.score,
            total_questions: row.total_questions,
            percentage: percentage(row.score, row.total_questions),
            completed_at: row.completed_at,
            answers,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttemptsResponse {
    pub attempts: Vec<AttemptEntry>,
}

#[utoipa::path(
    context_path = "/api/quiz",
    path = "/{id}/attempts",
    method(get),
    responses(
        (status = 200, description = "Most recent 10 attempts for this quiz", body = AttemptsResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn quiz_attempts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(quiz_id): Path<i64>,
) -> Result<Json<AttemptsResponse>, ApiError> {
    let attempts = quizzes::attempts_for_quiz(&state.database, user_id, quiz_id)
        .await?
        .into_iter()
        .map(AttemptEntry::from)
        .collect();
    Ok(Json(AttemptsResponse { attempts }))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/quiz",
        Router::new()
            .route("/history", get(quiz_history))
            .route("/{id}", get(get_quiz))
            .route("/{id}/submit", post(submit_quiz))
            .route("/{id}/attempts", get(quiz_attempts)),
    )
}
