use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    ai::QuestionOptions,
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    lessons::{self, LessonLine, LessonSummary},
    progress, quizzes,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct LessonsResponse {
    pub lessons: Vec<LessonSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LessonDetail {
    #[serde(flatten)]
    pub lesson: LessonSummary,
    pub lines: Vec<LessonLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LessonResponse {
    pub lesson: LessonDetail,
}

#[utoipa::path(
    context_path = "/api/lesson",
    path = "/",
    method(get),
    responses((status = 200, description = "All lessons in course order", body = LessonsResponse))
)]
pub async fn list_lessons(
    State(state): State<AppState>,
) -> Result<Json<LessonsResponse>, ApiError> {
    let lessons = lessons::list_lessons(&state.database).await?;
    Ok(Json(LessonsResponse { lessons }))
}

#[utoipa::path(
    context_path = "/api/lesson",
    path = "/{id}",
    method(get),
    responses(
        (status = 200, description = "Lesson with its code lines", body = LessonResponse),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn get_lesson(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<LessonResponse>, ApiError> {
    let Some(lesson) = lessons::get_lesson(&state.database, lesson_id).await? else {
        return Err(ApiError::not_found("Lesson not found"));
    };
    let lines = lessons::get_lesson_lines(&state.database, lesson_id).await?;
    // viewing counts as progress, but tracking must never fail the request
    if let Some(user_id) = user_id {
        if let Err(e) = progress::track_access(&state.database, user_id, lesson_id).await {
            tracing::warn!("failed to track lesson access: {e:#}");
        }
    }
    Ok(Json(LessonResponse {
        lesson: LessonDetail { lesson, lines },
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExplainLineRequest {
    #[serde(rename = "lineId")]
    pub line_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExplanationResponse {
    pub explanation: String,
}

#[utoipa::path(
    context_path = "/api/lesson",
    path = "/{id}/explain-line",
    method(post),
    request_body = ExplainLineRequest,
    responses(
        (status = 200, description = "Explanation, cached after the first request", body = ExplanationResponse),
        (status = 400, description = "Missing line id"),
        (status = 404, description = "Line not in this lesson")
    )
)]
pub async fn explain_line(
    State(state): State<AppState>,
    Path(lesson_id): Path<i64>,
    Json(req): Json<ExplainLineRequest>,
) -> Result<Json<ExplanationResponse>, ApiError> {
    let Some(line_id) = req.line_id else {
        return Err(ApiError::bad_request("Line ID is required"));
    };
    if let Some(explanation) = state.explanation_cache.get(&line_id).await {
        return Ok(Json(ExplanationResponse { explanation }));
    }
    let Some(line) = lessons::get_line(&state.database, lesson_id, line_id).await? else {
        return Err(ApiError::not_found("Line not found"));
    };
    if let Some(explanation) = lessons::stored_explanation(&state.database, line_id).await? {
        state
            .explanation_cache
            .insert(line_id, explanation.clone())
            .await;
        return Ok(Json(ExplanationResponse { explanation }));
    }
    let context = lessons::line_context(&state.database, lesson_id, line.line_number).await?;
    let explanation = state
        .ai
        .explain_line(&line.code_content, &context)
        .await
        .map_err(ApiError::ai)?;
    lessons::store_explanation(&state.database, line_id, &explanation).await?;
    state
        .explanation_cache
        .insert(line_id, explanation.clone())
        .await;
    Ok(Json(ExplanationResponse { explanation }))
}

/// Question payload with the full answer key, as returned to the lesson page
/// that drives a freshly generated quiz.
#[derive(Debug, Serialize, ToSchema)]
pub struct FullQuestion {
    pub id: i64,
    pub question: String,
    pub options: QuestionOptions,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratedQuizPayload {
    pub id: i64,
    pub lesson_id: i64,
    pub questions: Vec<FullQuestion>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratedQuizResponse {
    pub quiz: GeneratedQuizPayload,
}

#[utoipa::path(
    context_path = "/api/lesson",
    path = "/{id}/generate-quiz",
    method(post),
    responses(
        (status = 200, description = "Existing or newly generated quiz", body = GeneratedQuizResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn generate_quiz(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<GeneratedQuizResponse>, ApiError> {
    if let Some(quiz_id) = quizzes::quiz_id_for_lesson(&state.database, lesson_id).await? {
        let questions = quizzes::get_questions(&state.database, quiz_id).await?;
        return Ok(Json(GeneratedQuizResponse {
            quiz: GeneratedQuizPayload {
                id: quiz_id,
                lesson_id,
                questions: questions.into_iter().map(full_question).collect(),
            },
        }));
    }

    let Some(lesson) = lessons::get_lesson(&state.database, lesson_id).await? else {
        return Err(ApiError::not_found("Lesson not found"));
    };
    let content = lessons::lesson_content(&state.database, lesson_id).await?;
    let generated = state
        .ai
        .generate_quiz(&lesson.title, &content)
        .await
        .map_err(ApiError::ai)?;

    let quiz_id = quizzes::create_quiz(
        &state.database,
        lesson_id,
        &format!("Quiz: {}", lesson.title),
        &format!("Test your knowledge of {}", lesson.title),
    )
    .await?;
    let mut questions = Vec::with_capacity(generated.questions.len());
    for (index, question) in generated.questions.iter().enumerate() {
        let question_id =
            quizzes::insert_question(&state.database, quiz_id, question, index as i32 + 1).await?;
        questions.push(FullQuestion {
            id: question_id,
            question: question.question.clone(),
            options: question.options.clone(),
            correct_answer: question.correct_answer.clone(),
            explanation: Some(question.explanation.clone()),
        });
    }
    Ok(Json(GeneratedQuizResponse {
        quiz: GeneratedQuizPayload {
            id: quiz_id,
            lesson_id,
            questions,
        },
    }))
}

fn full_question(row: quizzes::QuestionRow) -> FullQuestion {
    FullQuestion {
        id: row.id,
        question: row.question_text,
        options: QuestionOptions {
            a: row.option_a,
            b: row.option_b,
            c: row.option_c,
            d: row.option_d,
        },
        correct_answer: row.correct_answer,
        explanation: row.explanation,
    }
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/lesson",
        Router::new()
            .route("/", get(list_lessons))
            .route("/{id}", get(get_lesson))
            .route("/{id}/explain-line", post(explain_line))
            .route("/{id}/generate-quiz", post(generate_quiz)),
    )
}
