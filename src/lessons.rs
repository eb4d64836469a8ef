use serde::Serialize;
use sqlx::{FromRow, MySqlPool};
use utoipa::ToSchema;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LessonSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub difficulty_level: String,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LessonLine {
    pub id: i64,
    pub line_number: i32,
    pub code_content: String,
    pub line_type: String,
}

/// Minimal line row used when producing an AI explanation.
#[derive(Debug, FromRow)]
pub struct LineForExplain {
    pub id: i64,
    pub code_content: String,
    pub line_number: i32,
}

pub async fn list_lessons(database: &MySqlPool) -> anyhow::Result<Vec<LessonSummary>> {
    let lessons = sqlx::query_as::<_, LessonSummary>(
        "SELECT id, title, description, order_index, difficulty_level FROM lessons ORDER BY order_index ASC",
    )
    .fetch_all(database)
    .await?;
    Ok(lessons)
}

pub async fn get_lesson(
    database: &MySqlPool,
    lesson_id: i64,
) -> anyhow::Result<Option<LessonSummary>> {
    let lesson = sqlx::query_as::<_, LessonSummary>(
        "SELECT id, title, description, order_index, difficulty_level FROM lessons WHERE id = ?",
    )
    .bind(lesson_id)
    .fetch_optional(database)
    .await?;
    Ok(lesson)
}

pub async fn get_lesson_lines(
    database: &MySqlPool,
    lesson_id: i64,
) -> anyhow::Result<Vec<LessonLine>> {
    let lines = sqlx::query_as::<_, LessonLine>(
        "SELECT id, line_number, code_content, line_type FROM lesson_lines WHERE lesson_id = ? ORDER BY line_number ASC",
    )
    .bind(lesson_id)
    .fetch_all(database)
    .await?;
    Ok(lines)
}

pub async fn get_line(
    database: &MySqlPool,
    lesson_id: i64,
    line_id: i64,
) -> anyhow::Result<Option<LineForExplain>> {
    let line = sqlx::query_as::<_, LineForExplain>(
        "SELECT id, code_content, line_number FROM lesson_lines WHERE id = ? AND lesson_id = ?",
    )
    .bind(line_id)
    .bind(lesson_id)
    .fetch_optional(database)
    .await?;
    Ok(line)
}

/// Couple of lines around the target line, joined for the AI prompt.
pub async fn line_context(
    database: &MySqlPool,
    lesson_id: i64,
    line_number: i32,
) -> anyhow::Result<String> {
    let from = (line_number - 2).max(1);
    let to = line_number + 2;
    let lines: Vec<String> = sqlx::query_scalar(
        "SELECT code_content FROM lesson_lines WHERE lesson_id = ? AND line_number BETWEEN ? AND ? ORDER BY line_number ASC",
    )
    .bind(lesson_id)
    .bind(from)
    .bind(to)
    .fetch_all(database)
    .await?;
    Ok(lines.join("\n"))
}

/// Full lesson source, used as quiz-generation input.
pub async fn lesson_content(database: &MySqlPool, lesson_id: i64) -> anyhow::Result<String> {
    let lines: Vec<String> = sqlx::query_scalar(
        "SELECT code_content FROM lesson_lines WHERE lesson_id = ? ORDER BY line_number ASC",
    )
    .bind(lesson_id)
    .fetch_all(database)
    .await?;
    Ok(lines.join("\n"))
}

pub async fn stored_explanation(
    database: &MySqlPool,
    line_id: i64,
) -> anyhow::Result<Option<String>> {
    let explanation: Option<String> =
        sqlx::query_scalar("SELECT explanation FROM line_explanations WHERE lesson_line_id = ?")
            .bind(line_id)
            .fetch_optional(database)
            .await?;
    Ok(explanation)
}

pub async fn store_explanation(
    database: &MySqlPool,
    line_id: i64,
    explanation: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO line_explanations (lesson_line_id, explanation) VALUES (?, ?) ON DUPLICATE KEY UPDATE explanation = ?",
    )
    .bind(line_id)
    .bind(explanation)
    .bind(explanation)
    .execute(database)
    .await?;
    Ok(())
}
