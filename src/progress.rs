use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, MySqlPool};
use time::PrimitiveDateTime;
use utoipa::ToSchema;

use crate::quizzes::percentage;

#[derive(Debug, FromRow)]
pub struct ProgressRow {
    pub lesson_id: i64,
    pub completed: bool,
    pub last_accessed_at: PrimitiveDateTime,
}

/// Per-lesson entry in the progress map response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub completed: bool,
    pub last_accessed: PrimitiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub total_quizzes: i64,
    pub avg_score: i32,
    pub progress_percentage: i32,
}

pub async fn track_access(
    database: &MySqlPool,
    user_id: i64,
    lesson_id: i64,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO user_progress (user_id, lesson_id, last_accessed_at) VALUES (?, ?, NOW()) \
         ON DUPLICATE KEY UPDATE last_accessed_at = NOW()",
    )
    .bind(user_id)
    .bind(lesson_id)
    .execute(database)
    .await?;
    Ok(())
}

pub async fn mark_completed(
    database: &MySqlPool,
    user_id: i64,
    lesson_id: i64,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO user_progress (user_id, lesson_id, completed, last_accessed_at) VALUES (?, ?, TRUE, NOW()) \
         ON DUPLICATE KEY UPDATE completed = TRUE, last_accessed_at = NOW()",
    )
    .bind(user_id)
    .bind(lesson_id)
    .execute(database)
    .await?;
    Ok(())
}

/// Lesson id to completion state, shaped for O(1) lookup on the client.
pub async fn progress_map(
    database: &MySqlPool,
    user_id: i64,
) -> anyhow::Result<HashMap<i64, ProgressEntry>> {
    let rows = sqlx::query_as::<_, ProgressRow>(
        "SELECT lesson_id, completed, last_accessed_at FROM user_progress WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(database)
    .await?;
    let map = rows
        .into_iter()
        .map(|row| {
            (
                row.lesson_id,
                ProgressEntry {
                    completed: row.completed,
                    last_accessed: row.last_accessed_at,
                },
            )
        })
        .collect();
    Ok(map)
}

pub async fn user_stats(database: &MySqlPool, user_id: i64) -> anyhow::Result<UserStats> {
    let total_lessons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
        .fetch_one(database)
        .await?;
    let completed_lessons: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_progress WHERE user_id = ? AND completed = TRUE",
    )
    .bind(user_id)
    .fetch_one(database)
    .await?;
    // CAST: MySQL's AVG over exact numerics yields DECIMAL, which does not
    // decode as f64
    let (total_quizzes, avg_score): (i64, Option<f64>) = sqlx::query_as(
        "SELECT COUNT(*), CAST(AVG(score * 100.0 / total_questions) AS DOUBLE) FROM quiz_attempts WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(database)
    .await?;
    Ok(UserStats {
        total_lessons,
        completed_lessons,
        total_quizzes,
        avg_score: avg_score.map(|s| s.round() as i32).unwrap_or(0),
        progress_percentage: percentage(completed_lessons as i32, total_lessons as i32),
    })
}
