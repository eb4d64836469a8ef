use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, MySqlPool};
use time::PrimitiveDateTime;
use utoipa::ToSchema;

use crate::ai::GeneratedQuestion;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct QuizRow {
    pub id: i64,
    pub lesson_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub order_index: i32,
}

#[derive(Debug, FromRow)]
pub struct AttemptRow {
    pub id: i64,
    pub score: i32,
    pub total_questions: i32,
    pub completed_at: PrimitiveDateTime,
    pub answers: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub quiz_id: i64,
    pub score: i32,
    pub total_questions: i32,
    pub completed_at: PrimitiveDateTime,
    pub quiz_title: Option<String>,
    pub lesson_id: i64,
    pub lesson_title: String,
}

/// Per-question outcome in a submit response. `user_answer` is omitted from
/// the JSON when the student left the question blank.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub question: String,
    pub explanation: Option<String>,
}

/// Grades a submission against the answer key. Answer maps arrive keyed by
/// question id rendered as a JSON string.
pub fn score_answers(
    questions: &[QuestionRow],
    answers: &HashMap<String, String>,
) -> (i32, Vec<AnswerResult>) {
    let mut score = 0;
    let mut results = Vec::with_capacity(questions.len());
    for question in questions {
        let user_answer = answers.get(&question.id.to_string()).cloned();
        let is_correct = user_answer.as_deref() == Some(question.correct_answer.as_str());
        if is_correct {
            score += 1;
        }
        results.push(AnswerResult {
            question_id: question.id,
            user_answer,
            correct_answer: question.correct_answer.clone(),
            is_correct,
            question: question.question_text.clone(),
            explanation: question.explanation.clone(),
        });
    }
    (score, results)
}

pub fn percentage(score: i32, total: i32) -> i32 {
    if total > 0 {
        ((score as f64 / total as f64) * 100.0).round() as i32
    } else {
        0
    }
}

pub async fn quiz_id_for_lesson(
    database: &MySqlPool,
    lesson_id: i64,
) -> anyhow::Result<Option<i64>> {
    let quiz_id: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE lesson_id = ?")
        .bind(lesson_id)
        .fetch_optional(database)
        .await?;
    Ok(quiz_id)
}

pub async fn lesson_id_for_quiz(
    database: &MySqlPool,
    quiz_id: i64,
) -> anyhow::Result<Option<i64>> {
    let lesson_id: Option<i64> = sqlx::query_scalar("SELECT lesson_id FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(database)
        .await?;
    Ok(lesson_id)
}

pub async fn get_quiz(database: &MySqlPool, quiz_id: i64) -> anyhow::Result<Option<QuizRow>> {
    let quiz = sqlx::query_as::<_, QuizRow>(
        "SELECT id, lesson_id, title, description FROM quizzes WHERE id = ?",
    )
    .bind(quiz_id)
    .fetch_optional(database)
    .await?;
    Ok(quiz)
}

pub async fn get_questions(
    database: &MySqlPool,
    quiz_id: i64,
) -> anyhow::Result<Vec<QuestionRow>> {
    let questions = sqlx::query_as::<_, QuestionRow>(
        "SELECT id, question_text, option_a, option_b, option_c, option_d, correct_answer, explanation, order_index FROM questions WHERE quiz_id = ? ORDER BY order_index ASC",
    )
    .bind(quiz_id)
    .fetch_all(database)
    .await?;
    Ok(questions)
}

pub async fn create_quiz(
    database: &MySqlPool,
    lesson_id: i64,
    title: &str,
    description: &str,
) -> anyhow::Result<i64> {
    let result = sqlx::query("INSERT INTO quizzes (lesson_id, title, description) VALUES (?, ?, ?)")
        .bind(lesson_id)
        .bind(title)
        .bind(description)
        .execute(database)
        .await?;
    Ok(result.last_insert_id() as i64)
}

pub async fn insert_question(
    database: &MySqlPool,
    quiz_id: i64,
    question: &GeneratedQuestion,
    order_index: i32,
) -> anyhow::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO questions (quiz_id, question_text, option_a, option_b, option_c, option_d, correct_answer, explanation, order_index) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(quiz_id)
    .bind(&question.question)
    .bind(&question.options.a)
    .bind(&question.options.b)
    .bind(&question.options.c)
    .bind(&question.options.d)
    .bind(&question.correct_answer)
    .bind(&question.explanation)
    .bind(order_index)
    .execute(database)
    .await?;
    Ok(result.last_insert_id() as i64)
}

pub async fn record_attempt(
    database: &MySqlPool,
    user_id: i64,
    quiz_id: i64,
    score: i32,
    total_questions: i32,
    answers_json: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO quiz_attempts (user_id, quiz_id, score, total_questions, answers) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(score)
    .bind(total_questions)
    .bind(answers_json)
    .execute(database)
    .await?;
    Ok(())
}

pub async fn attempt_history(
    database: &MySqlPool,
    user_id: i64,
) -> anyhow::Result<Vec<HistoryRow>> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        "SELECT qa.id, qa.quiz_id, qa.score, qa.total_questions, qa.completed_at, \
         q.title AS quiz_title, q.lesson_id, l.title AS lesson_title \
         FROM quiz_attempts qa \
         JOIN quizzes q ON qa.quiz_id = q.id \
         JOIN lessons l ON q.lesson_id = l.id \
         WHERE qa.user_id = ? \
         ORDER BY qa.completed_at DESC \
         LIMIT 50",
    )
    .bind(user_id)
    .fetch_all(database)
    .await?;
    Ok(rows)
}

pub async fn attempts_for_quiz(
    database: &MySqlPool,
    user_id: i64,
    quiz_id: i64,
) -> anyhow::Result<Vec<AttemptRow>> {
    let rows = sqlx::query_as::<_, AttemptRow>(
        "SELECT id, score, total_questions, completed_at, answers \
         FROM quiz_attempts \
         WHERE quiz_id = ? AND user_id = ? \
         ORDER BY completed_at DESC \
         LIMIT 10",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_all(database)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, correct: &str) -> QuestionRow {
        QuestionRow {
            id,
            question_text: format!("Question {id}?"),
            option_a: "A".into(),
            option_b: "B".into(),
            option_c: "C".into(),
            option_d: "D".into(),
            correct_answer: correct.into(),
            explanation: Some("Because.".into()),
            order_index: id as i32,
        }
    }

    #[test]
    fn scoring_counts_exact_matches_only() {
        let questions = vec![question(1, "a"), question(2, "b"), question(3, "c")];
        let answers = HashMap::from([
            ("1".to_string(), "a".to_string()),
            ("2".to_string(), "d".to_string()),
        ]);
        let (score, results) = score_answers(&questions, &answers);
        assert_eq!(score, 1);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_correct);
        assert!(!results[1].is_correct);
        assert_eq!(results[1].user_answer.as_deref(), Some("d"));
        // unanswered question is wrong and carries no user answer
        assert!(!results[2].is_correct);
        assert!(results[2].user_answer.is_none());
        assert_eq!(results[2].correct_answer, "c");
    }

    #[test]
    fn results_keep_question_text_and_explanation() {
        let questions = vec![question(7, "d")];
        let answers = HashMap::from([("7".to_string(), "d".to_string())]);
        let (score, results) = score_answers(&questions, &answers);
        assert_eq!(score, 1);
        assert_eq!(results[0].question, "Question 7?");
        assert_eq!(results[0].explanation.as_deref(), Some("Because."));
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(4, 5), 80);
        assert_eq!(percentage(5, 5), 100);
    }
}
