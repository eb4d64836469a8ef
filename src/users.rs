use serde::Serialize;
use sqlx::{FromRow, MySqlPool};
use time::PrimitiveDateTime;
use utoipa::ToSchema;

/// Public identity attached to auth responses.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: PrimitiveDateTime,
}

/// Row used by login, never serialized.
#[derive(Debug, FromRow)]
pub struct Credentials {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

pub async fn is_taken(database: &MySqlPool, email: &str, username: &str) -> anyhow::Result<bool> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE email = ? OR username = ?")
            .bind(email)
            .bind(username)
            .fetch_optional(database)
            .await?;
    Ok(existing.is_some())
}

pub async fn create_user(
    database: &MySqlPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> anyhow::Result<i64> {
    let result = sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)")
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(database)
        .await?;
    Ok(result.last_insert_id() as i64)
}

pub async fn find_by_email(
    database: &MySqlPool,
    email: &str,
) -> anyhow::Result<Option<Credentials>> {
    let user = sqlx::query_as::<_, Credentials>(
        "SELECT id, username, email, password_hash FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(database)
    .await?;
    Ok(user)
}

pub async fn find_profile(
    database: &MySqlPool,
    user_id: i64,
) -> anyhow::Result<Option<UserProfile>> {
    let profile = sqlx::query_as::<_, UserProfile>(
        "SELECT id, username, email, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(database)
    .await?;
    Ok(profile)
}
