//! End-to-end tests against a real MySQL database. Point
//! `LUNO_TEST_DATABASE_URL` at a scratch database and run with
//! `cargo test -- --ignored`. Migrations (including the lesson seed) are
//! applied on first connect; user rows are created with unique emails so
//! reruns do not collide.

use axum::http::StatusCode;
use axum_test::TestServer;
use luno_server::{api, config::Config, state::AppState};
use serde_json::{Value, json};
use sqlx::MySqlPool;

async fn live_server() -> TestServer {
    let url = std::env::var("LUNO_TEST_DATABASE_URL")
        .expect("LUNO_TEST_DATABASE_URL must point at a scratch MySQL database");
    let database = MySqlPool::connect(&url).await.unwrap();
    sqlx::migrate!().run(&database).await.unwrap();
    let config = Config {
        database_url: url,
        port: 0,
        frontend_url: "http://localhost:5173".into(),
        jwt_secret: "live-test-secret".into(),
        jwt_expiry_days: 7,
        openai_api_key: None,
        openai_base_url: None,
        ai_model: "gpt-3.5-turbo".into(),
        site_url: "http://localhost:5173".into(),
        production: false,
    };
    TestServer::new(api::router(AppState::new(database, config))).unwrap()
}

/// Signs up a fresh user and returns their bearer token.
async fn fresh_user(server: &TestServer) -> String {
    let nonce = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "username": format!("user{nonce}"),
            "email": format!("user{nonce}@example.com"),
            "password": "hunter42",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore = "needs a MySQL database"]
async fn signup_login_profile_roundtrip() {
    let server = live_server().await;
    let nonce = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    let email = format!("ada{nonce}@example.com");

    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "username": format!("ada{nonce}"),
            "email": email,
            "password": "hunter42",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let signup: Value = response.json();
    assert_eq!(signup["message"], "User created successfully");
    assert!(signup["token"].as_str().is_some_and(|t| !t.is_empty()));

    // same email again
    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "username": format!("other{nonce}"),
            "email": email,
            "password": "hunter42",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "User already exists with this email or username");

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": "hunter42" }))
        .await;
    response.assert_status_ok();
    let login: Value = response.json();
    assert_eq!(login["message"], "Login successful");

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid credentials");

    let token = login["token"].as_str().unwrap();
    let response = server
        .get("/api/auth/profile")
        .authorization_bearer(token)
        .await;
    response.assert_status_ok();
    let profile: Value = response.json();
    assert_eq!(profile["user"]["email"], login["user"]["email"]);
}

#[tokio::test]
#[ignore = "needs a MySQL database"]
async fn seeded_lessons_are_listed_and_fetchable() {
    let server = live_server().await;

    let response = server.get("/api/lesson").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let lessons = body["lessons"].as_array().unwrap();
    assert!(lessons.len() >= 5, "seed migration should insert 5 lessons");

    let id = lessons[0]["id"].as_i64().unwrap();
    let response = server.get(&format!("/api/lesson/{id}")).await;
    response.assert_status_ok();
    let lesson: Value = response.json();
    assert!(!lesson["lines"].as_array().unwrap().is_empty());

    let response = server.get("/api/lesson/999999").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Lesson not found");
}

#[tokio::test]
#[ignore = "needs a MySQL database"]
async fn first_activity_starts_a_streak() {
    let server = live_server().await;
    let token = fresh_user(&server).await;

    let response = server
        .post("/api/streak/activity")
        .authorization_bearer(&token)
        .json(&json!({ "activityType": "lesson", "activityId": 1, "points": 5 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Activity recorded");
    assert_eq!(body["pointsEarned"], 5);

    // same activity on the same day is a no-op
    let response = server
        .post("/api/streak/activity")
        .authorization_bearer(&token)
        .json(&json!({ "activityType": "lesson", "activityId": 1, "points": 5 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Activity already recorded today");
    assert!(body.get("pointsEarned").is_none());

    let response = server
        .get("/api/streak")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let streak: Value = response.json();
    assert_eq!(streak["currentStreak"], 1);
    assert_eq!(streak["longestStreak"], 1);
    assert_eq!(streak["totalDaysActive"], 1);
    assert_eq!(streak["isActiveToday"], true);
    assert_eq!(streak["todayActivityCount"], 1);
}

#[tokio::test]
#[ignore = "needs a MySQL database"]
async fn challenge_completion_is_idempotent() {
    let server = live_server().await;
    let token = fresh_user(&server).await;

    let response = server.get("/api/streak/challenge/today").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let challenge_id = body["challenge"]["id"]
        .as_i64()
        .expect("lessons are seeded, so a challenge must be minted");
    assert_eq!(body["completed"], false);

    let response = server
        .post("/api/streak/challenge/complete")
        .authorization_bearer(&token)
        .json(&json!({ "challengeId": challenge_id }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Challenge completed");
    assert_eq!(body["pointsEarned"], 10);

    let response = server
        .post("/api/streak/challenge/complete")
        .authorization_bearer(&token)
        .json(&json!({ "challengeId": challenge_id }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Challenge already completed");
    assert_eq!(body["pointsEarned"], 10);

    // the streak page now reports the challenge as done
    let response = server
        .get("/api/streak")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let streak: Value = response.json();
    assert_eq!(streak["todayChallenge"]["completed"], true);

    let response = server
        .post("/api/streak/challenge/complete")
        .authorization_bearer(&token)
        .json(&json!({ "challengeId": 999999 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Challenge not found");
}

#[tokio::test]
#[ignore = "needs a MySQL database"]
async fn progress_tracking_roundtrip() {
    let server = live_server().await;
    let token = fresh_user(&server).await;

    let response = server
        .post("/api/progress/lesson/1/access")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Progress tracked");

    let response = server
        .post("/api/progress/lesson/1/complete")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Lesson marked as completed");

    let response = server
        .get("/api/progress/progress")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["progress"]["1"]["completed"], true);

    let response = server
        .get("/api/progress/stats")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let stats: Value = response.json();
    assert_eq!(stats["completedLessons"], 1);
    assert!(stats["totalLessons"].as_i64().unwrap() >= 5);
}

#[tokio::test]
#[ignore = "needs a MySQL database"]
async fn submitting_to_a_missing_quiz_is_404() {
    let server = live_server().await;
    let token = fresh_user(&server).await;

    let response = server
        .post("/api/quiz/999999/submit")
        .authorization_bearer(&token)
        .json(&json!({ "answers": { "1": "a" } }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Quiz not found");
}
