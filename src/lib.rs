//! REST backend for Luno, an AI-assisted HTML/CSS learning platform.

pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod lessons;
pub mod progress;
pub mod quizzes;
pub mod state;
pub mod streaks;
pub mod users;
pub mod utils;
