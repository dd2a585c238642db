// src/models/phase.rs
//
// Curriculum content tree: Phase -> Theme -> ThemeQuestion -> Reponse.
// Independent of the quiz/attempt flow; no aggregate logic beyond counts.

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

pub const PHASE_LEVELS: [&str; 4] = ["undefined", "easy", "medium", "hard"];

/// Represents the 'phases' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Phase {
    pub id: i64,
    pub title: String,
    /// 'undefined', 'easy', 'medium' or 'hard'.
    pub level: String,
    pub category: String,
    pub status: String,
    pub average: i32,
    /// Owning teacher/admin.
    pub user_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'themes' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Theme {
    pub id: i64,
    pub title: String,
    pub score: i32,
    pub phase_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'theme_questions' table (curriculum questions, distinct
/// from quiz questions).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ThemeQuestion {
    pub id: i64,
    pub theme_id: i64,
    pub text: String,
    pub question_type: String,
    pub points: i32,
    pub position: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'reponses' table: answer options of a theme question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reponse {
    pub id: i64,
    pub question_id: i64,
    pub body: String,
    pub value: i32,
    pub correct: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePhaseRequest {
    #[validate(length(min = 2, max = 255))]
    pub title: String,
    pub level: Option<String>,
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub average: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePhaseRequest {
    #[validate(length(min = 2, max = 255))]
    pub title: Option<String>,
    pub level: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    #[validate(range(min = 0))]
    pub average: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateThemeRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(range(min = 0))]
    pub score: Option<i32>,
    pub phase_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateThemeRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(range(min = 0))]
    pub score: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateThemeQuestionRequest {
    pub theme_id: i64,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    pub question_type: Option<String>,
    #[validate(range(min = 1))]
    pub points: Option<i32>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReponseRequest {
    pub question_id: i64,
    #[validate(length(min = 1, max = 1000))]
    pub body: String,
    pub value: Option<i32>,
    pub correct: Option<bool>,
}
