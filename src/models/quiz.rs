// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

pub const CATEGORIES: [&str; 9] = [
    "programming",
    "maintenance",
    "cybersecurity",
    "networking",
    "database",
    "web",
    "mobile",
    "cloud",
    "ai",
];

pub const DIFFICULTIES: [&str; 4] = ["beginner", "intermediate", "advanced", "expert"];

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub difficulty: String,
    /// Overall time limit in minutes.
    pub time_limit: i32,
    pub is_published: bool,
    /// Owning teacher/admin.
    pub user_id: i64,
    pub tags: Json<Vec<String>>,
    pub participants_count: i32,
    pub rating: f64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table (questions belonging to a quiz).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub text: String,
    /// Ordered option strings, stored as a JSON array.
    pub options: Json<Vec<String>>,
    /// Zero-based index into `options`.
    pub correct_answer_index: i32,
    pub explanation: Option<String>,
    pub code_snippet: Option<String>,
    pub question_type: String,
    /// Points awarded when answered correctly.
    pub points: i32,
    /// Optional per-question time limit in seconds.
    pub time_limit: Option<i32>,
    /// Position within the quiz.
    pub position: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending a question to a quiz taker: hides the answer key
/// and the explanation.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Json<Vec<String>>,
    pub code_snippet: Option<String>,
    pub question_type: String,
    pub points: i32,
    pub time_limit: Option<i32>,
    pub position: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            text: q.text,
            options: q.options,
            code_snippet: q.code_snippet,
            question_type: q.question_type,
            points: q.points,
            time_limit: q.time_limit,
            position: q.position,
        }
    }
}

/// Summary row for quiz listings (includes the author name and question count).
#[derive(Debug, Serialize, FromRow)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub difficulty: String,
    pub time_limit: i32,
    pub is_published: bool,
    pub author_name: String,
    pub participants_count: i32,
    pub rating: f64,
    pub questions_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for listing quizzes.
#[derive(Debug, Deserialize)]
pub struct QuizListParams {
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
    /// 'newest' (default), 'popular' or 'rating'.
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// DTO for a question inside a quiz creation/update payload.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[validate(length(min = 2, message = "A question needs at least two options."))]
    pub options: Vec<String>,
    #[validate(range(min = 0))]
    pub correct_answer_index: i32,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    pub code_snippet: Option<String>,
    pub question_type: Option<String>,
    #[validate(range(min = 1))]
    pub points: Option<i32>,
    #[validate(range(min = 0))]
    pub time_limit: Option<i32>,
}

impl QuestionInput {
    /// The correct index must point into the options list.
    pub fn check_answer_index(&self) -> Result<(), crate::error::AppError> {
        if self.correct_answer_index < 0 || self.correct_answer_index as usize >= self.options.len()
        {
            return Err(crate::error::AppError::Validation(
                "correct_answer_index is out of range for the given options".to_string(),
            ));
        }
        Ok(())
    }
}

/// DTO for a teacher creating a quiz, optionally with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub category: String,
    pub difficulty: String,
    #[validate(range(min = 1))]
    pub time_limit: i32,
    pub tags: Option<Vec<String>>,
    #[validate(nested)]
    pub questions: Option<Vec<QuestionInput>>,
}

/// DTO for updating quiz metadata. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    #[validate(range(min = 1))]
    pub time_limit: Option<i32>,
    pub tags: Option<Vec<String>>,
}

/// DTO for publishing/unpublishing a quiz.
#[derive(Debug, Deserialize)]
pub struct UpdateQuizStatusRequest {
    pub is_published: bool,
}
