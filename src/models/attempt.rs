// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'quiz_attempts' table.
///
/// At most one row exists per (user_id, quiz_id); the table carries a
/// unique constraint on that pair. Once `completed_at` is set the row is
/// never mutated again, only read for statistics aggregation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    /// Percentage score in [0, 100].
    pub score: f64,
    pub correct_count: i32,
    pub total_questions: i32,
    /// Elapsed time in seconds.
    pub time_spent: i32,
    /// Raw answer mapping: question id -> selected option index.
    pub answers: Json<HashMap<i64, i32>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    /// Question ID -> selected option index. Unanswered questions may
    /// simply be absent from the map.
    pub answers: HashMap<i64, i32>,
    /// Elapsed time in seconds.
    pub time_spent: i32,
}

/// Result of a recorded attempt, returned to the client.
#[derive(Debug, Serialize)]
pub struct AttemptResult {
    pub score: f64,
    pub passed: bool,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub points_earned: i64,
    pub attempt_id: i64,
}
