// src/models/statistics.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Progress snapshot for one named curriculum phase, kept inside the
/// `phases_progress` JSON mapping. Last write wins; no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseProgress {
    /// Completion percentage, 0-100.
    pub progress: i32,
    pub points: i64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'user_statistics' table: the single aggregate row per
/// user, updated after every quiz attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserStatistics {
    pub id: i64,
    pub user_id: i64,
    pub total_points: i64,
    pub quizzes_completed: i64,
    pub correct_answers: i64,
    pub incorrect_answers: i64,
    /// Derived: correct / (correct + incorrect) * 100, 0 when no answers.
    pub success_rate: f64,
    pub current_streak: i32,
    pub best_streak: i32,
    /// Minutes spent across all attempts.
    pub total_time_spent: i64,
    /// Phase name -> progress snapshot.
    pub phases_progress: Json<HashMap<String, PhaseProgress>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl UserStatistics {
    /// Average points per completed quiz, 0 when none completed.
    pub fn average_score(&self) -> f64 {
        if self.quizzes_completed > 0 {
            self.total_points as f64 / self.quizzes_completed as f64
        } else {
            0.0
        }
    }
}

/// Rank label and level derived from accumulated points.
#[derive(Debug, Serialize, PartialEq)]
pub struct RankInfo {
    pub rank: &'static str,
    pub level: i64,
}

pub fn rank_for_points(total_points: i64) -> RankInfo {
    let rank = if total_points >= 2000 {
        "Expert"
    } else if total_points >= 1000 {
        "Advanced"
    } else if total_points >= 500 {
        "Intermediate"
    } else if total_points >= 100 {
        "Beginner"
    } else {
        "Newcomer"
    };

    RankInfo {
        rank,
        level: total_points / 100 + 1,
    }
}

/// One formatted entry of the phases progress list in the snapshot.
#[derive(Debug, Serialize)]
pub struct PhaseProgressEntry {
    pub phase: String,
    pub progress: i32,
    pub points: i64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Full statistics snapshot returned by the API.
#[derive(Debug, Serialize)]
pub struct StatisticsSnapshot {
    pub user: SnapshotUser,
    pub statistics: SnapshotNumbers,
    pub phases_progress: Vec<PhaseProgressEntry>,
    pub rank: RankInfo,
}

#[derive(Debug, Serialize)]
pub struct SnapshotUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SnapshotNumbers {
    pub total_points: i64,
    pub quizzes_completed: i64,
    pub correct_answers: i64,
    pub incorrect_answers: i64,
    pub success_rate: f64,
    pub current_streak: i32,
    pub best_streak: i32,
    pub total_time_spent: i64,
    pub average_score: f64,
}

/// One row of the leaderboard, joined from users and user_statistics.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardRow {
    pub user_name: String,
    pub total_points: i64,
    pub quizzes_completed: i64,
    pub success_rate: f64,
}

/// Leaderboard row with its assigned 1-based rank.
#[derive(Debug, Serialize)]
pub struct RankEntry {
    pub rank: i64,
    pub user_name: String,
    pub total_points: i64,
    pub quizzes_completed: i64,
    pub success_rate: f64,
}

/// Query parameters for the leaderboard.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

/// DTO for recording phase progress.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePhaseProgressRequest {
    #[validate(length(min = 1, max = 255))]
    pub phase: String,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100."))]
    pub progress: i32,
    #[validate(range(min = 0))]
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_score_is_zero_without_completed_quizzes() {
        let stats = UserStatistics {
            id: 1,
            user_id: 1,
            total_points: 0,
            quizzes_completed: 0,
            correct_answers: 0,
            incorrect_answers: 0,
            success_rate: 0.0,
            current_streak: 0,
            best_streak: 0,
            total_time_spent: 0,
            phases_progress: Json(HashMap::new()),
            updated_at: None,
        };
        assert_eq!(stats.average_score(), 0.0);
    }

    #[test]
    fn rank_thresholds() {
        assert_eq!(rank_for_points(0).rank, "Newcomer");
        assert_eq!(rank_for_points(99).rank, "Newcomer");
        assert_eq!(rank_for_points(100).rank, "Beginner");
        assert_eq!(rank_for_points(500).rank, "Intermediate");
        assert_eq!(rank_for_points(1000).rank, "Advanced");
        assert_eq!(rank_for_points(2000).rank, "Expert");
    }

    #[test]
    fn level_grows_with_points() {
        assert_eq!(rank_for_points(0).level, 1);
        assert_eq!(rank_for_points(250).level, 3);
        assert_eq!(rank_for_points(1000).level, 11);
    }
}
