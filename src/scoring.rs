// src/scoring.rs
//
// The scoring and statistics aggregation rules, kept as pure functions so
// the invariants can be tested without a database. Handlers wrap these in
// a transaction; see handlers::quiz::submit_quiz.

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::{
        quiz::Question,
        statistics::{PhaseProgress, UserStatistics},
    },
};

/// Outcome of grading one attempt against a quiz's answer keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    /// Percentage score in [0, 100].
    pub score: f64,
    pub correct_count: i32,
    pub total_questions: i32,
    /// Sum of the point values of correctly answered questions.
    pub points_earned: i64,
}

impl Grade {
    pub fn passed(&self, passing_score: f64) -> bool {
        self.score >= passing_score
    }
}

/// Grades a user-answer mapping against a quiz's questions.
///
/// A question absent from the mapping counts as incorrect. A quiz with
/// zero questions cannot be scored and is rejected rather than producing
/// NaN.
pub fn grade(questions: &[Question], answers: &HashMap<i64, i32>) -> Result<Grade, AppError> {
    if questions.is_empty() {
        return Err(AppError::InvalidQuizState(
            "Quiz has no questions".to_string(),
        ));
    }

    let mut correct_count = 0;
    let mut points_earned = 0i64;

    for question in questions {
        if answers.get(&question.id) == Some(&question.correct_answer_index) {
            correct_count += 1;
            points_earned += question.points as i64;
        }
    }

    let total_questions = questions.len() as i32;
    let score = (correct_count as f64 / total_questions as f64) * 100.0;

    Ok(Grade {
        score,
        correct_count,
        total_questions,
        points_earned,
    })
}

/// Success rate invariant: correct / (correct + incorrect) * 100,
/// defined as 0 when nothing has been answered yet.
pub fn success_rate(correct: i64, incorrect: i64) -> f64 {
    let total = correct + incorrect;
    if total == 0 {
        return 0.0;
    }
    (correct as f64 / total as f64) * 100.0
}

/// Applies one graded attempt to a user's aggregate statistics.
///
/// Must run exactly once per finalized attempt; the caller holds the row
/// lock for the duration of the update. Streak: +1 on a passing score,
/// reset to 0 otherwise, with best_streak kept monotonically via max.
pub fn apply_attempt(
    stats: &mut UserStatistics,
    grade: &Grade,
    time_spent_minutes: i64,
    passing_score: f64,
) {
    stats.total_points += grade.points_earned;
    stats.quizzes_completed += 1;
    stats.correct_answers += grade.correct_count as i64;
    stats.incorrect_answers += (grade.total_questions - grade.correct_count) as i64;
    stats.success_rate = success_rate(stats.correct_answers, stats.incorrect_answers);
    stats.total_time_spent += time_spent_minutes;

    if grade.passed(passing_score) {
        stats.current_streak += 1;
        stats.best_streak = stats.best_streak.max(stats.current_streak);
    } else {
        stats.current_streak = 0;
    }
}

/// Upserts one phase's progress snapshot in the phases_progress mapping.
/// Last write wins; prior progress, points and timestamp are overwritten.
pub fn upsert_phase_progress(
    map: &mut HashMap<String, PhaseProgress>,
    phase: &str,
    progress: i32,
    points: i64,
    now: chrono::DateTime<chrono::Utc>,
) {
    map.insert(
        phase.to_string(),
        PhaseProgress {
            progress,
            points,
            updated_at: now,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn question(id: i64, correct_index: i32, points: i32) -> Question {
        Question {
            id,
            quiz_id: 1,
            text: format!("Question {}", id),
            options: Json(vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ]),
            correct_answer_index: correct_index,
            explanation: None,
            code_snippet: None,
            question_type: "multiple_choice".to_string(),
            points,
            time_limit: None,
            position: 0,
            created_at: None,
        }
    }

    fn fresh_stats() -> UserStatistics {
        UserStatistics {
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
        }
    }

    #[test]
    fn four_questions_three_correct_scores_75() {
        let questions = vec![
            question(1, 0, 10),
            question(2, 1, 10),
            question(3, 2, 10),
            question(4, 3, 10),
        ];
        let answers = HashMap::from([(1, 0), (2, 1), (3, 9), (4, 3)]);

        let grade = grade(&questions, &answers).unwrap();
        assert_eq!(grade.score, 75.0);
        assert_eq!(grade.correct_count, 3);
        assert_eq!(grade.total_questions, 4);
        assert!(grade.passed(60.0));
    }

    #[test]
    fn missing_answers_count_as_incorrect() {
        let questions = vec![question(1, 0, 10), question(2, 1, 10)];
        let answers = HashMap::from([(1, 0)]);

        let grade = grade(&questions, &answers).unwrap();
        assert_eq!(grade.correct_count, 1);
        assert_eq!(grade.score, 50.0);
    }

    #[test]
    fn score_stays_within_bounds() {
        let questions = vec![question(1, 0, 10), question(2, 1, 10), question(3, 2, 10)];

        let none: HashMap<i64, i32> = HashMap::new();
        let all = HashMap::from([(1, 0), (2, 1), (3, 2)]);

        assert_eq!(grade(&questions, &none).unwrap().score, 0.0);
        assert_eq!(grade(&questions, &all).unwrap().score, 100.0);
    }

    #[test]
    fn empty_quiz_is_rejected() {
        let answers = HashMap::new();
        let err = grade(&[], &answers).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuizState(_)));
    }

    #[test]
    fn points_sum_only_correct_answers() {
        let questions = vec![question(1, 0, 10), question(2, 1, 25)];
        let answers = HashMap::from([(1, 0), (2, 0)]);

        let grade = grade(&questions, &answers).unwrap();
        assert_eq!(grade.points_earned, 10);
    }

    #[test]
    fn first_attempt_bootstrap_scenario() {
        // 50 points, 3/5 correct, 10 minutes on zeroed statistics.
        let mut stats = fresh_stats();
        let grade = Grade {
            score: 60.0,
            correct_count: 3,
            total_questions: 5,
            points_earned: 50,
        };

        apply_attempt(&mut stats, &grade, 10, 60.0);

        assert_eq!(stats.total_points, 50);
        assert_eq!(stats.quizzes_completed, 1);
        assert_eq!(stats.correct_answers, 3);
        assert_eq!(stats.incorrect_answers, 2);
        assert_eq!(stats.success_rate, 60.0);
        assert_eq!(stats.total_time_spent, 10);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.best_streak, 1);
        assert_eq!(stats.average_score(), 50.0);
    }

    #[test]
    fn consecutive_passes_build_a_streak() {
        let mut stats = fresh_stats();
        let pass = Grade {
            score: 80.0,
            correct_count: 4,
            total_questions: 5,
            points_earned: 40,
        };

        for _ in 0..3 {
            apply_attempt(&mut stats, &pass, 5, 60.0);
        }

        assert_eq!(stats.current_streak, 3);
        assert!(stats.best_streak >= 3);
    }

    #[test]
    fn failing_attempt_resets_streak_but_keeps_best() {
        let mut stats = fresh_stats();
        let pass = Grade {
            score: 100.0,
            correct_count: 5,
            total_questions: 5,
            points_earned: 50,
        };
        let fail = Grade {
            score: 20.0,
            correct_count: 1,
            total_questions: 5,
            points_earned: 10,
        };

        apply_attempt(&mut stats, &pass, 5, 60.0);
        apply_attempt(&mut stats, &pass, 5, 60.0);
        let best_before = stats.best_streak;

        apply_attempt(&mut stats, &fail, 5, 60.0);

        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.best_streak, best_before);
    }

    #[test]
    fn exact_threshold_counts_as_passed() {
        let mut stats = fresh_stats();
        let borderline = Grade {
            score: 60.0,
            correct_count: 3,
            total_questions: 5,
            points_earned: 30,
        };

        apply_attempt(&mut stats, &borderline, 5, 60.0);
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn success_rate_recomputed_across_attempts() {
        let mut stats = fresh_stats();
        assert_eq!(success_rate(0, 0), 0.0);

        let first = Grade {
            score: 60.0,
            correct_count: 3,
            total_questions: 5,
            points_earned: 30,
        };
        let second = Grade {
            score: 40.0,
            correct_count: 2,
            total_questions: 5,
            points_earned: 20,
        };

        apply_attempt(&mut stats, &first, 5, 60.0);
        apply_attempt(&mut stats, &second, 5, 60.0);

        // 5 correct of 10 answered.
        assert!((stats.success_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn phase_progress_overwrites_prior_entry() {
        let mut map = HashMap::new();
        let t1 = chrono::Utc::now();
        let t2 = t1 + chrono::Duration::minutes(5);

        upsert_phase_progress(&mut map, "Phase 1", 50, 200, t1);
        upsert_phase_progress(&mut map, "Phase 1", 80, 350, t2);
        upsert_phase_progress(&mut map, "Phase 2", 10, 50, t2);

        assert_eq!(map.len(), 2);
        let p1 = &map["Phase 1"];
        assert_eq!(p1.progress, 80);
        assert_eq!(p1.points, 350);
        assert_eq!(p1.updated_at, t2);
    }
}
