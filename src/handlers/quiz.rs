// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};

use crate::{
    config::{Config, STATS_RETRY_LIMIT},
    error::{AppError, is_retryable_conflict, is_unique_violation},
    models::{
        attempt::{AttemptResult, SubmitAttemptRequest},
        quiz::{PublicQuestion, Question, Quiz, QuizListParams, QuizSummary},
    },
    scoring::{self, Grade},
    utils::jwt::Claims,
};

/// Lists published quizzes with optional category/difficulty/search
/// filters and simple paging.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let per_page = params.per_page.unwrap_or(12).clamp(1, 100);
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let category = params.category.filter(|c| c != "all");
    let difficulty = params.difficulty.filter(|d| d != "all");
    let search_pattern = params.search.map(|s| format!("%{}%", s));

    let order_by = match params.sort.as_deref() {
        Some("popular") => "q.participants_count DESC, q.created_at DESC",
        Some("rating") => "q.rating DESC, q.created_at DESC",
        _ => "q.created_at DESC",
    };

    let quizzes = sqlx::query_as::<_, QuizSummary>(&format!(
        r#"
        SELECT
            q.id, q.title, q.description, q.category, q.difficulty,
            q.time_limit, q.is_published, u.name AS author_name,
            q.participants_count, q.rating,
            (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS questions_count,
            q.created_at
        FROM quizzes q
        JOIN users u ON q.user_id = u.id
        WHERE q.is_published = TRUE
          AND ($1::TEXT IS NULL OR q.category = $1)
          AND ($2::TEXT IS NULL OR q.difficulty = $2)
          AND ($3::TEXT IS NULL OR q.title ILIKE $3 OR q.description ILIKE $3)
        ORDER BY {}
        LIMIT $4 OFFSET $5
        "#,
        order_by
    ))
    .bind(&category)
    .bind(&difficulty)
    .bind(&search_pattern)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM quizzes q
        WHERE q.is_published = TRUE
          AND ($1::TEXT IS NULL OR q.category = $1)
          AND ($2::TEXT IS NULL OR q.difficulty = $2)
          AND ($3::TEXT IS NULL OR q.title ILIKE $3 OR q.description ILIKE $3)
        "#,
    )
    .bind(&category)
    .bind(&difficulty)
    .bind(&search_pattern)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({
        "data": quizzes,
        "meta": {
            "current_page": page,
            "per_page": per_page,
            "total": total,
        }
    })))
}

/// Returns a published quiz with its ordered questions, answer keys hidden.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_published_quiz(&pool, id).await?;
    let questions = fetch_quiz_questions(&pool, id).await?;

    let public_questions: Vec<PublicQuestion> =
        questions.into_iter().map(PublicQuestion::from).collect();

    Ok(Json(json!({
        "data": {
            "quiz": quiz,
            "questions": public_questions,
        }
    })))
}

/// Submits a quiz attempt: grade the answers, record the attempt exactly
/// once per (user, quiz), bump the participants counter and fold the
/// result into the user's aggregate statistics, all in one transaction.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.time_spent < 0 {
        return Err(AppError::Validation(
            "time_spent must not be negative".to_string(),
        ));
    }

    let quiz = fetch_published_quiz(&pool, id).await?;
    let questions = fetch_quiz_questions(&pool, id).await?;

    let grade = scoring::grade(&questions, &payload.answers)?;
    let user_id = claims.user_id();

    // The statistics row is the contended resource; retry the whole
    // transaction on serialization failures before giving up.
    let mut tries = 0;
    let attempt_id = loop {
        match record_attempt(&pool, user_id, quiz.id, &grade, &payload, config.passing_score).await
        {
            Ok(id) => break id,
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::DuplicateAttempt(format!(
                    "An attempt for quiz {} has already been recorded",
                    quiz.id
                )));
            }
            Err(e) if is_retryable_conflict(&e) => {
                tries += 1;
                if tries >= STATS_RETRY_LIMIT {
                    return Err(AppError::Conflict(
                        "Statistics update conflicted, please retry".to_string(),
                    ));
                }
                tracing::warn!("Retrying attempt transaction (try {})", tries);
            }
            Err(e) => {
                tracing::error!("Failed to record attempt: {:?}", e);
                return Err(AppError::from(e));
            }
        }
    };

    Ok(Json(json!({
        "data": AttemptResult {
            score: grade.score,
            passed: grade.passed(config.passing_score),
            correct_answers: grade.correct_count,
            total_questions: grade.total_questions,
            points_earned: grade.points_earned,
            attempt_id,
        }
    })))
}

/// One transaction: insert the attempt, bump participants_count, apply
/// the statistics update under a row lock. Returns the attempt id.
async fn record_attempt(
    pool: &PgPool,
    user_id: i64,
    quiz_id: i64,
    grade: &Grade,
    payload: &SubmitAttemptRequest,
    passing_score: f64,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quiz_attempts
            (user_id, quiz_id, score, correct_count, total_questions, time_spent, answers, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(grade.score)
    .bind(grade.correct_count)
    .bind(grade.total_questions)
    .bind(payload.time_spent)
    .bind(SqlJson(&payload.answers))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE quizzes SET participants_count = participants_count + 1 WHERE id = $1")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;

    apply_statistics(&mut tx, user_id, grade, payload.time_spent as i64 / 60, passing_score)
        .await?;

    tx.commit().await?;

    Ok(attempt_id)
}

/// Read-modify-write of the user's statistics row under FOR UPDATE.
/// Bootstraps a zeroed row for the user's first attempt.
pub(crate) async fn apply_statistics(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: i64,
    grade: &Grade,
    time_spent_minutes: i64,
    passing_score: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO user_statistics (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    let mut stats = sqlx::query_as::<_, crate::models::statistics::UserStatistics>(
        r#"
        SELECT id, user_id, total_points, quizzes_completed, correct_answers,
               incorrect_answers, success_rate, current_streak, best_streak,
               total_time_spent, phases_progress, updated_at
        FROM user_statistics
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    scoring::apply_attempt(&mut stats, grade, time_spent_minutes, passing_score);

    sqlx::query(
        r#"
        UPDATE user_statistics
        SET total_points = $1,
            quizzes_completed = $2,
            correct_answers = $3,
            incorrect_answers = $4,
            success_rate = $5,
            current_streak = $6,
            best_streak = $7,
            total_time_spent = $8,
            updated_at = NOW()
        WHERE user_id = $9
        "#,
    )
    .bind(stats.total_points)
    .bind(stats.quizzes_completed)
    .bind(stats.correct_answers)
    .bind(stats.incorrect_answers)
    .bind(stats.success_rate)
    .bind(stats.current_streak)
    .bind(stats.best_streak)
    .bind(stats.total_time_spent)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn fetch_published_quiz(pool: &PgPool, id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, description, category, difficulty, time_limit,
               is_published, user_id, tags, participants_count, rating,
               created_at, updated_at
        FROM quizzes
        WHERE id = $1 AND is_published = TRUE
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(format!("Quiz {} not found", id)))
}

pub(crate) async fn fetch_quiz_questions(
    pool: &PgPool,
    quiz_id: i64,
) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, text, options, correct_answer_index, explanation,
               code_snippet, question_type, points, time_limit, position, created_at
        FROM questions
        WHERE quiz_id = $1
        ORDER BY position, id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}
