// src/handlers/statistics.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        statistics::{
            LeaderboardParams, LeaderboardRow, PhaseProgressEntry, RankEntry, SnapshotNumbers,
            SnapshotUser, StatisticsSnapshot, UpdatePhaseProgressRequest, UserStatistics,
            rank_for_points,
        },
        user::User,
    },
    scoring,
    utils::{
        jwt::Claims,
        policy::{Action, Resource, authorize},
    },
};

const STATS_COLUMNS: &str = r#"
    SELECT id, user_id, total_points, quizzes_completed, correct_answers,
           incorrect_answers, success_rate, current_streak, best_streak,
           total_time_spent, phases_progress, updated_at
    FROM user_statistics
    WHERE user_id = $1
"#;

/// Fetches a user's statistics row, creating a zeroed one on first access.
async fn get_or_create_stats(pool: &PgPool, user_id: i64) -> Result<UserStatistics, AppError> {
    sqlx::query("INSERT INTO user_statistics (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;

    let stats = sqlx::query_as::<_, UserStatistics>(STATS_COLUMNS)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(stats)
}

/// Full statistics snapshot for a user: aggregate numbers, derived
/// average score, rank label/level and the formatted phases progress.
pub async fn get_user_statistics(
    State(pool): State<PgPool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password, role, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let stats = get_or_create_stats(&pool, user_id).await?;

    let mut phases: Vec<PhaseProgressEntry> = stats
        .phases_progress
        .0
        .iter()
        .map(|(phase, p)| PhaseProgressEntry {
            phase: phase.clone(),
            progress: p.progress,
            points: p.points,
            updated_at: p.updated_at,
        })
        .collect();
    phases.sort_by(|a, b| a.phase.cmp(&b.phase));

    let snapshot = StatisticsSnapshot {
        user: SnapshotUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
        statistics: SnapshotNumbers {
            total_points: stats.total_points,
            quizzes_completed: stats.quizzes_completed,
            correct_answers: stats.correct_answers,
            incorrect_answers: stats.incorrect_answers,
            success_rate: stats.success_rate,
            current_streak: stats.current_streak,
            best_streak: stats.best_streak,
            total_time_spent: stats.total_time_spent,
            average_score: stats.average_score(),
        },
        phases_progress: phases,
        rank: rank_for_points(stats.total_points),
    };

    Ok(Json(json!({ "statistics": snapshot })))
}

/// Leaderboard: users ordered desc by total points, ties broken desc by
/// quizzes completed. Ranks are sequential 1-based positions (ties are
/// not merged). Users with no completed quiz are excluded entirely.
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);

    let rows = sqlx::query_as::<_, LeaderboardRow>(
        r#"
        SELECT u.name AS user_name, s.total_points, s.quizzes_completed, s.success_rate
        FROM user_statistics s
        JOIN users u ON s.user_id = u.id
        WHERE s.quizzes_completed > 0
        ORDER BY s.total_points DESC, s.quizzes_completed DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let entries: Vec<RankEntry> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| RankEntry {
            rank: i as i64 + 1,
            user_name: row.user_name,
            total_points: row.total_points,
            quizzes_completed: row.quizzes_completed,
            success_rate: row.success_rate,
        })
        .collect();

    Ok(Json(entries))
}

/// Records progress for a named curriculum phase in the caller's own
/// statistics record. Last write wins per phase name.
pub async fn update_phase_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdatePhaseProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user_id = claims.user_id();
    authorize(
        &claims,
        Action::Update,
        Resource::Statistics { owner_id: user_id },
    )?;

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO user_statistics (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let mut stats =
        sqlx::query_as::<_, UserStatistics>(&format!("{} FOR UPDATE", STATS_COLUMNS))
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

    scoring::upsert_phase_progress(
        &mut stats.phases_progress.0,
        &payload.phase,
        payload.progress,
        payload.points,
        chrono::Utc::now(),
    );

    sqlx::query("UPDATE user_statistics SET phases_progress = $1, updated_at = NOW() WHERE user_id = $2")
        .bind(sqlx::types::Json(&stats.phases_progress.0))
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({
        "phase": payload.phase,
        "progress": payload.progress,
        "points": payload.points,
    })))
}

/// Read-only tracker: one phase's progress snapshot, 404 when absent.
pub async fn get_phase_progress(
    State(pool): State<PgPool>,
    Path((user_id, phase)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, UserStatistics>(STATS_COLUMNS)
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Statistics not found".to_string()))?;

    let progress = stats
        .phases_progress
        .0
        .get(&phase)
        .ok_or(AppError::NotFound(format!(
            "No progress recorded for phase '{}'",
            phase
        )))?;

    Ok(Json(json!({
        "phase": phase,
        "progress": progress.progress,
        "points": progress.points,
        "updated_at": progress.updated_at,
    })))
}

/// Admin: zero out a user's statistics record.
pub async fn reset_user_statistics(
    State(pool): State<PgPool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE user_statistics
        SET total_points = 0, quizzes_completed = 0, correct_answers = 0,
            incorrect_answers = 0, success_rate = 0, current_streak = 0,
            best_streak = 0, total_time_spent = 0, phases_progress = '{}'::JSONB,
            updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Statistics not found".to_string()));
    }

    Ok(Json(json!({ "message": "Statistics reset" })))
}

/// Admin: platform-wide aggregates for the dashboard.
pub async fn get_admin_statistics(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let (users, quizzes, attempts): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users),
            (SELECT COUNT(*) FROM quizzes),
            (SELECT COUNT(*) FROM quiz_attempts)
        "#,
    )
    .fetch_one(&pool)
    .await?;

    let avg_success_rate: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(success_rate) FROM user_statistics WHERE quizzes_completed > 0",
    )
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({
        "users": users,
        "quizzes": quizzes,
        "attempts": attempts,
        "average_success_rate": avg_success_rate.unwrap_or(0.0),
    })))
}
