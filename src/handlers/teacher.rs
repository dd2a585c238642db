// src/handlers/teacher.rs
//
// Quiz authoring endpoints for teachers (and admins): CRUD, publishing,
// duplication and per-quiz attempt statistics.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{
        CreateQuizRequest, DIFFICULTIES, Quiz, QuizSummary, UpdateQuizRequest,
        UpdateQuizStatusRequest,
    },
    utils::{
        html::clean_html,
        jwt::Claims,
        policy::{Action, Resource, authorize},
    },
};

async fn fetch_quiz(pool: &PgPool, id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, description, category, difficulty, time_limit,
               is_published, user_id, tags, participants_count, rating,
               created_at, updated_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(format!("Quiz {} not found", id)))
}

/// Lists all quizzes authored by a teacher, drafts included.
pub async fn get_teacher_quizzes(
    State(pool): State<PgPool>,
    Path(teacher_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(teacher_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Teacher not found".to_string()));
    }

    let quizzes = sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT
            q.id, q.title, q.description, q.category, q.difficulty,
            q.time_limit, q.is_published, u.name AS author_name,
            q.participants_count, q.rating,
            (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS questions_count,
            q.created_at
        FROM quizzes q
        JOIN users u ON q.user_id = u.id
        WHERE q.user_id = $1
        ORDER BY q.created_at DESC
        "#,
    )
    .bind(teacher_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "data": quizzes })))
}

/// Creates a quiz, optionally with its questions, in one transaction.
/// New quizzes start unpublished.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user_id = claims.user_id();
    authorize(&claims, Action::Create, Resource::Quiz { owner_id: user_id })?;

    if !DIFFICULTIES.contains(&payload.difficulty.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown difficulty '{}'",
            payload.difficulty
        )));
    }

    if let Some(questions) = &payload.questions {
        for q in questions {
            q.check_answer_index()?;
        }
    }

    let description = payload.description.as_deref().map(clean_html);
    let tags = payload.tags.unwrap_or_default();

    let mut tx = pool.begin().await?;

    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (title, description, category, difficulty, time_limit, user_id, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(&description)
    .bind(&payload.category)
    .bind(&payload.difficulty)
    .bind(payload.time_limit)
    .bind(user_id)
    .bind(SqlJson(&tags))
    .fetch_one(&mut *tx)
    .await?;

    if let Some(questions) = &payload.questions {
        for (position, q) in questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO questions
                    (quiz_id, text, options, correct_answer_index, explanation,
                     code_snippet, question_type, points, time_limit, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(quiz_id)
            .bind(clean_html(&q.text))
            .bind(SqlJson(&q.options))
            .bind(q.correct_answer_index)
            .bind(q.explanation.as_deref().map(clean_html))
            .bind(&q.code_snippet)
            .bind(q.question_type.as_deref().unwrap_or("multiple_choice"))
            .bind(q.points.unwrap_or(10))
            .bind(q.time_limit)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": quiz_id }))))
}

/// Updates quiz metadata. Owner or admin.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let quiz = fetch_quiz(&pool, id).await?;
    authorize(&claims, Action::Update, Resource::Quiz { owner_id: quiz.user_id })?;

    if let Some(difficulty) = &payload.difficulty {
        if !DIFFICULTIES.contains(&difficulty.as_str()) {
            return Err(AppError::Validation(format!(
                "Unknown difficulty '{}'",
                difficulty
            )));
        }
    }

    let description = payload.description.as_deref().map(clean_html);
    let tags = payload.tags.map(|t| SqlJson(t));

    sqlx::query(
        r#"
        UPDATE quizzes
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            category = COALESCE($3, category),
            difficulty = COALESCE($4, difficulty),
            time_limit = COALESCE($5, time_limit),
            tags = COALESCE($6, tags),
            updated_at = NOW()
        WHERE id = $7
        "#,
    )
    .bind(&payload.title)
    .bind(&description)
    .bind(&payload.category)
    .bind(&payload.difficulty)
    .bind(payload.time_limit)
    .bind(tags)
    .bind(id)
    .execute(&pool)
    .await?;

    Ok(StatusCode::OK)
}

/// Publishes or unpublishes a quiz. Owner or admin.
pub async fn update_quiz_status(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    authorize(&claims, Action::Update, Resource::Quiz { owner_id: quiz.user_id })?;

    // A quiz without questions cannot be taken, so it cannot go live.
    if payload.is_published {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await?;
        if count == 0 {
            return Err(AppError::InvalidQuizState(
                "Cannot publish a quiz without questions".to_string(),
            ));
        }
    }

    sqlx::query("UPDATE quizzes SET is_published = $1, updated_at = NOW() WHERE id = $2")
        .bind(payload.is_published)
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "id": id, "is_published": payload.is_published })))
}

/// Deletes a quiz and, via cascade, its questions and attempts.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    authorize(&claims, Action::Delete, Resource::Quiz { owner_id: quiz.user_id })?;

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Duplicates a quiz with its questions for the calling teacher. The copy
/// starts as an unpublished draft with zeroed counters.
pub async fn duplicate_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    let user_id = claims.user_id();
    authorize(&claims, Action::Create, Resource::Quiz { owner_id: user_id })?;

    let mut tx = pool.begin().await?;

    let new_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (title, description, category, difficulty, time_limit, user_id, tags)
        SELECT title || ' (copy)', description, category, difficulty, time_limit, $1, tags
        FROM quizzes WHERE id = $2
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(quiz.id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO questions
            (quiz_id, text, options, correct_answer_index, explanation,
             code_snippet, question_type, points, time_limit, position)
        SELECT $1, text, options, correct_answer_index, explanation,
               code_snippet, question_type, points, time_limit, position
        FROM questions WHERE quiz_id = $2
        "#,
    )
    .bind(new_id)
    .bind(quiz.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": new_id }))))
}

/// Per-quiz attempt aggregates for the authoring teacher.
pub async fn quiz_statistics(
    State(pool): State<PgPool>,
    State(config): State<crate::config::Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    authorize(&claims, Action::Read, Resource::Quiz { owner_id: quiz.user_id })?;

    let (attempts, average_score, passed): (i64, Option<f64>, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               AVG(score),
               COUNT(*) FILTER (WHERE score >= $2)
        FROM quiz_attempts
        WHERE quiz_id = $1
        "#,
    )
    .bind(id)
    .bind(config.passing_score)
    .fetch_one(&pool)
    .await?;

    let pass_rate = if attempts > 0 {
        passed as f64 / attempts as f64 * 100.0
    } else {
        0.0
    };

    Ok(Json(json!({
        "quiz_id": id,
        "participants_count": quiz.participants_count,
        "attempts": attempts,
        "average_score": average_score.unwrap_or(0.0),
        "pass_rate": pass_rate,
        "rating": quiz.rating,
    })))
}
