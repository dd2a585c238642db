// src/handlers/phase.rs
//
// Curriculum content tree: phases, themes, theme questions and their
// answer options. Plain CRUD plus nested reads; writes go through the
// content policy (teacher or admin).

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::phase::{
        CreatePhaseRequest, CreateReponseRequest, CreateThemeQuestionRequest, CreateThemeRequest,
        PHASE_LEVELS, Phase, Reponse, Theme, ThemeQuestion, UpdatePhaseRequest, UpdateThemeRequest,
    },
    utils::{
        jwt::Claims,
        policy::{Action, Resource, authorize},
    },
};

const PHASE_COLS: &str =
    "SELECT id, title, level, category, status, average, user_id, created_at FROM phases";
const THEME_COLS: &str = "SELECT id, title, score, phase_id, created_at FROM themes";
const QUESTION_COLS: &str =
    "SELECT id, theme_id, text, question_type, points, position, created_at FROM theme_questions";
const REPONSE_COLS: &str =
    "SELECT id, question_id, body, value, correct, created_at FROM reponses";

fn check_level(level: &str) -> Result<(), AppError> {
    if !PHASE_LEVELS.contains(&level) {
        return Err(AppError::Validation(format!("Unknown level '{}'", level)));
    }
    Ok(())
}

// ---- Phases ----

pub async fn list_phases(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let phases = sqlx::query_as::<_, Phase>(&format!("{} ORDER BY id", PHASE_COLS))
        .fetch_all(&pool)
        .await?;

    let count = phases.len();
    Ok(Json(json!({ "data": phases, "count": count })))
}

pub async fn get_phase(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let phase = sqlx::query_as::<_, Phase>(&format!("{} WHERE id = $1", PHASE_COLS))
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Phase not found".to_string()))?;

    let themes = sqlx::query_as::<_, Theme>(&format!("{} WHERE phase_id = $1 ORDER BY id", THEME_COLS))
        .bind(id)
        .fetch_all(&pool)
        .await?;

    Ok(Json(json!({ "data": phase, "themes": themes })))
}

pub async fn create_phase(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePhaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }
    authorize(&claims, Action::Create, Resource::Content)?;

    let level = payload.level.unwrap_or_else(|| "undefined".to_string());
    check_level(&level)?;

    let phase = sqlx::query_as::<_, Phase>(
        r#"
        INSERT INTO phases (title, level, category, average, user_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, title, level, category, status, average, user_id, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(&level)
    .bind(payload.category.as_deref().unwrap_or("programming"))
    .bind(payload.average.unwrap_or(0))
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Phase '{}' already exists", payload.title))
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "data": phase }))))
}

pub async fn update_phase(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePhaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }
    authorize(&claims, Action::Update, Resource::Content)?;

    if let Some(level) = &payload.level {
        check_level(level)?;
    }

    let phase = sqlx::query_as::<_, Phase>(
        r#"
        UPDATE phases
        SET title = COALESCE($1, title),
            level = COALESCE($2, level),
            category = COALESCE($3, category),
            status = COALESCE($4, status),
            average = COALESCE($5, average)
        WHERE id = $6
        RETURNING id, title, level, category, status, average, user_id, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.level)
    .bind(&payload.category)
    .bind(&payload.status)
    .bind(payload.average)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Phase not found".to_string()))?;

    Ok(Json(json!({ "data": phase })))
}

pub async fn delete_phase(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Action::Delete, Resource::Content)?;

    let result = sqlx::query("DELETE FROM phases WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Phase not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn phases_by_level(
    State(pool): State<PgPool>,
    Path(level): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    check_level(&level)?;

    let phases = sqlx::query_as::<_, Phase>(&format!(
        "{} WHERE level = $1 ORDER BY id",
        PHASE_COLS
    ))
    .bind(&level)
    .fetch_all(&pool)
    .await?;

    let count = phases.len();
    Ok(Json(json!({ "data": phases, "count": count })))
}

// ---- Themes ----

pub async fn list_themes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let themes = sqlx::query_as::<_, Theme>(&format!("{} ORDER BY id", THEME_COLS))
        .fetch_all(&pool)
        .await?;

    Ok(Json(json!({ "data": themes })))
}

pub async fn themes_by_phase(
    State(pool): State<PgPool>,
    Path(phase_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM phases WHERE id = $1")
        .bind(phase_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Phase not found".to_string()));
    }

    let themes = sqlx::query_as::<_, Theme>(&format!(
        "{} WHERE phase_id = $1 ORDER BY id",
        THEME_COLS
    ))
    .bind(phase_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "data": themes })))
}

pub async fn create_theme(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateThemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }
    authorize(&claims, Action::Create, Resource::Content)?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM phases WHERE id = $1")
        .bind(payload.phase_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Phase not found".to_string()));
    }

    let theme = sqlx::query_as::<_, Theme>(
        r#"
        INSERT INTO themes (title, score, phase_id)
        VALUES ($1, $2, $3)
        RETURNING id, title, score, phase_id, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(payload.score.unwrap_or(0))
    .bind(payload.phase_id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": theme }))))
}

pub async fn update_theme(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateThemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }
    authorize(&claims, Action::Update, Resource::Content)?;

    let theme = sqlx::query_as::<_, Theme>(
        r#"
        UPDATE themes
        SET title = COALESCE($1, title),
            score = COALESCE($2, score)
        WHERE id = $3
        RETURNING id, title, score, phase_id, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(payload.score)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Theme not found".to_string()))?;

    Ok(Json(json!({ "data": theme })))
}

pub async fn delete_theme(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Action::Delete, Resource::Content)?;

    let result = sqlx::query("DELETE FROM themes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Theme not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---- Theme questions ----

pub async fn questions_by_theme(
    State(pool): State<PgPool>,
    Path(theme_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM themes WHERE id = $1")
        .bind(theme_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Theme not found".to_string()));
    }

    let questions = sqlx::query_as::<_, ThemeQuestion>(&format!(
        "{} WHERE theme_id = $1 ORDER BY position, id",
        QUESTION_COLS
    ))
    .bind(theme_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "data": questions })))
}

pub async fn create_theme_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateThemeQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }
    authorize(&claims, Action::Create, Resource::Content)?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM themes WHERE id = $1")
        .bind(payload.theme_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Theme not found".to_string()));
    }

    let question = sqlx::query_as::<_, ThemeQuestion>(
        r#"
        INSERT INTO theme_questions (theme_id, text, question_type, points, position)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, theme_id, text, question_type, points, position, created_at
        "#,
    )
    .bind(payload.theme_id)
    .bind(&payload.text)
    .bind(payload.question_type.as_deref().unwrap_or("multiple_choice"))
    .bind(payload.points.unwrap_or(10))
    .bind(payload.position.unwrap_or(0))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": question }))))
}

pub async fn delete_theme_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Action::Delete, Resource::Content)?;

    let result = sqlx::query("DELETE FROM theme_questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---- Answer options (reponses) ----

pub async fn reponses_by_question(
    State(pool): State<PgPool>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM theme_questions WHERE id = $1")
        .bind(question_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    let reponses = sqlx::query_as::<_, Reponse>(&format!(
        "{} WHERE question_id = $1 ORDER BY id",
        REPONSE_COLS
    ))
    .bind(question_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "data": reponses })))
}

pub async fn create_reponse(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateReponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }
    authorize(&claims, Action::Create, Resource::Content)?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM theme_questions WHERE id = $1")
        .bind(payload.question_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    let reponse = sqlx::query_as::<_, Reponse>(
        r#"
        INSERT INTO reponses (question_id, body, value, correct)
        VALUES ($1, $2, $3, $4)
        RETURNING id, question_id, body, value, correct, created_at
        "#,
    )
    .bind(payload.question_id)
    .bind(&payload.body)
    .bind(payload.value.unwrap_or(0))
    .bind(payload.correct.unwrap_or(false))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": reponse }))))
}

pub async fn delete_reponse(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Action::Delete, Resource::Content)?;

    let result = sqlx::query("DELETE FROM reponses WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Reponse not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
