// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, phase, quiz, statistics, teacher},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, statistics, content, teacher, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route(
                    "/profile/{id}",
                    put(auth::update_profile).delete(auth::delete_profile),
                )
                .layer(require_auth.clone()),
        );

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        .route("/{id}/submit", post(quiz::submit_quiz))
        .layer(require_auth.clone());

    let statistics_routes = Router::new()
        .route("/leaderboard", get(statistics::get_leaderboard))
        .route("/users/{user_id}", get(statistics::get_user_statistics))
        .route("/phase-progress", post(statistics::update_phase_progress))
        .route(
            "/users/{user_id}/phases/{phase}",
            get(statistics::get_phase_progress),
        )
        .layer(require_auth.clone());

    let content_routes = Router::new()
        .route("/phases", get(phase::list_phases).post(phase::create_phase))
        .route(
            "/phases/{id}",
            get(phase::get_phase)
                .put(phase::update_phase)
                .delete(phase::delete_phase),
        )
        .route("/phases/level/{level}", get(phase::phases_by_level))
        .route("/phases/{id}/themes", get(phase::themes_by_phase))
        .route("/themes", get(phase::list_themes).post(phase::create_theme))
        .route(
            "/themes/{id}",
            put(phase::update_theme).delete(phase::delete_theme),
        )
        .route("/themes/{id}/questions", get(phase::questions_by_theme))
        .route("/theme-questions", post(phase::create_theme_question))
        .route("/theme-questions/{id}", delete(phase::delete_theme_question))
        .route(
            "/theme-questions/{id}/reponses",
            get(phase::reponses_by_question),
        )
        .route("/reponses", post(phase::create_reponse))
        .route("/reponses/{id}", delete(phase::delete_reponse))
        .layer(require_auth.clone());

    let teacher_routes = Router::new()
        .route("/teachers/{id}/quizzes", get(teacher::get_teacher_quizzes))
        .route("/quizzes", post(teacher::create_quiz))
        .route(
            "/quizzes/{id}",
            put(teacher::update_quiz).delete(teacher::delete_quiz),
        )
        .route("/quizzes/{id}/status", patch(teacher::update_quiz_status))
        .route("/quizzes/{id}/duplicate", post(teacher::duplicate_quiz))
        .route("/quizzes/{id}/statistics", get(teacher::quiz_statistics))
        .layer(require_auth.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/dashboard-stats", get(admin::dashboard_stats))
        .route("/statistics", get(statistics::get_admin_statistics))
        .route(
            "/statistics/{user_id}/reset",
            post(statistics::reset_user_statistics),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth.clone());

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/statistics", statistics_routes)
        .nest("/api", content_routes)
        .nest("/api/teacher", teacher_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
