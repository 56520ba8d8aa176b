// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exams, exercises, me, staff},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, me, exercises, exams, staff).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let me_routes = Router::new()
        .route("/", get(me::get_me))
        .route("/classes", get(me::list_my_classes))
        .route("/date-range", get(me::get_my_date_range))
        .route("/exercises", get(me::list_my_exercises))
        .route("/scheduled-exercises", get(me::list_my_scheduled_exercises))
        .route("/exams", get(me::list_my_exams))
        .route("/activity", get(me::get_my_activity))
        .layer(auth_layer.clone());

    let exercise_routes = Router::new()
        .route("/", get(exercises::list_published))
        .route("/{id}", get(exercises::get_exercise))
        .route(
            "/{id}/submissions",
            get(exercises::list_my_submissions).post(exercises::submit),
        )
        .route(
            "/{id}/submissions/latest",
            get(exercises::get_latest_submission),
        )
        .route("/{id}/interaction", get(exercises::get_interaction))
        .layer(auth_layer.clone());

    let submission_routes = Router::new()
        .route("/{id}", delete(exercises::delete_submission))
        .layer(auth_layer.clone());

    let exam_routes = Router::new()
        .route("/{id}", get(exams::get_exam))
        .layer(auth_layer.clone());

    let staff_routes = Router::new()
        .route("/classes", post(staff::create_class))
        .route("/classes/{id}/enrollments", post(staff::enroll))
        .route(
            "/classes/{id}/enrollments/{user_id}",
            get(staff::check_enrollment),
        )
        .route("/classes/{id}/schedule", post(staff::schedule_exercise))
        .route("/exercises", post(staff::create_exercise))
        .route("/exercises/{id}/publish", put(staff::set_published))
        .route("/exams", post(staff::create_exam))
        .route("/submissions/{id}", put(staff::update_submission))
        // Auth runs first, then the staff check
        .layer(middleware::from_fn(staff_middleware))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/me", me_routes)
        .nest("/api/exercises", exercise_routes)
        .nest("/api/submissions", submission_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/staff", staff_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
