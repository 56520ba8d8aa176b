// src/handlers/exercises.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::submission::{CreateSubmissionRequest, SubmissionResponse},
    services::{exercises, interactions, submissions, users},
    utils::jwt::Claims,
};

/// Lists published exercises.
pub async fn list_published(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let list = exercises::published(&pool).await?;
    Ok(Json(list))
}

/// Unpublished exercises are served to staff and to students who can
/// reach them through an open schedule or exam.
pub async fn get_exercise(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exercise_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exercise = exercises::get(&pool, exercise_id).await?;

    if !exercise.published && !claims.role().is_staff() {
        let user = users::find_by_id(&pool, claims.user_id()?).await?;
        if !users::can_work_on(&pool, &user, exercise_id, Utc::now()).await? {
            return Err(AppError::NotFound(format!("Exercise {} not found", exercise_id)));
        }
    }

    Ok(Json(exercise))
}

/// Records a test run result reported for the caller's code.
pub async fn submit(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exercise_id): Path<i64>,
    Json(req): Json<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let user_id = claims.user_id()?;
    // 404 before touching the history.
    exercises::get(&pool, exercise_id).await?;

    let now = Utc::now();
    let user = users::find_by_id(&pool, user_id).await?;
    if !users::can_work_on(&pool, &user, exercise_id, now).await? {
        return Err(AppError::Forbidden(
            "This exercise is not open for you right now".to_string(),
        ));
    }

    let submission = submissions::create(&pool, user_id, exercise_id, &req, now).await?;
    let interaction = interactions::get(&pool, user_id, exercise_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "submission": SubmissionResponse::from(&submission),
            "interaction": interaction,
        })),
    ))
}

/// The caller's submissions to one exercise, newest first.
pub async fn list_my_submissions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exercise_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let list = submissions::by_author(&pool, claims.user_id()?, Some(exercise_id)).await?;
    let list: Vec<SubmissionResponse> = list.iter().map(SubmissionResponse::from).collect();
    Ok(Json(list))
}

pub async fn get_latest_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exercise_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = submissions::latest(&pool, claims.user_id()?, exercise_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No submissions yet".to_string()))?;

    Ok(Json(SubmissionResponse::from(&submission)))
}

pub async fn get_interaction(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exercise_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let interaction = interactions::get(&pool, claims.user_id()?, exercise_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No interaction with this exercise".to_string()))?;

    Ok(Json(interaction))
}

/// Soft deletes one of the caller's submissions. Staff may delete any.
pub async fn delete_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = submissions::get(&pool, submission_id).await?;

    if submission.user_id != claims.user_id()? && !claims.role().is_staff() {
        return Err(AppError::Forbidden(
            "Only the author can delete this submission".to_string(),
        ));
    }

    submissions::soft_delete(&pool, submission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
