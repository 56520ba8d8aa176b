// src/handlers/staff.rs
//
// Course management. Mounted behind `staff_middleware`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        class::{CreateClassRequest, EnrollRequest},
        exam::CreateExamRequest,
        exercise::{CreateExerciseRequest, PublishRequest, ScheduleExerciseRequest},
        submission::{SubmissionResponse, UpdateSubmissionRequest},
    },
    services::{classes, exams, exercises, interactions, submissions},
};

pub async fn create_class(
    State(pool): State<PgPool>,
    Json(req): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let class = classes::create(&pool, &req).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn enroll(
    State(pool): State<PgPool>,
    Path(class_id): Path<i64>,
    Json(req): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let enrollment = classes::enroll(&pool, class_id, req.user_id, req.released).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub async fn check_enrollment(
    State(pool): State<PgPool>,
    Path((class_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    classes::get(&pool, class_id).await?;
    let enrolled = classes::is_enrolled(&pool, class_id, user_id).await?;
    Ok(Json(json!({ "class_id": class_id, "user_id": user_id, "enrolled": enrolled })))
}

pub async fn create_exercise(
    State(pool): State<PgPool>,
    Json(req): Json<CreateExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let exercise = exercises::create(&pool, &req).await?;
    Ok((StatusCode::CREATED, Json(exercise)))
}

pub async fn set_published(
    State(pool): State<PgPool>,
    Path(exercise_id): Path<i64>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exercise = exercises::set_published(&pool, exercise_id, req.published).await?;
    Ok(Json(exercise))
}

pub async fn schedule_exercise(
    State(pool): State<PgPool>,
    Path(class_id): Path<i64>,
    Json(req): Json<ScheduleExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let scheduled = exercises::schedule(&pool, class_id, &req).await?;
    Ok((StatusCode::CREATED, Json(scheduled)))
}

pub async fn create_exam(
    State(pool): State<PgPool>,
    Json(req): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let exam = exams::create(&pool, &req).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

/// Corrects a submission result; the interaction record follows.
pub async fn update_submission(
    State(pool): State<PgPool>,
    Path(submission_id): Path<i64>,
    Json(req): Json<UpdateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let submission = submissions::update(&pool, submission_id, &req).await?;
    let interaction =
        interactions::get(&pool, submission.user_id, submission.exercise_id).await?;

    Ok(Json(json!({
        "submission": SubmissionResponse::from(&submission),
        "interaction": interaction,
    })))
}
