// src/handlers/exams.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::exam::ExamDetail,
    services::{exams, users},
    utils::jwt::Claims,
};

/// Returns the exam and its exercises while it is open to the caller.
pub async fn get_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::find_by_id(&pool, claims.user_id()?).await?;
    let exam = exams::get(&pool, exam_id).await?;

    if !exams::available_to(&pool, &exam, &user, Utc::now()).await? {
        tracing::warn!(exam_id, user_id = user.id, "Exam requested outside its window");
        return Err(AppError::Forbidden("Exam is not available".to_string()));
    }

    let exercises = exams::exercises_of(&pool, exam.id).await?;
    Ok(Json(ExamDetail { exam, exercises }))
}
