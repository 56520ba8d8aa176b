// src/handlers/me.rs
//
// Views scoped to the authenticated user.

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        class::ClassListParams,
        submission::ActivityParams,
        user::MeResponse,
    },
    services::{classes, exercises, submissions, users},
    utils::jwt::Claims,
};

/// Current user's profile, with the classes where they have extended access.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::find_by_id(&pool, claims.user_id()?).await?;
    let released_classes = classes::released_current(&pool, user.id, Utc::now()).await?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        created_at: user.created_at,
        released_classes,
    }))
}

/// Classes the user is enrolled in. `?current=true` keeps only running ones.
pub async fn list_my_classes(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ClassListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let list = if params.current {
        classes::current_of_student(&pool, user_id, Utc::now()).await?
    } else {
        classes::of_student(&pool, user_id).await?
    };

    Ok(Json(list))
}

pub async fn get_my_date_range(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let range = classes::date_range(&pool, claims.user_id()?, Utc::now()).await?;
    Ok(Json(range))
}

pub async fn list_my_exercises(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::find_by_id(&pool, claims.user_id()?).await?;
    let list = users::available_exercises(&pool, &user, Utc::now()).await?;
    Ok(Json(list))
}

pub async fn list_my_scheduled_exercises(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::find_by_id(&pool, claims.user_id()?).await?;
    let list = exercises::scheduled_available_to(&pool, &user, Utc::now()).await?;
    Ok(Json(list))
}

pub async fn list_my_exams(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users::find_by_id(&pool, claims.user_id()?).await?;
    let list = users::available_exams(&pool, &user, Utc::now()).await?;
    Ok(Json(list))
}

/// Distinct exercises submitted per day, for the activity chart.
pub async fn get_my_activity(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ActivityParams>,
) -> Result<impl IntoResponse, AppError> {
    if let (Some(start), Some(end)) = (params.start, params.end) {
        if start > end {
            return Err(AppError::BadRequest("start must not be after end".to_string()));
        }
    }

    let counts =
        submissions::exercises_per_day(&pool, claims.user_id()?, params.start, params.end).await?;

    let days: Vec<_> = counts
        .iter()
        .map(|(day, count)| json!({ "day": day, "count": count }))
        .collect();

    Ok(Json(json!({
        "total": counts.total(),
        "days": days,
    })))
}
