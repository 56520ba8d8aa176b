// src/services/users.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        exercise::Exercise,
        user::{Role, User},
    },
    services::{exams, exercises},
};

pub async fn create(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password, role)
        VALUES ($1, $2, $3)
        RETURNING id, username, password, role, created_at
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict(format!("Username '{}' already exists", username))
        }
        other => {
            tracing::error!("Failed to create user: {:?}", other);
            other
        }
    })?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Exercises the user can work on at `now`.
///
/// Staff get the whole catalogue. Students get the union of the exercises
/// behind their open schedules and the exercises of their open exams.
pub async fn available_exercises(
    pool: &PgPool,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Vec<Exercise>, AppError> {
    if user.role().is_staff() {
        return exercises::all(pool).await;
    }

    let mut ids: BTreeSet<i64> = exercises::scheduled_available_to(pool, user, now)
        .await?
        .into_iter()
        .map(|s| s.exercise_id)
        .collect();

    for exam in exams::available_for(pool, user, now).await? {
        ids.extend(exams::exercises_of(pool, exam.id).await?.into_iter().map(|e| e.id));
    }

    let ids: Vec<i64> = ids.into_iter().collect();
    exercises::by_ids(pool, &ids).await
}

/// Whether `exercise_id` is among the user's available exercises at `now`.
pub async fn can_work_on(
    pool: &PgPool,
    user: &User,
    exercise_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    if user.role().is_staff() {
        return Ok(true);
    }

    let available = available_exercises(pool, user, now).await?;
    Ok(available.iter().any(|e| e.id == exercise_id))
}

pub async fn available_exams(
    pool: &PgPool,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Vec<Exam>, AppError> {
    exams::available_for(pool, user, now).await
}
