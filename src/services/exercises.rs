// src/services/exercises.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        exercise::{
            CreateExerciseRequest, EnrolledSchedule, Exercise, ScheduleExerciseRequest,
            ScheduledExercise, visible_schedules,
        },
        user::User,
        window::Window,
    },
    utils::html::clean_html,
};

const EXERCISE_COLUMNS: &str = "id, title, description, published, created_at";

pub async fn create(pool: &PgPool, req: &CreateExerciseRequest) -> Result<Exercise, AppError> {
    let exercise = sqlx::query_as::<_, Exercise>(&format!(
        r#"
        INSERT INTO exercises (title, description, published)
        VALUES ($1, $2, $3)
        RETURNING {EXERCISE_COLUMNS}
        "#
    ))
    .bind(&req.title)
    .bind(clean_html(&req.description))
    .bind(req.published)
    .fetch_one(pool)
    .await?;

    tracing::info!(exercise_id = exercise.id, "Exercise created: {}", exercise.title);
    Ok(exercise)
}

pub async fn get(pool: &PgPool, exercise_id: i64) -> Result<Exercise, AppError> {
    sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = $1"
    ))
    .bind(exercise_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Exercise {} not found", exercise_id)))
}

pub async fn all(pool: &PgPool) -> Result<Vec<Exercise>, AppError> {
    let list = sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Only exercises marked as published.
pub async fn published(pool: &PgPool) -> Result<Vec<Exercise>, AppError> {
    let list = sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE published ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(list)
}

pub async fn by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Exercise>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let list = sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ANY($1) ORDER BY id"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

pub async fn set_published(
    pool: &PgPool,
    exercise_id: i64,
    published: bool,
) -> Result<Exercise, AppError> {
    sqlx::query_as::<_, Exercise>(&format!(
        "UPDATE exercises SET published = $2 WHERE id = $1 RETURNING {EXERCISE_COLUMNS}"
    ))
    .bind(exercise_id)
    .bind(published)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Exercise {} not found", exercise_id)))
}

/// Opens an exercise to a class during its own window.
pub async fn schedule(
    pool: &PgPool,
    class_id: i64,
    req: &ScheduleExerciseRequest,
) -> Result<ScheduledExercise, AppError> {
    if !Window::new(req.starts_at, req.ends_at).is_well_formed() {
        return Err(AppError::BadRequest(
            "Schedule must start before it ends".to_string(),
        ));
    }

    let scheduled = sqlx::query_as::<_, ScheduledExercise>(
        r#"
        INSERT INTO scheduled_exercises (exercise_id, class_id, starts_at, ends_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, exercise_id, class_id, starts_at, ends_at
        "#,
    )
    .bind(req.exercise_id)
    .bind(class_id)
    .bind(req.starts_at)
    .bind(req.ends_at)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        scheduled_id = scheduled.id,
        class_id,
        exercise_id = req.exercise_id,
        "Exercise scheduled"
    );
    Ok(scheduled)
}

/// Scheduled exercises open to `user` at `now`.
pub async fn scheduled_available_to(
    pool: &PgPool,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Vec<ScheduledExercise>, AppError> {
    if user.role().is_staff() {
        let list = sqlx::query_as::<_, ScheduledExercise>(
            r#"
            SELECT id, exercise_id, class_id, starts_at, ends_at
            FROM scheduled_exercises
            ORDER BY starts_at, id
            "#,
        )
        .fetch_all(pool)
        .await?;
        return Ok(list);
    }

    let rows = sqlx::query_as::<_, EnrolledSchedule>(
        r#"
        SELECT
            s.id, s.exercise_id, s.class_id, s.starts_at, s.ends_at,
            c.starts_at AS class_starts_at,
            c.ends_at AS class_ends_at,
            e.released
        FROM scheduled_exercises s
        JOIN classes c ON c.id = s.class_id
        JOIN enrollments e ON e.class_id = c.id AND e.user_id = $1
        "#,
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    Ok(visible_schedules(user.role(), rows, now))
}
