// src/services/classes.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        class::{Class, CreateClassRequest, DateRange, Enrollment},
        window::Window,
    },
};

const CLASS_COLUMNS: &str = "c.id, c.name, c.starts_at, c.ends_at, c.created_at";

pub async fn create(pool: &PgPool, req: &CreateClassRequest) -> Result<Class, AppError> {
    if !Window::new(req.starts_at, req.ends_at).is_well_formed() {
        return Err(AppError::BadRequest(
            "Class must start before it ends".to_string(),
        ));
    }

    let class = sqlx::query_as::<_, Class>(
        r#"
        INSERT INTO classes (name, starts_at, ends_at)
        VALUES ($1, $2, $3)
        RETURNING id, name, starts_at, ends_at, created_at
        "#,
    )
    .bind(&req.name)
    .bind(req.starts_at)
    .bind(req.ends_at)
    .fetch_one(pool)
    .await?;

    tracing::info!(class_id = class.id, "Class created: {}", class.name);
    Ok(class)
}

pub async fn get(pool: &PgPool, class_id: i64) -> Result<Class, AppError> {
    sqlx::query_as::<_, Class>(&format!(
        "SELECT {CLASS_COLUMNS} FROM classes c WHERE c.id = $1"
    ))
    .bind(class_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Class {} not found", class_id)))
}

/// Every class whose window contains `now`.
pub async fn current(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Class>, AppError> {
    let classes = sqlx::query_as::<_, Class>(&format!(
        r#"
        SELECT {CLASS_COLUMNS}
        FROM classes c
        WHERE c.starts_at <= $1 AND c.ends_at >= $1
        ORDER BY c.starts_at, c.id
        "#
    ))
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(classes)
}

/// The classes `user_id` is enrolled in, current or not.
pub async fn of_student(pool: &PgPool, user_id: i64) -> Result<Vec<Class>, AppError> {
    let classes = sqlx::query_as::<_, Class>(&format!(
        r#"
        SELECT {CLASS_COLUMNS}
        FROM classes c
        JOIN enrollments e ON e.class_id = c.id
        WHERE e.user_id = $1
        ORDER BY c.starts_at, c.id
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(classes)
}

/// Enrolled classes that are running at `now`.
pub async fn current_of_student(
    pool: &PgPool,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Class>, AppError> {
    let mut classes = of_student(pool, user_id).await?;
    classes.retain(|c| c.is_current(now));
    Ok(classes)
}

/// Current classes in which the user's enrollment grants extended access.
pub async fn released_current(
    pool: &PgPool,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Class>, AppError> {
    let mut classes = sqlx::query_as::<_, Class>(&format!(
        r#"
        SELECT {CLASS_COLUMNS}
        FROM classes c
        JOIN enrollments e ON e.class_id = c.id
        WHERE e.user_id = $1 AND e.released
        ORDER BY c.starts_at, c.id
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    classes.retain(|c| c.is_current(now));
    Ok(classes)
}

pub async fn is_enrolled(pool: &PgPool, class_id: i64, user_id: i64) -> Result<bool, AppError> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM enrollments WHERE class_id = $1 AND user_id = $2",
    )
    .bind(class_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Enrolls a user. A second enrollment of the same pair is a conflict.
pub async fn enroll(
    pool: &PgPool,
    class_id: i64,
    user_id: i64,
    released: bool,
) -> Result<Enrollment, AppError> {
    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (user_id, class_id, released)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, class_id, released, created_at
        "#,
    )
    .bind(user_id)
    .bind(class_id)
    .bind(released)
    .fetch_one(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict(format!(
            "User {} is already enrolled in class {}",
            user_id, class_id
        )),
        other => other,
    })?;

    tracing::info!(class_id, user_id, released, "User enrolled");
    Ok(enrollment)
}

pub async fn date_range(
    pool: &PgPool,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<DateRange, AppError> {
    let classes = of_student(pool, user_id).await?;
    Ok(DateRange::for_classes(&classes, now))
}
