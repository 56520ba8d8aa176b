// src/services/exams.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam},
        exercise::Exercise,
        user::User,
        window::Window,
    },
    services::classes,
};

/// Creates an exam and attaches its exercises in one transaction.
pub async fn create(pool: &PgPool, req: &CreateExamRequest) -> Result<Exam, AppError> {
    if !Window::new(req.starts_at, req.ends_at).is_well_formed() {
        return Err(AppError::BadRequest(
            "Exam must start before it ends".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (class_id, title, starts_at, ends_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, class_id, title, starts_at, ends_at
        "#,
    )
    .bind(req.class_id)
    .bind(&req.title)
    .bind(req.starts_at)
    .bind(req.ends_at)
    .fetch_one(&mut *tx)
    .await?;

    if !req.exercise_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO exam_exercises (exam_id, exercise_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(exam.id)
        .bind(&req.exercise_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(exam_id = exam.id, class_id = exam.class_id, "Exam created: {}", exam.title);
    Ok(exam)
}

pub async fn get(pool: &PgPool, exam_id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        "SELECT id, class_id, title, starts_at, ends_at FROM exams WHERE id = $1",
    )
    .bind(exam_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", exam_id)))
}

pub async fn exercises_of(pool: &PgPool, exam_id: i64) -> Result<Vec<Exercise>, AppError> {
    let list = sqlx::query_as::<_, Exercise>(
        r#"
        SELECT x.id, x.title, x.description, x.published, x.created_at
        FROM exercises x
        JOIN exam_exercises ee ON ee.exercise_id = x.id
        WHERE ee.exam_id = $1
        ORDER BY x.id
        "#,
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Whether `user` may open `exam` at `now`.
pub async fn available_to(
    pool: &PgPool,
    exam: &Exam,
    user: &User,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let role = user.role();
    if role.is_staff() {
        return Ok(true);
    }
    let enrolled = classes::is_enrolled(pool, exam.class_id, user.id).await?;
    Ok(exam.is_available_to(role, enrolled, now))
}

/// Every exam `user` may open at `now`.
pub async fn available_for(
    pool: &PgPool,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Vec<Exam>, AppError> {
    let role = user.role();

    let mut list = if role.is_staff() {
        sqlx::query_as::<_, Exam>(
            "SELECT id, class_id, title, starts_at, ends_at FROM exams ORDER BY starts_at, id",
        )
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Exam>(
            r#"
            SELECT x.id, x.class_id, x.title, x.starts_at, x.ends_at
            FROM exams x
            JOIN enrollments e ON e.class_id = x.class_id
            WHERE e.user_id = $1
            ORDER BY x.starts_at, x.id
            "#,
        )
        .bind(user.id)
        .fetch_all(pool)
        .await?
    };

    // Rows of the second query all come from enrolled classes.
    list.retain(|exam| exam.is_available_to(role, true, now));
    Ok(list)
}
