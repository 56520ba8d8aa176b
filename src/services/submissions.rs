// src/services/submissions.rs

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, types::Json};

use crate::{
    error::AppError,
    models::submission::{
        CreateSubmissionRequest, DailyCounts, Submission, SubmissionStamp, UpdateSubmissionRequest,
    },
    services::interactions,
};

const SUBMISSION_COLUMNS: &str =
    "id, user_id, exercise_id, outcome, source, failures, stack_traces, deleted, submitted_at";

/// Serializes history changes of one user so each recompute sees the
/// submissions committed before it.
async fn lock_author(conn: &mut PgConnection, user_id: i64) -> Result<(), AppError> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(())
}

/// Stores a submission made at `submitted_at` and recomputes the author's
/// interaction record.
pub async fn create(
    pool: &PgPool,
    user_id: i64,
    exercise_id: i64,
    req: &CreateSubmissionRequest,
    submitted_at: DateTime<Utc>,
) -> Result<Submission, AppError> {
    let mut tx = pool.begin().await?;
    lock_author(&mut tx, user_id).await?;

    let submission = sqlx::query_as::<_, Submission>(&format!(
        r#"
        INSERT INTO submissions
            (user_id, exercise_id, outcome, source, failures, stack_traces, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {SUBMISSION_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(exercise_id)
    .bind(req.outcome.as_str())
    .bind(&req.source)
    .bind(Json(&req.failures))
    .bind(Json(&req.stack_traces))
    .bind(submitted_at)
    .fetch_one(&mut *tx)
    .await?;

    interactions::recompute(&mut tx, user_id, exercise_id).await?;
    tx.commit().await?;

    tracing::info!(
        submission_id = submission.id,
        user_id,
        exercise_id,
        outcome = %submission.outcome,
        "Submission recorded"
    );
    Ok(submission)
}

/// Corrects a stored submission and recomputes the interaction record.
pub async fn update(
    pool: &PgPool,
    submission_id: i64,
    req: &UpdateSubmissionRequest,
) -> Result<Submission, AppError> {
    let current = get(pool, submission_id).await?;

    let mut tx = pool.begin().await?;
    lock_author(&mut tx, current.user_id).await?;

    let submission = sqlx::query_as::<_, Submission>(&format!(
        r#"
        UPDATE submissions
        SET outcome = COALESCE($2, outcome),
            failures = COALESCE($3, failures),
            stack_traces = COALESCE($4, stack_traces)
        WHERE id = $1 AND deleted = FALSE
        RETURNING {SUBMISSION_COLUMNS}
        "#
    ))
    .bind(submission_id)
    .bind(req.outcome.map(|o| o.as_str()))
    .bind(req.failures.as_ref().map(Json))
    .bind(req.stack_traces.as_ref().map(Json))
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))?;

    interactions::recompute(&mut tx, submission.user_id, submission.exercise_id).await?;
    tx.commit().await?;

    tracing::info!(submission_id, outcome = %submission.outcome, "Submission updated");
    Ok(submission)
}

/// Hides a submission from every listing and drops it from the interaction.
pub async fn soft_delete(pool: &PgPool, submission_id: i64) -> Result<Submission, AppError> {
    let current = get(pool, submission_id).await?;

    let mut tx = pool.begin().await?;
    lock_author(&mut tx, current.user_id).await?;

    let submission = sqlx::query_as::<_, Submission>(&format!(
        r#"
        UPDATE submissions SET deleted = TRUE
        WHERE id = $1 AND deleted = FALSE
        RETURNING {SUBMISSION_COLUMNS}
        "#
    ))
    .bind(submission_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))?;

    interactions::recompute(&mut tx, submission.user_id, submission.exercise_id).await?;
    tx.commit().await?;

    tracing::info!(submission_id, "Submission deleted");
    Ok(submission)
}

/// A non-deleted submission by id.
pub async fn get(pool: &PgPool, submission_id: i64) -> Result<Submission, AppError> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1 AND deleted = FALSE"
    ))
    .bind(submission_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))
}

/// Every non-deleted submission, newest first.
pub async fn all(pool: &PgPool) -> Result<Vec<Submission>, AppError> {
    let list = sqlx::query_as::<_, Submission>(&format!(
        r#"
        SELECT {SUBMISSION_COLUMNS}
        FROM submissions
        WHERE deleted = FALSE
        ORDER BY submitted_at DESC, id DESC
        "#
    ))
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// The author's non-deleted submissions, optionally for one exercise.
pub async fn by_author(
    pool: &PgPool,
    user_id: i64,
    exercise_id: Option<i64>,
) -> Result<Vec<Submission>, AppError> {
    let list = sqlx::query_as::<_, Submission>(&format!(
        r#"
        SELECT {SUBMISSION_COLUMNS}
        FROM submissions
        WHERE user_id = $1 AND deleted = FALSE
          AND ($2::BIGINT IS NULL OR exercise_id = $2)
        ORDER BY submitted_at DESC, id DESC
        "#
    ))
    .bind(user_id)
    .bind(exercise_id)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// The most recent non-deleted submission of `user_id` to `exercise_id`.
pub async fn latest(
    pool: &PgPool,
    user_id: i64,
    exercise_id: i64,
) -> Result<Option<Submission>, AppError> {
    let submission = sqlx::query_as::<_, Submission>(&format!(
        r#"
        SELECT {SUBMISSION_COLUMNS}
        FROM submissions
        WHERE user_id = $1 AND exercise_id = $2 AND deleted = FALSE
        ORDER BY submitted_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(user_id)
    .bind(exercise_id)
    .fetch_optional(pool)
    .await?;

    Ok(submission)
}

/// Distinct exercises submitted per day by `user_id`, within optional
/// inclusive bounds.
pub async fn exercises_per_day(
    pool: &PgPool,
    user_id: i64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<DailyCounts, AppError> {
    let stamps = sqlx::query_as::<_, SubmissionStamp>(
        r#"
        SELECT exercise_id, submitted_at
        FROM submissions
        WHERE user_id = $1
          AND deleted = FALSE
          AND ($2::DATE IS NULL OR (submitted_at AT TIME ZONE 'UTC')::date >= $2)
          AND ($3::DATE IS NULL OR (submitted_at AT TIME ZONE 'UTC')::date <= $3)
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(DailyCounts::from_stamps(stamps, start, end))
}
