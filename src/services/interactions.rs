// src/services/interactions.rs

use sqlx::{PgConnection, PgPool};

use crate::{
    error::AppError,
    models::{interaction::Interaction, submission::Submission},
};

/// Rebuilds the (user, exercise) record from the full submission history.
///
/// Must run inside the transaction that changed the history. An empty
/// history removes the record.
pub async fn recompute(
    conn: &mut PgConnection,
    user_id: i64,
    exercise_id: i64,
) -> Result<Option<Interaction>, AppError> {
    let history = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, user_id, exercise_id, outcome, source, failures, stack_traces, deleted, submitted_at
        FROM submissions
        WHERE user_id = $1 AND exercise_id = $2 AND deleted = FALSE
        "#,
    )
    .bind(user_id)
    .bind(exercise_id)
    .fetch_all(&mut *conn)
    .await?;

    let Some(interaction) = Interaction::from_history(user_id, exercise_id, &history) else {
        sqlx::query("DELETE FROM interactions WHERE user_id = $1 AND exercise_id = $2")
            .bind(user_id)
            .bind(exercise_id)
            .execute(&mut *conn)
            .await?;
        tracing::debug!(user_id, exercise_id, "Interaction cleared");
        return Ok(None);
    };

    sqlx::query(
        r#"
        INSERT INTO interactions (user_id, exercise_id, attempts, best_outcome, last_submission_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, exercise_id) DO UPDATE SET
            attempts = EXCLUDED.attempts,
            best_outcome = EXCLUDED.best_outcome,
            last_submission_at = EXCLUDED.last_submission_at
        "#,
    )
    .bind(interaction.user_id)
    .bind(interaction.exercise_id)
    .bind(interaction.attempts)
    .bind(&interaction.best_outcome)
    .bind(interaction.last_submission_at)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        user_id,
        exercise_id,
        attempts = interaction.attempts,
        best = %interaction.best_outcome,
        "Interaction recomputed"
    );
    Ok(Some(interaction))
}

pub async fn get(
    pool: &PgPool,
    user_id: i64,
    exercise_id: i64,
) -> Result<Option<Interaction>, AppError> {
    let interaction = sqlx::query_as::<_, Interaction>(
        r#"
        SELECT user_id, exercise_id, attempts, best_outcome, last_submission_at
        FROM interactions
        WHERE user_id = $1 AND exercise_id = $2
        "#,
    )
    .bind(user_id)
    .bind(exercise_id)
    .fetch_optional(pool)
    .await?;

    Ok(interaction)
}
