// src/models/interaction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::submission::{Outcome, Submission};

/// Represents the 'interactions' table: a user's standing on one exercise.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: i64,
    pub exercise_id: i64,
    pub attempts: i64,
    /// 'ok' or 'error'.
    pub best_outcome: String,
    pub last_submission_at: DateTime<Utc>,
}

impl Interaction {
    /// Rebuilds the record from the pair's full submission history.
    ///
    /// Deleted submissions are ignored. Returns `None` when nothing is left.
    pub fn from_history(
        user_id: i64,
        exercise_id: i64,
        history: &[Submission],
    ) -> Option<Self> {
        let live: Vec<&Submission> = history
            .iter()
            .filter(|s| !s.deleted && s.user_id == user_id && s.exercise_id == exercise_id)
            .collect();

        let best = live.iter().map(|s| s.outcome()).max()?;
        let last = live.iter().map(|s| s.submitted_at).max()?;

        Some(Self {
            user_id,
            exercise_id,
            attempts: live.len() as i64,
            best_outcome: best.as_str().to_string(),
            last_submission_at: last,
        })
    }

    pub fn best_outcome(&self) -> Outcome {
        Outcome::parse(&self.best_outcome).unwrap_or(Outcome::Error)
    }
}
