// src/models/exercise.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{user::Role, window::Window};

/// Represents the 'exercises' table (a programming exercise).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub title: String,
    /// Sanitized HTML.
    pub description: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'scheduled_exercises' table: an exercise opened to a
/// class during its own window, independent of the class window.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ScheduledExercise {
    pub id: i64,
    pub exercise_id: i64,
    pub class_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ScheduledExercise {
    pub fn window(&self) -> Window {
        Window::new(self.starts_at, self.ends_at)
    }
}

/// A schedule seen through one of the viewer's enrollments.
///
/// Loaded by joining `scheduled_exercises` with the class and the viewer's
/// enrollment in it, so the visibility rule can run without further queries.
#[derive(Debug, Clone, FromRow)]
pub struct EnrolledSchedule {
    #[sqlx(flatten)]
    pub schedule: ScheduledExercise,
    pub class_starts_at: DateTime<Utc>,
    pub class_ends_at: DateTime<Utc>,
    pub released: bool,
}

impl EnrolledSchedule {
    /// Visibility of a schedule to an enrolled student.
    ///
    /// The class must be current. A regular enrollment needs the schedule
    /// window to contain `now`; a released one only needs it not to have
    /// ended yet.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if !Window::new(self.class_starts_at, self.class_ends_at).contains(now) {
            return false;
        }
        let window = self.schedule.window();
        if self.released {
            !window.has_ended(now)
        } else {
            window.contains(now)
        }
    }
}

/// Keeps the schedules `role` may see at `now`.
pub fn visible_schedules(
    role: Role,
    rows: Vec<EnrolledSchedule>,
    now: DateTime<Utc>,
) -> Vec<ScheduledExercise> {
    let mut out: Vec<ScheduledExercise> = rows
        .into_iter()
        .filter(|row| role.is_staff() || row.is_open(now))
        .map(|row| row.schedule)
        .collect();
    out.sort_by_key(|s| (s.starts_at, s.id));
    out.dedup_by_key(|s| s.id);
    out
}

/// DTO for creating an exercise.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExerciseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

/// DTO for toggling publication.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub published: bool,
}

/// DTO for scheduling an exercise on a class.
#[derive(Debug, Deserialize)]
pub struct ScheduleExerciseRequest {
    pub exercise_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}
