// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{exercise::Exercise, user::Role, window::Window};

/// Represents the 'exams' table ("prova").
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub class_id: i64,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Exam {
    pub fn window(&self) -> Window {
        Window::new(self.starts_at, self.ends_at)
    }

    /// Whether a user with `role`, enrolled (or not) in the exam's class,
    /// may open the exam at `now`.
    ///
    /// Extended access does not apply here: students who need more time get
    /// their own class with a longer exam.
    pub fn is_available_to(&self, role: Role, enrolled: bool, now: DateTime<Utc>) -> bool {
        role.is_staff() || (enrolled && self.window().contains(now))
    }
}

/// Exam with its exercise list, returned once the exam is open.
#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub exercises: Vec<Exercise>,
}

/// DTO for creating an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    pub class_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub exercise_ids: Vec<i64>,
}
