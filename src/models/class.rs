// src/models/class.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::window::Window;

/// Represents the 'classes' table (a cohort, "turma").
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Class {
    pub fn window(&self) -> Window {
        Window::new(self.starts_at, self.ends_at)
    }

    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.window().contains(now)
    }
}

/// Represents the 'enrollments' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub class_id: i64,
    /// Extended access: relaxes the start check of scheduled exercises.
    pub released: bool,
    pub created_at: DateTime<Utc>,
}

/// The span of days a student has been active in their current classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Earliest start among the current classes up to `today`.
    /// Falls back to the single day `today` when no class is current.
    pub fn for_classes<'a>(
        classes: impl IntoIterator<Item = &'a Class>,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();
        let start_date = classes
            .into_iter()
            .filter(|c| c.is_current(now))
            .map(|c| c.starts_at.date_naive())
            .min()
            .unwrap_or(today);
        Self::new(start_date, today)
    }

    /// Iterates `[start_date, end_date)` one day at a time.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        self.start_date.iter_days().take_while(move |d| *d < end)
    }
}

/// DTO for creating a class.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// DTO for enrolling a user in a class.
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub user_id: i64,
    #[serde(default)]
    pub released: bool,
}

/// Query parameters for listing the caller's classes.
#[derive(Debug, Deserialize)]
pub struct ClassListParams {
    /// Only classes whose window contains now.
    #[serde(default)]
    pub current: bool,
}
