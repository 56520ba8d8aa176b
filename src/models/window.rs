// src/models/window.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A closed time interval `[starts_at, ends_at]`.
///
/// Classes, scheduled exercises and exams all carry one of these and decide
/// visibility by comparing it with the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Window {
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        Self { starts_at, ends_at }
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.ends_at
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.has_started(now) && !self.has_ended(now)
    }

    pub fn is_well_formed(&self) -> bool {
        self.starts_at <= self.ends_at
    }
}
