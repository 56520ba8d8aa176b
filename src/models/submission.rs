// src/models/submission.rs

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Shown in place of an empty failure list.
pub const NO_FAILURES: &str = "No errors.";
/// Shown in place of an empty stack trace list.
pub const NO_STACK_TRACE: &str = "-";

/// Result of running the exercise tests against a submission.
/// Ordered so that the best outcome compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Error,
    Ok,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(Outcome::Ok),
            "error" => Some(Outcome::Error),
            _ => None,
        }
    }
}

/// Represents the 'submissions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub exercise_id: i64,

    /// 'ok' or 'error'. Mapped through `Outcome`.
    pub outcome: String,

    /// Submitted source code.
    pub source: String,

    /// Failed test messages, stored as a JSON array.
    pub failures: Json<Vec<String>>,

    /// Stack traces matching `failures`, stored as a JSON array.
    pub stack_traces: Json<Vec<String>>,

    /// Soft delete flag. Deleted rows are hidden from every listing.
    #[serde(skip)]
    pub deleted: bool,

    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn outcome(&self) -> Outcome {
        Outcome::parse(&self.outcome).unwrap_or(Outcome::Error)
    }

    pub fn succeeded(&self) -> bool {
        self.outcome() == Outcome::Ok
    }

    /// The failure messages, or a single placeholder when there are none.
    pub fn failures(&self) -> Vec<String> {
        or_placeholder(&self.failures, NO_FAILURES)
    }

    pub fn set_failures(&mut self, failures: Vec<String>) {
        self.failures = Json(failures);
    }

    /// The stack traces, or a single placeholder when there are none.
    pub fn stack_traces(&self) -> Vec<String> {
        or_placeholder(&self.stack_traces, NO_STACK_TRACE)
    }

    pub fn set_stack_traces(&mut self, stack_traces: Vec<String>) {
        self.stack_traces = Json(stack_traces);
    }
}

fn or_placeholder(list: &[String], placeholder: &str) -> Vec<String> {
    if list.is_empty() {
        vec![placeholder.to_string()]
    } else {
        list.to_vec()
    }
}

/// Submission as shown to clients, with placeholders applied.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: i64,
    pub exercise_id: i64,
    pub outcome: Outcome,
    pub succeeded: bool,
    pub failures: Vec<String>,
    pub stack_traces: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Submission> for SubmissionResponse {
    fn from(s: &Submission) -> Self {
        Self {
            id: s.id,
            exercise_id: s.exercise_id,
            outcome: s.outcome(),
            succeeded: s.succeeded(),
            failures: s.failures(),
            stack_traces: s.stack_traces(),
            submitted_at: s.submitted_at,
        }
    }
}

/// The (day, exercise) pair behind the activity chart.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionStamp {
    pub exercise_id: i64,
    pub submitted_at: DateTime<Utc>,
}

/// Distinct exercises submitted per UTC day.
/// Days with no submissions read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyCounts(BTreeMap<NaiveDate, usize>);

impl DailyCounts {
    /// Counts the distinct exercises of each day within `[start, end]`.
    /// Either bound may be left open.
    pub fn from_stamps(
        stamps: impl IntoIterator<Item = SubmissionStamp>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Self {
        let mut per_day: BTreeMap<NaiveDate, BTreeSet<i64>> = BTreeMap::new();
        for stamp in stamps {
            let day = stamp.submitted_at.date_naive();
            if start.is_some_and(|s| day < s) || end.is_some_and(|e| day > e) {
                continue;
            }
            per_day.entry(day).or_default().insert(stamp.exercise_id);
        }
        Self(per_day.into_iter().map(|(d, ex)| (d, ex.len())).collect())
    }

    pub fn get(&self, day: NaiveDate) -> usize {
        self.0.get(&day).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, usize)> + '_ {
        self.0.iter().map(|(d, c)| (*d, *c))
    }
}

/// Query parameters for the activity chart.
#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// DTO for recording a submission result.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    pub outcome: Outcome,
    #[validate(length(max = 100000))]
    #[serde(default)]
    pub source: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub failures: Vec<String>,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub stack_traces: Vec<String>,
}

/// DTO for correcting a stored submission. Omitted fields are kept.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubmissionRequest {
    pub outcome: Option<Outcome>,
    #[validate(length(max = 200))]
    pub failures: Option<Vec<String>>,
    #[validate(length(max = 200))]
    pub stack_traces: Option<Vec<String>>,
}
