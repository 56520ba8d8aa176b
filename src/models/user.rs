// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid username regex"));

/// Platform role. Staff bypass every availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }

    /// Unknown values fall back to the least privileged role.
    pub fn parse(s: &str) -> Self {
        match s {
            "staff" => Role::Staff,
            _ => Role::Student,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff)
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// 'student' or 'staff'.
    pub role: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

/// Profile of the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Current classes where this user has extended access.
    pub released_classes: Vec<crate::models::class::Class>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(
            min = 3,
            max = 50,
            message = "Username length must be between 3 and 50 characters."
        ),
        regex(path = *USERNAME_RE, message = "Username may only contain letters, digits, '.', '_' and '-'.")
    )]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
