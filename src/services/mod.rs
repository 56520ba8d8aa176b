// src/services/mod.rs
//
// Query layer: loads records with sqlx and applies the rules in `models`.

pub mod classes;
pub mod exams;
pub mod exercises;
pub mod interactions;
pub mod submissions;
pub mod users;
