// src/handlers/mod.rs

pub mod auth;
pub mod exams;
pub mod exercises;
pub mod me;
pub mod staff;
