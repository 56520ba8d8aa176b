// src/models/mod.rs

pub mod class;
pub mod exam;
pub mod exercise;
pub mod interaction;
pub mod submission;
pub mod user;
pub mod window;
