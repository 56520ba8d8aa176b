// src/state.rs

use crate::config::Config;
use axum::extract::FromRef;
use sqlx::PgPool;

/// Shared by every handler. Extract `State<PgPool>` or `State<Config>` directly.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
