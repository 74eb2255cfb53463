use axum::{extract::State, Json};
use kintai_core::types::HealthStatus;
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: Liveness probe. Never calls a collaborator.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus::ok(
        env!("CARGO_PKG_VERSION"),
        state.uptime_secs(),
        state.subsystems.clone(),
    ))
}
