use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use kintai_supervisor::schedule_restart;
use serde_json::{json, Value};

use crate::app::AppState;

/// POST /restart: Answer first, then have the supervisor restart us after
/// a short delay.
pub async fn restart_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let sup = &state.config.supervisor;
    schedule_restart(
        state.restart.clone(),
        Duration::from_secs(sup.restart_delay_secs),
        Duration::from_secs(sup.command_timeout_secs),
    );
    Json(json!({
        "ok": true,
        "message": "restart scheduled",
        "delaySecs": sup.restart_delay_secs,
        "command": state.restart.display(),
    }))
}
