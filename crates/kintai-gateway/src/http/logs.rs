//! GET /logs, GET /logs/dates.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{blocking, ApiError};

const DEFAULT_LINES: usize = 200;
const MAX_LINES: usize = 5_000;

/// `?type=<stream>&lines=<n>&date=<YYYY-MM-DD>`; no date reads the active
/// file.
pub async fn read_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let stream = params
        .get("type")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "server".to_string());
    let lines = parse_lines(params.get("lines").map(String::as_str))?;
    let date = params
        .get("date")
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let excerpt = blocking(move || Ok(state.logs.read(&stream, lines, date.as_deref())?)).await?;
    let mut body = serde_json::to_value(&excerpt).map_err(|e| ApiError::internal(e.to_string()))?;
    if let Value::Object(map) = &mut body {
        map.insert("count".to_string(), json!(excerpt.lines.len()));
    }
    Ok(Json(body))
}

/// Archive buckets, newest first.
pub async fn log_dates(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let dates = blocking(move || Ok(state.logs.dates())).await?;
    Ok(Json(json!({ "dates": dates })))
}

fn parse_lines(raw: Option<&str>) -> Result<usize, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(DEFAULT_LINES),
        Some(s) => s
            .parse::<usize>()
            .map(|n| n.min(MAX_LINES))
            .map_err(|_| ApiError::bad_request(format!("invalid lines: {s}"))),
    }
}
