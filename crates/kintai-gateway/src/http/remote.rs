//! GET /remote-data: Cached access to the attendance scraper.
//!
//! Every query parameter is read as a comma list. Without `months` the
//! current local month is requested. Identical normalized parameter sets
//! share one cache entry; concurrent cold misses for the same key each call
//! the scraper.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Local;
use kintai_cache::{normalize_list, params_key};
use serde_json::Value;
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::sources::Params;

const SNAPSHOT_NAME: &str = "remote-data";

pub async fn remote_data(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let params = normalize_params(&raw, &state);
    let joined: Vec<(&str, String)> = params.iter().map(|(k, v)| (k.as_str(), v.join(","))).collect();
    let key = params_key(joined.iter().map(|(k, v)| (*k, v.as_str())));

    if let Some(hit) = state.remote_cache.get(&key) {
        info!(%key, "remote cache hit");
        return Ok(Json(hit));
    }

    info!(%key, source = state.remote.name(), "remote cache miss");
    let value = state.remote.fetch(&params).await?;
    state.remote_cache.put(key, value.clone());
    spawn_snapshot(&state, value.clone());

    Ok(Json(value))
}

fn normalize_params(raw: &HashMap<String, String>, state: &AppState) -> Params {
    let mut params: Params = raw
        .iter()
        .map(|(k, v)| (k.trim().to_string(), normalize_list(v)))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();

    params.entry("months".to_string()).or_insert_with(|| {
        let month = state.clock.now().with_timezone(&Local).format("%Y-%m");
        vec![month.to_string()]
    });
    params
}

/// Keep the last good scrape on disk; failures only cost the snapshot.
fn spawn_snapshot(state: &Arc<AppState>, value: Value) {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        if let Err(e) = state.store.snapshot(SNAPSHOT_NAME, &value) {
            warn!("remote-data snapshot failed: {e}");
        }
    });
}
