//! GET /feed: Aggregated, filtered and ranked feed items.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::SecondsFormat;
use futures_util::future::join_all;
use kintai_cache::{normalize_list, params_key};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::feed::filter_and_rank;
use crate::sources::{CollabError, FeedSource};

pub async fn feed_handler(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let list = |name: &str| raw.get(name).map(|v| normalize_list(v)).unwrap_or_default();
    let requested = list("sources");
    let filters = list("filters");
    let keywords = list("keywords");

    let selected = select_sources(&state.feeds, &requested)?;
    let names: Vec<&str> = selected.iter().map(|s| s.name()).collect();

    let sources_joined = names.join(",");
    let filters_joined = filters.join(",");
    let keywords_joined = keywords.join(",");
    let key = params_key([
        ("sources", sources_joined.as_str()),
        ("filters", filters_joined.as_str()),
        ("keywords", keywords_joined.as_str()),
    ]);

    if let Some(hit) = state.feed_cache.get(&key) {
        info!(%key, "feed cache hit");
        return Ok(Json(hit));
    }

    let results = join_all(selected.iter().map(|source| async move {
        (source.name().to_string(), source.fetch().await)
    }))
    .await;

    let mut items = Vec::new();
    let mut failed = Vec::new();
    for (name, result) in results {
        match result {
            Ok(batch) => items.extend(batch),
            Err(e) => {
                warn!(source = %name, "feed source failed: {e}");
                failed.push(name);
            }
        }
    }

    if failed.len() == selected.len() {
        return Err(CollabError::Failed {
            source_name: "feed".to_string(),
            reason: format!("all sources failed: {}", failed.join(", ")),
        }
        .into());
    }

    let ranked = filter_and_rank(items, &filters, &keywords);
    let body = json!({
        "total": ranked.len(),
        "items": ranked,
        "fetchedAt": state.clock.now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "failed": failed,
    });

    // a partial result is served but not kept for the whole TTL
    if failed.is_empty() {
        state.feed_cache.put(key, body.clone());
    }
    Ok(Json(body))
}

fn select_sources(
    all: &[Arc<dyn FeedSource>],
    requested: &[String],
) -> Result<Vec<Arc<dyn FeedSource>>, ApiError> {
    if all.is_empty() {
        return Err(CollabError::NotConfigured {
            source_name: "feed".to_string(),
        }
        .into());
    }
    if requested.is_empty() {
        return Ok(all.to_vec());
    }

    let mut selected: Vec<Arc<dyn FeedSource>> = Vec::with_capacity(requested.len());
    for name in requested {
        let source = all
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| ApiError::bad_request(format!("unknown feed source: {name}")))?;
        if !selected.iter().any(|s| s.name() == name) {
            selected.push(Arc::clone(source));
        }
    }
    Ok(selected)
}
