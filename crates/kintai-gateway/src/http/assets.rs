//! Static client assets, served as the router fallback.
//!
//! Only a fixed set of names is served; anything else is a JSON 404.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::app::AppState;
use crate::error::ApiError;

const ASSETS: &[&str] = &[
    "index.html",
    "manifest.json",
    "sw.js",
    "app.js",
    "style.css",
    "favicon.ico",
    "icon-192.png",
    "icon-512.png",
];

/// Stale copies of these break client updates.
const NO_CACHE: &[&str] = &["manifest.json", "sw.js"];

pub async fn static_fallback(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return ApiError::not_found(format!("{} {}", method, uri.path())).into_response();
    }

    let Some(name) = asset_name(uri.path()) else {
        return ApiError::not_found(uri.path().to_string()).into_response();
    };

    let path = state.config.static_dir().join(name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mut resp = (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type(name))],
                bytes,
            )
                .into_response();
            if NO_CACHE.contains(&name) {
                resp.headers_mut().insert(
                    header::CACHE_CONTROL,
                    header::HeaderValue::from_static("no-cache, no-store, must-revalidate"),
                );
            }
            resp
        }
        Err(_) => ApiError::not_found(uri.path().to_string()).into_response(),
    }
}

/// `/` is the index; other paths must name a known asset exactly.
fn asset_name(path: &str) -> Option<&'static str> {
    let trimmed = path.trim_start_matches('/');
    let wanted = if trimmed.is_empty() { "index.html" } else { trimmed };
    ASSETS.iter().copied().find(|a| *a == wanted)
}

pub fn content_type(name: &str) -> &'static str {
    match name.rsplit('.').next().unwrap_or_default() {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
