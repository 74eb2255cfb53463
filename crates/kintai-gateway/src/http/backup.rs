//! /backup/*: Mirrored backups of a document.
//!
//! `?doc=` picks the document; the first mirrored key from config is the
//! default.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{blocking, ApiError};

type Params = Query<HashMap<String, String>>;

#[derive(Debug, Default, Deserialize)]
struct RestoreBody {
    file: Option<String>,
}

fn document(state: &AppState, params: &HashMap<String, String>) -> Result<String, ApiError> {
    let doc = match params.get("doc").map(|d| d.trim()).filter(|d| !d.is_empty()) {
        Some(doc) => doc.to_string(),
        None => state
            .store
            .default_mirrored()
            .map(String::from)
            .ok_or_else(|| ApiError::bad_request("no mirrored document configured"))?,
    };
    if !state.store.is_mirrored(&doc) {
        return Err(ApiError::bad_request(format!("document {doc} is not mirrored")));
    }
    Ok(doc)
}

/// GET /backup/list: Newest first.
pub async fn list_backups(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> Result<Json<Value>, ApiError> {
    let doc = document(&state, &params)?;
    let backups = blocking({
        let doc = doc.clone();
        move || Ok(state.store.list_backups(&doc)?)
    })
    .await?;
    Ok(Json(json!({ "doc": doc, "total": backups.len(), "backups": backups })))
}

/// GET /backup/read?file=
pub async fn read_backup(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> Result<Json<Value>, ApiError> {
    let doc = document(&state, &params)?;
    let file = params
        .get("file")
        .filter(|f| !f.is_empty())
        .cloned()
        .ok_or_else(|| ApiError::bad_request("missing required parameter: file"))?;

    let value = blocking(move || Ok(state.store.read_backup(&doc, &file)?)).await?;
    Ok(Json(value))
}

/// POST /backup/now: Mirror the current document as-is.
pub async fn backup_now(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
) -> Result<Json<Value>, ApiError> {
    let doc = document(&state, &params)?;
    let name = blocking({
        let doc = doc.clone();
        move || Ok(state.store.backup_now(&doc)?)
    })
    .await?;
    Ok(Json(json!({ "ok": true, "doc": doc, "backup": name })))
}

/// POST /backup/restore: Body `{"file": "<name>"}`; no file means the
/// current mirror copy.
pub async fn restore_backup(
    State(state): State<Arc<AppState>>,
    Query(params): Params,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let doc = document(&state, &params)?;
    let req: RestoreBody = if body.iter().all(u8::is_ascii_whitespace) {
        RestoreBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid restore body: {e}")))?
    };

    let report = blocking({
        let doc = doc.clone();
        move || Ok(state.store.restore(&doc, req.file.as_deref())?)
    })
    .await?;

    Ok(Json(json!({
        "ok": true,
        "doc": doc,
        "restoredFrom": report.restored_from,
        "restoredAt": report.restored_at,
        "localBackup": report.local_backup,
    })))
}
