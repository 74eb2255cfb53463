//! GET/POST /store/{name}: The rotating document store.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{blocking, ApiError};

/// Current document, or `{}` when nothing has been saved.
pub async fn load_document(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let doc = blocking(move || Ok(state.store.load(&name)?)).await?;
    Ok(Json(doc))
}

pub async fn save_document(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(doc) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let report = blocking(move || Ok(state.store.save(&name, doc)?)).await?;

    let mut resp = json!({ "ok": true });
    if let (Value::Object(out), Ok(Value::Object(fields))) = (&mut resp, serde_json::to_value(&report)) {
        out.extend(fields);
    }
    Ok(Json(resp))
}
