use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kintai_core::{FaultKind, KintaiError};
use kintai_logs::LogError;
use kintai_store::StoreError;
use kintai_supervisor::SupervisorError;
use serde_json::json;
use tracing::{error, warn};

use crate::sources::CollabError;

/// Handler failure, mapped centrally to a status code.
///
/// The body is always `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub KintaiError);

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(KintaiError::BadRequest(msg.into()))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self(KintaiError::Forbidden(msg.into()))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(KintaiError::NotFound(msg.into()))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self(KintaiError::Internal(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match (&self.0, self.0.kind()) {
            (KintaiError::Forbidden(_), _) => StatusCode::FORBIDDEN,
            (_, FaultKind::Client) => StatusCode::BAD_REQUEST,
            (_, FaultKind::NotFound) => StatusCode::NOT_FOUND,
            (_, FaultKind::Collaborator)
            | (_, FaultKind::Storage)
            | (_, FaultKind::Supervision)
            | (_, FaultKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.code(), "{}", self.0);
        } else {
            warn!(code = self.0.code(), "{}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<KintaiError> for ApiError {
    fn from(e: KintaiError) -> Self {
        Self(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e.into())
    }
}

impl From<LogError> for ApiError {
    fn from(e: LogError) -> Self {
        Self(e.into())
    }
}

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        Self(e.into())
    }
}

impl From<CollabError> for ApiError {
    fn from(e: CollabError) -> Self {
        Self(e.into())
    }
}

/// Run blocking filesystem work off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError(KintaiError::Timeout { ms: 5 }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StoreError::NotAnObject).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(LogError::UnknownStream("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn body_is_error_document() {
        let resp = ApiError::not_found("backup x").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"error": "Not found: backup x"}));
    }
}
