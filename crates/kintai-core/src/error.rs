use thiserror::Error;

/// Coarse failure class. The gateway maps each class to one status code, so
/// adding a variant to [`KintaiError`] only requires choosing its class here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Missing or invalid input, forbidden path. Never retried.
    Client,
    /// The requested thing does not exist.
    NotFound,
    /// A scraper, feed or other external collaborator failed or timed out.
    Collaborator,
    /// Unreadable or corrupt document, failed backup write.
    Storage,
    /// Health probe or supervisor command failure.
    Supervision,
    Internal,
}

#[derive(Debug, Error)]
pub enum KintaiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collaborator error ({source_name}): {reason}")]
    Collaborator { source_name: String, reason: String },

    #[error("Request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Supervision error: {0}")]
    Supervision(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KintaiError {
    pub fn kind(&self) -> FaultKind {
        match self {
            KintaiError::BadRequest(_) | KintaiError::Forbidden(_) => FaultKind::Client,
            KintaiError::NotFound(_) => FaultKind::NotFound,
            KintaiError::Collaborator { .. } | KintaiError::Timeout { .. } => {
                FaultKind::Collaborator
            }
            KintaiError::Storage(_) | KintaiError::Serialization(_) | KintaiError::Io(_) => {
                FaultKind::Storage
            }
            KintaiError::Supervision(_) => FaultKind::Supervision,
            KintaiError::Config(_) | KintaiError::Internal(_) => FaultKind::Internal,
        }
    }

    /// Short machine-readable code, logged next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            KintaiError::Config(_) => "CONFIG_ERROR",
            KintaiError::BadRequest(_) => "BAD_REQUEST",
            KintaiError::Forbidden(_) => "FORBIDDEN",
            KintaiError::NotFound(_) => "NOT_FOUND",
            KintaiError::Collaborator { .. } => "COLLABORATOR_ERROR",
            KintaiError::Timeout { .. } => "TIMEOUT",
            KintaiError::Storage(_) => "STORAGE_ERROR",
            KintaiError::Supervision(_) => "SUPERVISION_ERROR",
            KintaiError::Serialization(_) => "SERIALIZATION_ERROR",
            KintaiError::Io(_) => "IO_ERROR",
            KintaiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, KintaiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_faults_are_distinct_from_server_faults() {
        assert_eq!(KintaiError::BadRequest("x".into()).kind(), FaultKind::Client);
        assert_eq!(KintaiError::Forbidden("x".into()).kind(), FaultKind::Client);
        assert_eq!(KintaiError::Timeout { ms: 10 }.kind(), FaultKind::Collaborator);
        assert_eq!(KintaiError::Storage("x".into()).kind(), FaultKind::Storage);
        assert_eq!(KintaiError::NotFound("x".into()).kind(), FaultKind::NotFound);
    }

    #[test]
    fn io_errors_count_as_storage_faults() {
        let err: KintaiError = std::io::Error::other("disk").into();
        assert_eq!(err.kind(), FaultKind::Storage);
        assert_eq!(err.code(), "IO_ERROR");
    }
}
