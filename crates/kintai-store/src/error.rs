use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid document key: {0}")]
    InvalidKey(String),

    #[error("invalid backup name: {0}")]
    InvalidBackupName(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("document must be a JSON object")]
    NotAnObject,

    #[error("backup {0} is empty or not a JSON object")]
    UnusableBackup(String),

    #[error("corrupt document {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for kintai_core::KintaiError {
    fn from(e: StoreError) -> Self {
        use kintai_core::KintaiError;
        match e {
            StoreError::InvalidKey(_)
            | StoreError::InvalidBackupName(_)
            | StoreError::NotAnObject
            | StoreError::UnusableBackup(_) => KintaiError::BadRequest(e.to_string()),
            StoreError::NotFound(what) => KintaiError::NotFound(what),
            StoreError::Io(io) => KintaiError::Io(io),
            StoreError::Corrupt { .. } | StoreError::Serialization(_) => {
                KintaiError::Storage(e.to_string())
            }
        }
    }
}
