use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown log stream: {0}")]
    UnknownStream(String),

    #[error("invalid archive date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("no archived log {stream} for {date}")]
    NotArchived { stream: String, date: String },
}

pub type Result<T> = std::result::Result<T, LogError>;

impl From<LogError> for kintai_core::KintaiError {
    fn from(e: LogError) -> Self {
        use kintai_core::KintaiError;
        match e {
            LogError::UnknownStream(_) | LogError::InvalidDate(_) => {
                KintaiError::BadRequest(e.to_string())
            }
            LogError::NotArchived { .. } => KintaiError::NotFound(e.to_string()),
            LogError::Io(io) => KintaiError::Io(io),
        }
    }
}
