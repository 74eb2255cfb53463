use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with status {code}: {output}")]
    CommandFailed {
        program: String,
        code: i32,
        output: String,
    },

    #[error("command timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("empty command")]
    EmptyCommand,

    #[error("health probe failed: {0}")]
    Probe(String),

    #[error("port {port} still in use after {attempts} bind attempts")]
    BindExhausted { port: u16, attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

impl From<SupervisorError> for kintai_core::KintaiError {
    fn from(e: SupervisorError) -> Self {
        kintai_core::KintaiError::Supervision(e.to_string())
    }
}
