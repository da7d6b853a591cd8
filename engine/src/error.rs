use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A model artifact failed shape or dimension validation at load time.
    /// Fatal for the process, never recoverable per-request.
    #[error("Corrupt model artifact: {0}")]
    CorruptModel(String),

    /// A scoring method produced no usable profile for this request.
    /// Recovered inside the engine by redistributing weights or falling
    /// back to the popularity table.
    #[error("Empty profile for {0} method")]
    EmptyProfile(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Result cache failure; recovered by direct computation.
    #[error("Result cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::CorruptModel(format!("artifact I/O error: {}", err))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::CorruptModel(format!("artifact JSON error: {}", err))
    }
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        EngineError::CorruptModel(format!("artifact bincode error: {}", err))
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}
