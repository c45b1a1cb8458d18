use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("STORE_UNREACHABLE: {0}")]
    Connectivity(String),
    #[error("FEED_INVALID: {0}")]
    Validation(String),
    #[error("PERSISTENCE_FAILURE: {0}")]
    Persistence(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("FEED_UNAVAILABLE: {0}")]
    Feed(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
