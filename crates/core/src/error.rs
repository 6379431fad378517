use thiserror::Error;

/// Core error type shared by the dbshift crates
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported database engine: {value} (expected postgres or mongo)")]
    UnsupportedEngine { value: String },

    #[error("Unknown migration category: {value} (expected schema or seed)")]
    UnknownCategory { value: String },

    #[error("Invalid migration version: {value}")]
    InvalidVersion { value: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
