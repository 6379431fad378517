use dbshift_core::{CoreError, Engine};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("{expected} definition is required for {engine} migrations")]
    MissingDefinition {
        engine: Engine,
        expected: &'static str,
    },

    #[error("Refusing to overwrite existing migration file: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CodegenResult<T> = Result<T, CodegenError>;
