//! Error types for the migration runner

use dbshift_core::{CoreError, Engine};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Connection error ({engine}): {message}")]
    Connection { engine: Engine, message: String },

    #[error("Invalid migration store {}: {message}", dir.display())]
    Store { dir: PathBuf, message: String },

    #[error("Invalid migration body: {0}")]
    InvalidBody(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration {version} in {namespace} failed: {message}")]
    Execution {
        namespace: String,
        version: String,
        message: String,
    },

    #[error("{namespace} is dirty at version {version}; repair the database, then force a version")]
    Dirty { namespace: String, version: String },

    #[error("No migration entry for version {version} in {namespace}")]
    MissingEntry { namespace: String, version: String },

    #[error("Operation '{operation}' is not supported by the {engine} driver")]
    Unsupported {
        engine: Engine,
        operation: &'static str,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    pub fn connection(engine: Engine, message: impl Into<String>) -> Self {
        Self::Connection {
            engine,
            message: message.into(),
        }
    }

    pub fn store(dir: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Store {
            dir: dir.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from establishing the connection
    pub fn is_connection(&self) -> bool {
        matches!(self, MigrateError::Connection { .. })
    }
}

impl From<sqlx::Error> for MigrateError {
    fn from(err: sqlx::Error) -> Self {
        MigrateError::Database(err.to_string())
    }
}

impl From<mongodb::error::Error> for MigrateError {
    fn from(err: mongodb::error::Error) -> Self {
        MigrateError::Database(err.to_string())
    }
}

pub type MigrateResult<T> = Result<T, MigrateError>;
