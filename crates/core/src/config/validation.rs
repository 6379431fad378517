use thiserror::Error;

/// Errors raised while assembling a [`MigrateConfig`](super::MigrateConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} is required: {hint}")]
    MissingRequired { field: String, hint: String },
}

impl ConfigError {
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }
}
