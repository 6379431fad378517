//! Logging bootstrap for the CLI
//!
//! `RUST_LOG` takes precedence over the level chosen on the command line.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration assembled from command-line flags
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug")
    pub level: String,
    /// JSON structured output instead of plain text
    pub json_format: bool,
    /// Include the emitting module in each line
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    pub fn from_flags(verbose: bool, json_format: bool) -> Self {
        Self {
            level: if verbose { "debug" } else { "info" }.to_string(),
            json_format,
            include_target: verbose,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        format!(
            "warn,dbshift={level},dbshift_core={level},dbshift_codegen={level},dbshift_migrate={level}",
            level = self.level
        )
    }
}

/// Install the global subscriber; logs go to stderr so stdout stays for output
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                Layer::new()
                    .with_writer(io::stderr)
                    .with_target(config.include_target),
            )
            .try_init()?;
    }

    tracing::debug!(
        level = %config.level,
        format = if config.json_format { "json" } else { "text" },
        "logging initialized"
    );
    Ok(())
}
