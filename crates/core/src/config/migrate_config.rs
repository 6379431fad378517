use crate::config::{ConfigError, ConfigSource};
use crate::namespace::Engine;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

pub const POSTGRES_DSN_VAR: &str = "POSTGRES_DSN";
pub const MONGO_URI_VAR: &str = "MONGO_URI";
pub const MIGRATIONS_DIR_VAR: &str = "DBSHIFT_MIGRATIONS_DIR";
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Configuration trait for environment-driven configuration
pub trait EnvConfig: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Connection strings and locations used by a migration run.
///
/// An engine without a connection string is skipped, not failed.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    pub postgres_dsn: Option<String>,
    pub mongo_uri: Option<String>,
    pub migrations_dir: PathBuf,
    sources: HashMap<String, ConfigSource>,
}

impl MigrateConfig {
    /// Create an empty configuration: no engines configured
    pub fn new() -> Self {
        Self {
            postgres_dsn: None,
            mongo_uri: None,
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            sources: HashMap::new(),
        }
    }

    pub fn with_postgres(mut self, dsn: impl Into<String>) -> Self {
        self.postgres_dsn = Some(dsn.into());
        self.sources
            .insert("postgres_dsn".to_string(), ConfigSource::Programmatic);
        self
    }

    pub fn with_mongo(mut self, uri: impl Into<String>) -> Self {
        self.mongo_uri = Some(uri.into());
        self.sources
            .insert("mongo_uri".to_string(), ConfigSource::Programmatic);
        self
    }

    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self.sources
            .insert("migrations_dir".to_string(), ConfigSource::Programmatic);
        self
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let mut sources = HashMap::new();

        let postgres_dsn = read(POSTGRES_DSN_VAR);
        sources.insert(
            "postgres_dsn".to_string(),
            source_for(POSTGRES_DSN_VAR, postgres_dsn.is_some()),
        );

        let mongo_uri = read(MONGO_URI_VAR);
        sources.insert(
            "mongo_uri".to_string(),
            source_for(MONGO_URI_VAR, mongo_uri.is_some()),
        );

        let migrations_dir = match read(MIGRATIONS_DIR_VAR) {
            Some(dir) => {
                sources.insert(
                    "migrations_dir".to_string(),
                    ConfigSource::EnvVar(MIGRATIONS_DIR_VAR.to_string()),
                );
                PathBuf::from(dir)
            }
            None => {
                sources.insert(
                    "migrations_dir".to_string(),
                    ConfigSource::Default(DEFAULT_MIGRATIONS_DIR.to_string()),
                );
                PathBuf::from(DEFAULT_MIGRATIONS_DIR)
            }
        };

        let config = Self {
            postgres_dsn,
            mongo_uri,
            migrations_dir,
            sources,
        };
        config.validate()?;
        Ok(config)
    }

    /// Connection string for an engine, if configured
    pub fn connection_string(&self, engine: Engine) -> Option<&str> {
        match engine {
            Engine::Postgres => self.postgres_dsn.as_deref(),
            Engine::Mongo => self.mongo_uri.as_deref(),
        }
    }

    /// Name of the environment variable an engine reads its connection from
    pub fn connection_var(engine: Engine) -> &'static str {
        match engine {
            Engine::Postgres => POSTGRES_DSN_VAR,
            Engine::Mongo => MONGO_URI_VAR,
        }
    }

    pub fn is_configured(&self, engine: Engine) -> bool {
        self.connection_string(engine).is_some()
    }
}

fn source_for(var: &str, present: bool) -> ConfigSource {
    if present {
        ConfigSource::EnvVar(var.to_string())
    } else {
        ConfigSource::Unset
    }
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvConfig for MigrateConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.migrations_dir.as_os_str().is_empty() {
            return Err(ConfigError::missing_required(
                "migrations_dir",
                format!("set {} or pass --migrations-dir", MIGRATIONS_DIR_VAR),
            ));
        }
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = self.sources.clone();
        for field in ["postgres_dsn", "mongo_uri"] {
            sources.entry(field.to_string()).or_insert(ConfigSource::Unset);
        }
        sources
            .entry("migrations_dir".to_string())
            .or_insert_with(|| ConfigSource::Default(DEFAULT_MIGRATIONS_DIR.to_string()));
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_missing_connection_strings_mean_unconfigured() {
        let config = MigrateConfig::from_lookup(lookup(&[])).unwrap();
        assert!(!config.is_configured(Engine::Postgres));
        assert!(!config.is_configured(Engine::Mongo));
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
        assert!(config.config_sources()["migrations_dir"].is_default());
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config =
            MigrateConfig::from_lookup(lookup(&[(POSTGRES_DSN_VAR, "  "), (MONGO_URI_VAR, "")]))
                .unwrap();
        assert!(config.postgres_dsn.is_none());
        assert!(config.mongo_uri.is_none());
    }

    #[test]
    fn test_values_from_lookup() {
        let config = MigrateConfig::from_lookup(lookup(&[
            (POSTGRES_DSN_VAR, "postgres://localhost/app"),
            (MIGRATIONS_DIR_VAR, "db/migrations"),
        ]))
        .unwrap();
        assert_eq!(
            config.connection_string(Engine::Postgres),
            Some("postgres://localhost/app")
        );
        assert_eq!(config.migrations_dir, PathBuf::from("db/migrations"));

        let sources = config.config_sources();
        assert!(sources["postgres_dsn"].is_env_var());
        assert_eq!(sources["mongo_uri"], ConfigSource::Unset);
    }

    #[test]
    fn test_programmatic_builder() {
        let config = MigrateConfig::new()
            .with_mongo("mongodb://localhost:27017/app")
            .with_migrations_dir("");
        assert!(config.is_configured(Engine::Mongo));
        assert_eq!(config.config_sources()["mongo_uri"], ConfigSource::Programmatic);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_strings_are_not_checked_here() {
        // A malformed DSN is the Postgres engine's problem at connect time;
        // it must not keep the Mongo run from starting.
        let config = MigrateConfig::from_lookup(lookup(&[
            (POSTGRES_DSN_VAR, "host=localhost user=app dbname=app"),
            (MONGO_URI_VAR, "mongodb://localhost:27017/app"),
        ]))
        .unwrap();

        assert_eq!(
            config.connection_string(Engine::Postgres),
            Some("host=localhost user=app dbname=app")
        );
        assert_eq!(
            config.connection_string(Engine::Mongo),
            Some("mongodb://localhost:27017/app")
        );
        assert!(config.config_sources()["mongo_uri"].is_set());
    }
}
