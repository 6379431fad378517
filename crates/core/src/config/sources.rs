use std::fmt;

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from the named environment variable
    EnvVar(String),
    /// Built-in default
    Default(String),
    /// Set through the builder API or a command-line flag
    Programmatic,
    /// No value; for a connection string the engine is skipped
    Unset,
}

impl ConfigSource {
    pub fn is_env_var(&self) -> bool {
        matches!(self, ConfigSource::EnvVar(_))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ConfigSource::Default(_))
    }

    /// Whether the field holds a value at all
    pub fn is_set(&self) -> bool {
        !matches!(self, ConfigSource::Unset)
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::EnvVar(var) => write!(f, "env {}", var),
            ConfigSource::Default(value) => write!(f, "default ({})", value),
            ConfigSource::Programmatic => f.write_str("explicit"),
            ConfigSource::Unset => f.write_str("unset"),
        }
    }
}
