//! Migration namespaces
//!
//! A namespace partitions migration entries by database engine, database name
//! and category. Generator and runner agree on the on-disk layout
//! `<root>/<engine>-<database>/<category>`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Postgres,
    Mongo,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::Postgres, Engine::Mongo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::Mongo => "mongo",
        }
    }

    /// Extension used for migration bodies generated for this engine
    pub fn body_extension(&self) -> &'static str {
        match self {
            Engine::Postgres => "sql",
            Engine::Mongo => "json",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Engine::Postgres),
            "mongo" | "mongodb" => Ok(Engine::Mongo),
            _ => Err(CoreError::UnsupportedEngine {
                value: s.to_string(),
            }),
        }
    }
}

/// Migration category; seed data depends on schema existing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MigrationCategory {
    #[default]
    Schema,
    Seed,
}

impl MigrationCategory {
    /// Every category in application order
    pub const ALL: [MigrationCategory; 2] = [MigrationCategory::Schema, MigrationCategory::Seed];

    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationCategory::Schema => "schema",
            MigrationCategory::Seed => "seed",
        }
    }
}

impl fmt::Display for MigrationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "schema" => Ok(MigrationCategory::Schema),
            "seed" => Ok(MigrationCategory::Seed),
            _ => Err(CoreError::UnknownCategory {
                value: s.to_string(),
            }),
        }
    }
}

/// Which categories a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySelection {
    #[default]
    Schema,
    Seed,
    All,
}

impl CategorySelection {
    /// Selected categories, schema always before seed
    pub fn categories(&self) -> Vec<MigrationCategory> {
        match self {
            CategorySelection::Schema => vec![MigrationCategory::Schema],
            CategorySelection::Seed => vec![MigrationCategory::Seed],
            CategorySelection::All => MigrationCategory::ALL.to_vec(),
        }
    }
}

/// Ordered partition of migration entries for one engine, database and category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub engine: Engine,
    pub database: String,
    pub category: MigrationCategory,
}

impl Namespace {
    pub fn new(engine: Engine, database: impl Into<String>, category: MigrationCategory) -> Self {
        Self {
            engine,
            database: database.into(),
            category,
        }
    }

    /// Directory holding this namespace's entries under `root`
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(format!("{}-{}", self.engine, self.database))
            .join(self.category.as_str())
    }

    /// Key under which applied state is persisted in the target database
    pub fn key(&self) -> String {
        format!("{}-{}/{}", self.engine, self.database, self.category)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
