pub mod config;
pub mod error;
pub mod namespace;
pub mod specs;
pub mod version;

pub use config::{ConfigError, ConfigSource, EnvConfig, MigrateConfig};
pub use error::{CoreError, CoreResult};
pub use namespace::{CategorySelection, Engine, MigrationCategory, Namespace};
pub use specs::{
    CollectionSpec, ColumnSpec, ConstraintSpec, DatabaseSpec, DocumentIndexSpec, ForeignKeySpec,
    IndexSpec, SchemaSpec, TableSpec,
};
pub use version::{next_version, MigrationVersion};

