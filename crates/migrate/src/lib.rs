//! # dbshift-migrate
//!
//! Versioned migration runner for PostgreSQL and MongoDB. Entries are
//! `<version>_<slug>.<up|down>.<ext>` files grouped into namespaces; the
//! applied version and a dirty flag are tracked inside each target database.

pub mod backends;
pub mod error;
pub mod migrations;
pub mod session;

pub use backends::{
    connect, connect_with, Connector, MemoryConnector, MemoryDatabase, MemoryDriver,
    MigrationDriver, NativeConnector, STATE_TABLE,
};
pub use error::{MigrateError, MigrateResult};
pub use migrations::{
    display_version, AppliedState, MigrationAction, MigrationDirection, MigrationEntry,
    MigrationRunner, MigrationStore, NamespaceOutcome, NamespaceReport, RunnerState,
    StateTracker,
};
pub use session::{
    run_engine, run_engine_with, run_engines, run_engines_with, run_with_driver, EngineOutcome,
    EngineRun, RunRequest,
};
