//! Database Backend Abstractions
//!
//! Each supported engine implements [`MigrationDriver`]; the runner only talks
//! to this trait.

pub mod memory;
pub mod mongo;
pub mod postgres;

pub use memory::{MemoryConnector, MemoryDatabase, MemoryDriver};
pub use mongo::MongoDriver;
pub use postgres::PostgresDriver;

use async_trait::async_trait;
use dbshift_core::Engine;

use crate::error::{MigrateError, MigrateResult};
use crate::migrations::definitions::AppliedState;

/// Table (Postgres) or collection (MongoDB) holding applied state records
pub const STATE_TABLE: &str = "dbshift_schema_migrations";

/// Connection to one target database, scoped to a single run
#[async_trait]
pub trait MigrationDriver: Send {
    /// Engine this driver talks to
    fn engine(&self) -> Engine;

    /// Database name derived from the connection, used to resolve namespaces
    fn database_name(&self) -> &str;

    /// Whether a body and its state update can commit in one transaction
    fn is_transactional(&self) -> bool;

    /// Liveness round-trip
    async fn ping(&mut self) -> MigrateResult<()>;

    /// Read the state record for `namespace`, creating a fresh
    /// `{none, clean}` record on first use
    async fn load_state(&mut self, namespace: &str) -> MigrateResult<AppliedState>;

    /// Persist the state record for `namespace`
    async fn store_state(&mut self, namespace: &str, state: AppliedState) -> MigrateResult<()>;

    /// Execute a migration body outside any transaction
    async fn execute(&mut self, body: &str) -> MigrateResult<()>;

    /// Execute a migration body and persist `state` in a single transaction
    async fn execute_and_store(
        &mut self,
        _namespace: &str,
        _body: &str,
        _state: AppliedState,
    ) -> MigrateResult<()> {
        Err(MigrateError::Unsupported {
            engine: self.engine(),
            operation: "transactional execution",
        })
    }

    /// Release the connection; further calls fail
    async fn close(&mut self) -> MigrateResult<()>;
}

/// Opens drivers for an engine; the session verifies and releases them
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        engine: Engine,
        connection_string: &str,
    ) -> MigrateResult<Box<dyn MigrationDriver>>;
}

/// Connector backed by the real PostgreSQL and MongoDB drivers
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeConnector;

#[async_trait]
impl Connector for NativeConnector {
    async fn open(
        &self,
        engine: Engine,
        connection_string: &str,
    ) -> MigrateResult<Box<dyn MigrationDriver>> {
        Ok(match engine {
            Engine::Postgres => Box::new(PostgresDriver::connect(connection_string).await?),
            Engine::Mongo => Box::new(MongoDriver::connect(connection_string).await?),
        })
    }
}

/// Open and verify a connection for `engine`
pub async fn connect(engine: Engine, connection_string: &str) -> MigrateResult<Box<dyn MigrationDriver>> {
    connect_with(&NativeConnector, engine, connection_string).await
}

/// Open a driver through `connector` and ping it; a failed ping closes the
/// driver before the error is returned
pub async fn connect_with<C>(
    connector: &C,
    engine: Engine,
    connection_string: &str,
) -> MigrateResult<Box<dyn MigrationDriver>>
where
    C: Connector + ?Sized,
{
    let mut driver = connector.open(engine, connection_string).await?;

    if let Err(e) = driver.ping().await {
        if let Err(close_err) = driver.close().await {
            tracing::warn!(engine = %engine, error = %close_err, "failed to close connection after ping failure");
        }
        return Err(MigrateError::connection(engine, format!("ping failed: {}", e)));
    }

    Ok(driver)
}
