//! Per-engine session
//!
//! A session owns one connection for the duration of an action: connect and
//! ping, run every selected namespace in order, then close, even on failure.

use dbshift_core::{CategorySelection, Engine, MigrateConfig, Namespace};
use std::path::Path;

use crate::backends::{self, Connector, MigrationDriver, NativeConnector};
use crate::error::{MigrateError, MigrateResult};
use crate::migrations::{MigrationAction, MigrationRunner, NamespaceReport};

/// What to run against one engine
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub categories: CategorySelection,
    pub action: MigrationAction,
    /// Overrides the database name derived from the connection string
    pub database: Option<String>,
}

impl RunRequest {
    pub fn new(categories: CategorySelection, action: MigrationAction) -> Self {
        Self {
            categories,
            action,
            database: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

/// Result of one engine's run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// No connection string configured; not a failure
    Skipped { variable: &'static str },
    Completed { reports: Vec<NamespaceReport> },
}

/// One engine's result within a multi-engine run
#[derive(Debug)]
pub struct EngineRun {
    pub engine: Engine,
    pub result: MigrateResult<EngineOutcome>,
}

impl EngineRun {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    pub fn error(&self) -> Option<&MigrateError> {
        self.result.as_ref().err()
    }
}

/// Connect to `engine` and run `request`, releasing the connection afterwards
pub async fn run_engine(
    config: &MigrateConfig,
    engine: Engine,
    request: &RunRequest,
) -> MigrateResult<EngineOutcome> {
    run_engine_with(&NativeConnector, config, engine, request).await
}

/// [`run_engine`] with drivers opened through `connector`
pub async fn run_engine_with<C>(
    connector: &C,
    config: &MigrateConfig,
    engine: Engine,
    request: &RunRequest,
) -> MigrateResult<EngineOutcome>
where
    C: Connector + ?Sized,
{
    let Some(connection_string) = config.connection_string(engine) else {
        let variable = MigrateConfig::connection_var(engine);
        tracing::warn!(engine = %engine, "{} not set, skipping", variable);
        return Ok(EngineOutcome::Skipped { variable });
    };

    tracing::debug!(engine = %engine, "connecting");
    let mut driver = match backends::connect_with(connector, engine, connection_string).await {
        Ok(driver) => driver,
        Err(e) => {
            tracing::error!(engine = %engine, error = %e, "connection failed");
            return Err(e);
        }
    };
    tracing::info!(engine = %engine, database = driver.database_name(), "connected");

    let result = run_with_driver(driver.as_mut(), &config.migrations_dir, request).await;

    if let Err(e) = driver.close().await {
        tracing::warn!(engine = %engine, error = %e, "failed to close connection");
    }
    tracing::debug!(engine = %engine, "disconnected");

    result.map(|reports| EngineOutcome::Completed { reports })
}

/// Run `request` on each engine in turn; a failing engine never stops the next
pub async fn run_engines(
    config: &MigrateConfig,
    engines: &[Engine],
    request: &RunRequest,
) -> Vec<EngineRun> {
    run_engines_with(&NativeConnector, config, engines, request).await
}

pub async fn run_engines_with<C>(
    connector: &C,
    config: &MigrateConfig,
    engines: &[Engine],
    request: &RunRequest,
) -> Vec<EngineRun>
where
    C: Connector + ?Sized,
{
    let mut runs = Vec::with_capacity(engines.len());
    for &engine in engines {
        let result = run_engine_with(connector, config, engine, request).await;
        if let Err(e) = &result {
            tracing::error!(engine = %engine, "{} migration failed: {}", engine, e);
        }
        runs.push(EngineRun { engine, result });
    }
    runs
}

/// Run every selected category, schema before seed, on an open driver.
///
/// A failing namespace stops the remaining ones; seed data depends on schema.
pub async fn run_with_driver(
    driver: &mut dyn MigrationDriver,
    migrations_root: &Path,
    request: &RunRequest,
) -> MigrateResult<Vec<NamespaceReport>> {
    let engine = driver.engine();
    let database = request
        .database
        .clone()
        .unwrap_or_else(|| driver.database_name().to_string());

    let mut runner = MigrationRunner::new(driver);
    let mut reports = Vec::new();
    for category in request.categories.categories() {
        let namespace = Namespace::new(engine, database.as_str(), category);
        reports.push(runner.run(&namespace, migrations_root, request.action).await?);
    }
    Ok(reports)
}
