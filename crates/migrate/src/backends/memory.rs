//! In-memory driver
//!
//! Records every executed body in a journal and keeps state records in a map.
//! Used by tests and dry runs; a body containing the configured failure marker
//! fails the way a real engine would.

use async_trait::async_trait;
use dbshift_core::Engine;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Connector, MigrationDriver};
use crate::error::{MigrateError, MigrateResult};
use crate::migrations::definitions::AppliedState;

#[derive(Debug, Default)]
struct MemoryInner {
    states: HashMap<String, AppliedState>,
    journal: Vec<String>,
    fail_on: Option<String>,
    fail_ping: bool,
    closed: bool,
    pings: usize,
}

/// Shared handle to the simulated database; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bodies executed so far, in order
    pub async fn journal(&self) -> Vec<String> {
        self.inner.lock().await.journal.clone()
    }

    pub async fn state(&self, namespace: &str) -> Option<AppliedState> {
        self.inner.lock().await.states.get(namespace).copied()
    }

    pub async fn set_state(&self, namespace: &str, state: AppliedState) {
        self.inner
            .lock()
            .await
            .states
            .insert(namespace.to_string(), state);
    }

    /// Make any body containing `marker` fail
    pub async fn fail_on(&self, marker: impl Into<String>) {
        self.inner.lock().await.fail_on = Some(marker.into());
    }

    /// Make every liveness check fail
    pub async fn fail_ping(&self) {
        self.inner.lock().await.fail_ping = true;
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    pub async fn ping_count(&self) -> usize {
        self.inner.lock().await.pings
    }
}

impl MemoryInner {
    fn ensure_open(&self, engine: Engine) -> MigrateResult<()> {
        if self.closed {
            return Err(MigrateError::connection(engine, "connection closed"));
        }
        Ok(())
    }

    fn run(&mut self, body: &str) -> MigrateResult<()> {
        if let Some(marker) = &self.fail_on {
            if body.contains(marker.as_str()) {
                return Err(MigrateError::Database(format!(
                    "simulated failure on '{}'",
                    marker
                )));
            }
        }
        if !body.trim().is_empty() {
            self.journal.push(body.to_string());
        }
        Ok(())
    }
}

pub struct MemoryDriver {
    db: MemoryDatabase,
    engine: Engine,
    database: String,
    transactional: bool,
}

impl MemoryDriver {
    /// Driver behaving like PostgreSQL: body and state commit together
    pub fn transactional(db: MemoryDatabase, database: impl Into<String>) -> Self {
        Self {
            db,
            engine: Engine::Postgres,
            database: database.into(),
            transactional: true,
        }
    }

    /// Driver behaving like MongoDB: no transactional DDL
    pub fn non_transactional(db: MemoryDatabase, database: impl Into<String>) -> Self {
        Self {
            db,
            engine: Engine::Mongo,
            database: database.into(),
            transactional: false,
        }
    }

    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }
}

#[async_trait]
impl MigrationDriver for MemoryDriver {
    fn engine(&self) -> Engine {
        self.engine
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    fn is_transactional(&self) -> bool {
        self.transactional
    }

    async fn ping(&mut self) -> MigrateResult<()> {
        let mut inner = self.db.inner.lock().await;
        inner.ensure_open(self.engine)?;
        inner.pings += 1;
        if inner.fail_ping {
            return Err(MigrateError::Database("simulated ping failure".to_string()));
        }
        Ok(())
    }

    async fn load_state(&mut self, namespace: &str) -> MigrateResult<AppliedState> {
        let mut inner = self.db.inner.lock().await;
        inner.ensure_open(self.engine)?;
        Ok(*inner.states.entry(namespace.to_string()).or_default())
    }

    async fn store_state(&mut self, namespace: &str, state: AppliedState) -> MigrateResult<()> {
        let mut inner = self.db.inner.lock().await;
        inner.ensure_open(self.engine)?;
        inner.states.insert(namespace.to_string(), state);
        Ok(())
    }

    async fn execute(&mut self, body: &str) -> MigrateResult<()> {
        let mut inner = self.db.inner.lock().await;
        inner.ensure_open(self.engine)?;
        inner.run(body)
    }

    async fn execute_and_store(
        &mut self,
        namespace: &str,
        body: &str,
        state: AppliedState,
    ) -> MigrateResult<()> {
        if !self.transactional {
            return Err(MigrateError::Unsupported {
                engine: self.engine,
                operation: "transactional execution",
            });
        }

        let mut inner = self.db.inner.lock().await;
        inner.ensure_open(self.engine)?;
        let journal_len = inner.journal.len();
        if let Err(e) = inner.run(body) {
            inner.journal.truncate(journal_len);
            return Err(e);
        }
        inner.states.insert(namespace.to_string(), state);
        Ok(())
    }

    async fn close(&mut self) -> MigrateResult<()> {
        self.db.inner.lock().await.closed = true;
        Ok(())
    }
}

/// Hands out memory drivers per engine: PostgreSQL ones are transactional,
/// MongoDB ones are not
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    databases: HashMap<Engine, (MemoryDatabase, String)>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(
        mut self,
        engine: Engine,
        db: MemoryDatabase,
        database: impl Into<String>,
    ) -> Self {
        self.databases.insert(engine, (db, database.into()));
        self
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(
        &self,
        engine: Engine,
        _connection_string: &str,
    ) -> MigrateResult<Box<dyn MigrationDriver>> {
        let (db, database) = self
            .databases
            .get(&engine)
            .ok_or_else(|| MigrateError::connection(engine, "no in-memory database registered"))?;

        let driver = match engine {
            Engine::Postgres => MemoryDriver::transactional(db.clone(), database.as_str()),
            Engine::Mongo => MemoryDriver::non_transactional(db.clone(), database.as_str()),
        };
        Ok(Box::new(driver))
    }
}
