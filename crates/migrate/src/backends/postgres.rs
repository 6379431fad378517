//! PostgreSQL driver
//!
//! DDL is transactional in PostgreSQL, so each body commits together with its
//! state update.

use async_trait::async_trait;
use dbshift_core::{Engine, MigrationVersion};
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Executor, Row};

use super::{MigrationDriver, STATE_TABLE};
use crate::error::{MigrateError, MigrateResult};
use crate::migrations::definitions::AppliedState;

const DEFAULT_DATABASE: &str = "postgres";

pub struct PostgresDriver {
    conn: Option<PgConnection>,
    database: String,
    state_table: String,
}

impl PostgresDriver {
    /// Open a single connection; liveness is checked separately with `ping`
    pub async fn connect(dsn: &str) -> MigrateResult<Self> {
        validate_database_url(dsn)?;
        let conn = PgConnection::connect(dsn)
            .await
            .map_err(|e| MigrateError::connection(Engine::Postgres, e.to_string()))?;

        Ok(Self {
            conn: Some(conn),
            database: database_name_from_dsn(dsn),
            state_table: STATE_TABLE.to_string(),
        })
    }

    fn conn(&mut self) -> MigrateResult<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| MigrateError::connection(Engine::Postgres, "connection already closed"))
    }

    fn create_state_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                namespace VARCHAR(255) PRIMARY KEY,\n    \
                version BIGINT,\n    \
                dirty BOOLEAN NOT NULL DEFAULT FALSE,\n    \
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP\n\
            )",
            self.state_table
        )
    }

    fn select_state_sql(&self) -> String {
        format!(
            "SELECT version, dirty FROM {} WHERE namespace = $1",
            self.state_table
        )
    }

    fn upsert_state_sql(&self) -> String {
        format!(
            "INSERT INTO {} (namespace, version, dirty, updated_at) \
             VALUES ($1, $2, $3, CURRENT_TIMESTAMP) \
             ON CONFLICT (namespace) DO UPDATE \
             SET version = EXCLUDED.version, dirty = EXCLUDED.dirty, updated_at = EXCLUDED.updated_at",
            self.state_table
        )
    }
}

#[async_trait]
impl MigrationDriver for PostgresDriver {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    fn is_transactional(&self) -> bool {
        true
    }

    async fn ping(&mut self) -> MigrateResult<()> {
        self.conn()?
            .ping()
            .await
            .map_err(|e| MigrateError::connection(Engine::Postgres, e.to_string()))
    }

    async fn load_state(&mut self, namespace: &str) -> MigrateResult<AppliedState> {
        let create_sql = self.create_state_table_sql();
        let select_sql = self.select_state_sql();
        let upsert_sql = self.upsert_state_sql();
        let conn = self.conn()?;

        (&mut *conn).execute(create_sql.as_str()).await?;

        let row = sqlx::query(&select_sql)
            .bind(namespace)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let version: Option<i64> = row.try_get("version")?;
                let dirty: bool = row.try_get("dirty")?;
                Ok(AppliedState {
                    version: version.map(to_version).transpose()?,
                    dirty,
                })
            }
            None => {
                let fresh = AppliedState::default();
                sqlx::query(&upsert_sql)
                    .bind(namespace)
                    .bind(Option::<i64>::None)
                    .bind(false)
                    .execute(&mut *conn)
                    .await?;
                Ok(fresh)
            }
        }
    }

    async fn store_state(&mut self, namespace: &str, state: AppliedState) -> MigrateResult<()> {
        let upsert_sql = self.upsert_state_sql();
        let conn = self.conn()?;
        sqlx::query(&upsert_sql)
            .bind(namespace)
            .bind(from_version(state.version)?)
            .bind(state.dirty)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn execute(&mut self, body: &str) -> MigrateResult<()> {
        if body.trim().is_empty() {
            return Ok(());
        }
        // Unprepared execution goes through the simple query protocol, which
        // accepts several statements per body.
        self.conn()?.execute(body).await?;
        Ok(())
    }

    async fn execute_and_store(
        &mut self,
        namespace: &str,
        body: &str,
        state: AppliedState,
    ) -> MigrateResult<()> {
        let upsert_sql = self.upsert_state_sql();
        let version = from_version(state.version)?;
        let conn = self.conn()?;

        let mut transaction = conn.begin().await?;
        if !body.trim().is_empty() {
            (&mut *transaction).execute(body).await?;
        }
        sqlx::query(&upsert_sql)
            .bind(namespace)
            .bind(version)
            .bind(state.dirty)
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await?;
        Ok(())
    }

    async fn close(&mut self) -> MigrateResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}

fn to_version(raw: i64) -> MigrateResult<MigrationVersion> {
    u64::try_from(raw)
        .map(MigrationVersion::new)
        .map_err(|_| MigrateError::Database(format!("negative migration version {} in state table", raw)))
}

fn from_version(version: Option<MigrationVersion>) -> MigrateResult<Option<i64>> {
    version
        .map(|v| {
            i64::try_from(v.get())
                .map_err(|_| MigrateError::Database(format!("migration version {} out of range", v)))
        })
        .transpose()
}

/// Reject anything that is not a postgres URL before dialing
pub fn validate_database_url(url: &str) -> MigrateResult<()> {
    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
        return Err(MigrateError::connection(
            Engine::Postgres,
            "invalid PostgreSQL URL scheme (expected postgres:// or postgresql://)",
        ));
    }
    Ok(())
}

/// Database name from the URL path, `postgres` when the URL names none
pub fn database_name_from_dsn(dsn: &str) -> String {
    url::Url::parse(dsn)
        .ok()
        .map(|parsed| parsed.path().trim_start_matches('/').to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
}
