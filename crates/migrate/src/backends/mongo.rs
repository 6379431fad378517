//! MongoDB driver
//!
//! Bodies are directive lists: a YAML or JSON sequence of command documents,
//! each run with `runCommand` in order. MongoDB cannot roll back collection
//! DDL, so the runner brackets every body with a dirty marker.

use async_trait::async_trait;
use dbshift_core::{Engine, MigrationVersion};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use serde_json::Value;

use super::{MigrationDriver, STATE_TABLE};
use crate::error::{MigrateError, MigrateResult};
use crate::migrations::definitions::AppliedState;

const DEFAULT_DATABASE: &str = "test";

pub struct MongoDriver {
    client: Option<Client>,
    database: Database,
    database_name: String,
}

impl MongoDriver {
    pub async fn connect(uri: &str) -> MigrateResult<Self> {
        validate_mongo_uri(uri)?;
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| MigrateError::connection(Engine::Mongo, e.to_string()))?;
        let database_name = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let client = Client::with_options(options)
            .map_err(|e| MigrateError::connection(Engine::Mongo, e.to_string()))?;
        let database = client.database(&database_name);

        Ok(Self {
            client: Some(client),
            database,
            database_name,
        })
    }

    /// The target database, unless the client has been shut down
    fn database(&self) -> MigrateResult<&Database> {
        match self.client {
            Some(_) => Ok(&self.database),
            None => Err(MigrateError::connection(Engine::Mongo, "client already shut down")),
        }
    }

    fn state_collection(&self) -> MigrateResult<Collection<Document>> {
        Ok(self.database()?.collection::<Document>(STATE_TABLE))
    }
}

#[async_trait]
impl MigrationDriver for MongoDriver {
    fn engine(&self) -> Engine {
        Engine::Mongo
    }

    fn database_name(&self) -> &str {
        &self.database_name
    }

    fn is_transactional(&self) -> bool {
        false
    }

    async fn ping(&mut self) -> MigrateResult<()> {
        self.database()?
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MigrateError::connection(Engine::Mongo, e.to_string()))?;
        Ok(())
    }

    async fn load_state(&mut self, namespace: &str) -> MigrateResult<AppliedState> {
        let collection = self.state_collection()?;
        match collection.find_one(doc! { "_id": namespace }).await? {
            Some(record) => state_from_document(&record),
            None => {
                let fresh = AppliedState::default();
                self.store_state(namespace, fresh).await?;
                Ok(fresh)
            }
        }
    }

    async fn store_state(&mut self, namespace: &str, state: AppliedState) -> MigrateResult<()> {
        let collection = self.state_collection()?;
        collection
            .replace_one(doc! { "_id": namespace }, state_to_document(namespace, state)?)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn execute(&mut self, body: &str) -> MigrateResult<()> {
        let database = self.database()?;
        for (idx, command) in parse_directives(body)?.into_iter().enumerate() {
            let name = command.keys().next().cloned().unwrap_or_default();
            tracing::debug!(directive = idx, command = %name, "running command");
            database.run_command(command).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> MigrateResult<()> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
        }
        Ok(())
    }
}

/// Reject anything that is not a MongoDB connection string before dialing
pub fn validate_mongo_uri(uri: &str) -> MigrateResult<()> {
    if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
        return Err(MigrateError::connection(
            Engine::Mongo,
            "invalid MongoDB URI scheme (expected mongodb:// or mongodb+srv://)",
        ));
    }
    Ok(())
}

/// Parse a directive body into command documents, preserving key order.
///
/// An empty body is an empty directive list.
pub fn parse_directives(body: &str) -> MigrateResult<Vec<Document>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let directives: Vec<Value> = serde_yaml::from_str(body)
        .map_err(|e| MigrateError::InvalidBody(format!("expected a list of commands: {}", e)))?;

    directives
        .iter()
        .map(|directive| match directive {
            Value::Object(_) => bson::to_document(directive)
                .map_err(|e| MigrateError::InvalidBody(e.to_string())),
            other => Err(MigrateError::InvalidBody(format!(
                "directive must be a document, found {}",
                other
            ))),
        })
        .collect()
}

fn state_to_document(namespace: &str, state: AppliedState) -> MigrateResult<Document> {
    let version = match state.version {
        Some(v) => Bson::Int64(i64::try_from(v.get()).map_err(|_| {
            MigrateError::Database(format!("migration version {} out of range", v))
        })?),
        None => Bson::Null,
    };
    Ok(doc! {
        "_id": namespace,
        "version": version,
        "dirty": state.dirty,
        "updated_at": bson::DateTime::now(),
    })
}

fn state_from_document(record: &Document) -> MigrateResult<AppliedState> {
    let version = match record.get("version") {
        None | Some(Bson::Null) => None,
        Some(Bson::Int64(v)) => Some(*v),
        Some(Bson::Int32(v)) => Some(i64::from(*v)),
        Some(other) => {
            return Err(MigrateError::Database(format!(
                "unexpected version value in state record: {}",
                other
            )))
        }
    };
    let version = version
        .map(|v| {
            u64::try_from(v)
                .map(MigrationVersion::new)
                .map_err(|_| MigrateError::Database(format!("negative migration version {}", v)))
        })
        .transpose()?;

    Ok(AppliedState {
        version,
        dirty: record.get_bool("dirty").unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_directives_keeps_command_first() {
        let body = "- insert: products\n  documents:\n    - {name: lamp, price: 12}\n- drop: staging\n";
        let commands = parse_directives(body).unwrap();

        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].keys().next().map(String::as_str), Some("insert"));
        assert_eq!(commands[0].get_str("insert").unwrap(), "products");
        assert_eq!(commands[1].get_str("drop").unwrap(), "staging");
    }

    #[test]
    fn test_parse_json_directives() {
        let body = r#"[{"create": "reviews", "validator": {"$jsonSchema": {"bsonType": "object"}}}]"#;
        let commands = parse_directives(body).unwrap();

        assert_eq!(commands.len(), 1);
        assert!(commands[0].get_document("validator").is_ok());
    }

    #[test]
    fn test_parse_rejects_non_documents() {
        assert!(matches!(parse_directives("- drop\n"), Err(MigrateError::InvalidBody(_))));
        assert!(matches!(parse_directives("drop: users\n"), Err(MigrateError::InvalidBody(_))));
        assert!(parse_directives("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_validate_mongo_uri() {
        assert!(validate_mongo_uri("mongodb://localhost:27017/app").is_ok());
        assert!(validate_mongo_uri("mongodb+srv://cluster.example.net/app").is_ok());
        assert!(validate_mongo_uri("postgres://localhost/app")
            .unwrap_err()
            .is_connection());
    }

    #[tokio::test]
    async fn test_connect_rejects_foreign_scheme_without_dialing() {
        let err = match MongoDriver::connect("host=localhost dbname=app").await {
            Ok(_) => panic!("expected a connection error"),
            Err(e) => e,
        };
        assert!(matches!(err, MigrateError::Connection { engine: Engine::Mongo, .. }));
    }

    #[tokio::test]
    async fn test_closed_driver_refuses_commands() {
        // Building a client does not dial; nothing here needs a live server.
        let mut driver = match MongoDriver::connect("mongodb://localhost:27017/catalog").await {
            Ok(driver) => driver,
            Err(e) => panic!("client construction failed: {}", e),
        };
        assert_eq!(driver.database_name(), "catalog");
        driver.close().await.unwrap();

        assert!(driver.ping().await.unwrap_err().is_connection());
        assert!(driver
            .execute(r#"[{"drop": "products"}]"#)
            .await
            .unwrap_err()
            .is_connection());
        assert!(driver.load_state("mongo-catalog/schema").await.unwrap_err().is_connection());
    }

    #[test]
    fn test_state_document_roundtrip_with_null_version() {
        let record = state_to_document("mongo-app/schema", AppliedState::default()).unwrap();
        assert_eq!(record.get("version"), Some(&Bson::Null));
        assert_eq!(state_from_document(&record).unwrap(), AppliedState::default());

        let dirty = AppliedState::dirty(Some(MigrationVersion::new(4)));
        let record = state_to_document("mongo-app/schema", dirty).unwrap();
        assert_eq!(state_from_document(&record).unwrap(), dirty);
    }
}
