use dbshift_core::{CategorySelection, Engine, MigrateConfig, MigrationCategory, MigrationVersion, Namespace};
use dbshift_migrate::{
    run_engine_with, run_engines_with, AppliedState, EngineOutcome, MemoryConnector,
    MemoryDatabase, MigrateError, MigrationAction, RunRequest,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_entry(root: &Path, ns: &Namespace, version: u64, slug: &str, up: &str, down: &str) {
    let dir = ns.dir(root);
    fs::create_dir_all(&dir).unwrap();
    let ext = ns.engine.body_extension();
    fs::write(dir.join(format!("{:06}_{}.up.{}", version, slug, ext)), up).unwrap();
    fs::write(dir.join(format!("{:06}_{}.down.{}", version, slug, ext)), down).unwrap();
}

fn config(root: &Path) -> MigrateConfig {
    MigrateConfig::new()
        .with_postgres("postgres://localhost/shop")
        .with_mongo("mongodb://localhost/catalog")
        .with_migrations_dir(root)
}

fn shop_schema() -> Namespace {
    Namespace::new(Engine::Postgres, "shop", MigrationCategory::Schema)
}

fn catalog_schema() -> Namespace {
    Namespace::new(Engine::Mongo, "catalog", MigrationCategory::Schema)
}

fn up() -> RunRequest {
    RunRequest::new(CategorySelection::Schema, MigrationAction::Up)
}

#[tokio::test]
async fn connection_is_pinged_once_and_released() {
    let temp_dir = TempDir::new().unwrap();
    write_entry(temp_dir.path(), &shop_schema(), 1, "users", "CREATE users;", "DROP users;");
    let db = MemoryDatabase::new();
    let connector = MemoryConnector::new().with_database(Engine::Postgres, db.clone(), "shop");

    let outcome = run_engine_with(&connector, &config(temp_dir.path()), Engine::Postgres, &up())
        .await
        .unwrap();

    assert!(matches!(outcome, EngineOutcome::Completed { ref reports } if reports.len() == 1));
    assert_eq!(db.ping_count().await, 1);
    assert!(db.is_closed().await);
}

#[tokio::test]
async fn connection_is_released_when_a_migration_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_entry(temp_dir.path(), &shop_schema(), 1, "users", "CREATE users;", "DROP users;");
    write_entry(temp_dir.path(), &shop_schema(), 2, "orders", "CREATE BROKEN;", "DROP orders;");
    let db = MemoryDatabase::new();
    db.fail_on("BROKEN").await;
    let connector = MemoryConnector::new().with_database(Engine::Postgres, db.clone(), "shop");

    let err = run_engine_with(&connector, &config(temp_dir.path()), Engine::Postgres, &up())
        .await
        .unwrap_err();

    assert!(matches!(err, MigrateError::Execution { .. }));
    assert!(db.is_closed().await);
    assert_eq!(
        db.state(&shop_schema().key()).await,
        Some(AppliedState::clean(Some(MigrationVersion::new(1))))
    );
}

#[tokio::test]
async fn failed_ping_is_a_connection_error_and_closes() {
    let temp_dir = TempDir::new().unwrap();
    let db = MemoryDatabase::new();
    db.fail_ping().await;
    let connector = MemoryConnector::new().with_database(Engine::Mongo, db.clone(), "catalog");

    let err = run_engine_with(&connector, &config(temp_dir.path()), Engine::Mongo, &up())
        .await
        .unwrap_err();

    assert!(matches!(err, MigrateError::Connection { engine: Engine::Mongo, .. }));
    assert_eq!(db.ping_count().await, 1);
    assert!(db.is_closed().await);
    assert!(db.journal().await.is_empty());
}

#[tokio::test]
async fn failing_engine_does_not_stop_the_other() {
    let temp_dir = TempDir::new().unwrap();
    write_entry(temp_dir.path(), &shop_schema(), 1, "users", "CREATE BROKEN;", "DROP users;");
    write_entry(
        temp_dir.path(),
        &catalog_schema(),
        1,
        "products",
        r#"[{"create": "products"}]"#,
        r#"[{"drop": "products"}]"#,
    );

    let pg = MemoryDatabase::new();
    pg.fail_on("BROKEN").await;
    let mongo = MemoryDatabase::new();
    let connector = MemoryConnector::new()
        .with_database(Engine::Postgres, pg.clone(), "shop")
        .with_database(Engine::Mongo, mongo.clone(), "catalog");

    let runs = run_engines_with(&connector, &config(temp_dir.path()), &Engine::ALL, &up()).await;

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].engine, Engine::Postgres);
    assert!(runs[0].is_failure());
    assert_eq!(runs[1].engine, Engine::Mongo);
    assert!(!runs[1].is_failure());
    assert!(runs.iter().any(|run| run.is_failure()));

    assert_eq!(
        mongo.state(&catalog_schema().key()).await,
        Some(AppliedState::clean(Some(MigrationVersion::new(1))))
    );
    assert!(pg.is_closed().await);
    assert!(mongo.is_closed().await);
}

#[tokio::test]
async fn unconfigured_engine_is_skipped_without_connecting() {
    let temp_dir = TempDir::new().unwrap();
    let db = MemoryDatabase::new();
    let connector = MemoryConnector::new().with_database(Engine::Mongo, db.clone(), "catalog");
    let config = MigrateConfig::new().with_migrations_dir(temp_dir.path());

    let runs = run_engines_with(&connector, &config, &Engine::ALL, &up()).await;

    assert!(runs.iter().all(|run| matches!(run.result, Ok(EngineOutcome::Skipped { .. }))));
    assert_eq!(db.ping_count().await, 0);
}
