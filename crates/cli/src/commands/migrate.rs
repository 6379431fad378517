use anyhow::{bail, Result};
use dbshift_core::{CategorySelection, Engine, EnvConfig, MigrateConfig, MigrationVersion};
use dbshift_migrate::{run_engines, EngineRun, MigrationAction, RunRequest};

use crate::{ActionArg, DbTarget, MigrateArgs, TypeTarget};

/// Run the requested action on every selected engine.
///
/// Engines are isolated: a failure on one is logged and the next still runs.
pub async fn run(args: MigrateArgs) -> Result<()> {
    let mut config = MigrateConfig::from_env()?;
    if let Some(dir) = args.migrations_dir.clone() {
        config = config.with_migrations_dir(dir);
    }
    for (field, source) in config.config_sources() {
        tracing::debug!(field = %field, source = %source, "configuration");
    }

    let request = build_request(&args);
    let runs = run_engines(&config, &engines(args.db), &request).await;
    summarize(&runs)
}

/// Fail when any engine failed; outcomes were logged as they happened
fn summarize(runs: &[EngineRun]) -> Result<()> {
    let failed: Vec<String> = runs
        .iter()
        .filter(|run| run.is_failure())
        .map(|run| run.engine.to_string())
        .collect();
    if !failed.is_empty() {
        bail!("migrations failed for: {}", failed.join(", "));
    }
    tracing::info!("migrations completed");
    Ok(())
}

fn build_request(args: &MigrateArgs) -> RunRequest {
    let action = match args.action {
        ActionArg::Up => MigrationAction::Up,
        ActionArg::Down => MigrationAction::Down { steps: args.steps },
        ActionArg::Version => MigrationAction::Version,
        ActionArg::Force => MigrationAction::Force {
            version: MigrationVersion::new(args.force_version.unwrap_or(0)),
        },
    };
    let categories = match args.migration_type {
        TypeTarget::Schema => CategorySelection::Schema,
        TypeTarget::Seed => CategorySelection::Seed,
        TypeTarget::All => CategorySelection::All,
    };

    let request = RunRequest::new(categories, action);
    match &args.database {
        Some(name) => request.with_database(name.as_str()),
        None => request,
    }
}

fn engines(target: DbTarget) -> Vec<Engine> {
    match target {
        DbTarget::Postgres => vec![Engine::Postgres],
        DbTarget::Mongo => vec![Engine::Mongo],
        DbTarget::All => Engine::ALL.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbshift_migrate::{EngineOutcome, MigrateError};

    fn args(action: ActionArg) -> MigrateArgs {
        MigrateArgs {
            db: DbTarget::All,
            migration_type: TypeTarget::All,
            action,
            steps: 2,
            force_version: Some(4),
            database: Some("shop".to_string()),
            migrations_dir: None,
        }
    }

    #[test]
    fn test_build_request() {
        let request = build_request(&args(ActionArg::Down));
        assert_eq!(request.action, MigrationAction::Down { steps: 2 });
        assert_eq!(request.categories, CategorySelection::All);
        assert_eq!(request.database.as_deref(), Some("shop"));

        let request = build_request(&args(ActionArg::Force));
        assert_eq!(
            request.action,
            MigrationAction::Force {
                version: MigrationVersion::new(4)
            }
        );
    }

    #[test]
    fn test_any_engine_failure_fails_the_run() {
        let runs = vec![
            EngineRun {
                engine: Engine::Postgres,
                result: Err(MigrateError::connection(Engine::Postgres, "refused")),
            },
            EngineRun {
                engine: Engine::Mongo,
                result: Ok(EngineOutcome::Completed { reports: Vec::new() }),
            },
        ];
        let err = summarize(&runs).unwrap_err();
        assert!(err.to_string().contains("postgres"));
        assert!(!err.to_string().contains("mongo"));

        let skipped = vec![EngineRun {
            engine: Engine::Mongo,
            result: Ok(EngineOutcome::Skipped { variable: "MONGO_URI" }),
        }];
        assert!(summarize(&skipped).is_ok());
    }

    #[test]
    fn test_engine_selection_order() {
        assert_eq!(engines(DbTarget::All), vec![Engine::Postgres, Engine::Mongo]);
        assert_eq!(engines(DbTarget::Mongo), vec![Engine::Mongo]);
    }
}
