mod commands;
mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use logging::{init_logging, LoggingConfig};

#[derive(Parser)]
#[command(name = "dbshift")]
#[command(version, about = "Versioned schema and seed migrations for PostgreSQL and MongoDB")]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an up/down migration pair from a schema description
    Generate {
        /// Path to the schema description (YAML)
        schema: PathBuf,

        /// Root directory holding migration namespaces
        #[arg(long)]
        migrations_dir: Option<PathBuf>,
    },

    /// Apply, revert or inspect migrations
    Migrate(MigrateArgs),
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Target database engine
    #[arg(long, value_enum, default_value_t = DbTarget::All)]
    pub db: DbTarget,

    /// Migration category
    #[arg(long = "type", value_enum, default_value_t = TypeTarget::Schema)]
    pub migration_type: TypeTarget,

    /// Action to run
    #[arg(long, value_enum, default_value_t = ActionArg::Up)]
    pub action: ActionArg,

    /// Number of entries to revert with `down`; 0 reverts all
    #[arg(long, default_value_t = 0)]
    pub steps: u32,

    /// Version recorded by `force`; 0 means nothing applied
    #[arg(long, required_if_eq("action", "force"))]
    pub force_version: Option<u64>,

    /// Database name used to resolve namespaces instead of the connection's
    #[arg(long)]
    pub database: Option<String>,

    /// Root directory holding migration namespaces
    #[arg(long)]
    pub migrations_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DbTarget {
    Postgres,
    Mongo,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TypeTarget {
    Schema,
    Seed,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Up,
    Down,
    Version,
    Force,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_flags(cli.verbose, cli.log_format == LogFormat::Json);
    if let Err(e) = init_logging(&logging) {
        eprintln!("failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Commands::Generate {
            schema,
            migrations_dir,
        } => commands::generate::run(&schema, migrations_dir),
        Commands::Migrate(args) => commands::migrate::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
