use anyhow::{Context, Result};
use dbshift_codegen::{GeneratedMigration, MigrationGenerator};
use dbshift_core::{EnvConfig, MigrateConfig, SchemaSpec};
use std::path::{Path, PathBuf};

/// Render a schema description into a new up/down pair
pub fn run(schema_path: &Path, migrations_dir: Option<PathBuf>) -> Result<()> {
    let root = match migrations_dir {
        Some(dir) => dir,
        None => MigrateConfig::from_env()?.migrations_dir,
    };

    let spec = SchemaSpec::from_file(schema_path)
        .with_context(|| format!("failed to read schema description {}", schema_path.display()))?;
    let generated = generate(&root, &spec)?;

    println!("Created migration files:");
    println!("  {}", generated.up_path.display());
    println!("  {}", generated.down_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Review the generated migration files");
    println!(
        "  2. Run: dbshift migrate --db {} --type {}",
        generated.namespace.engine, generated.namespace.category
    );
    Ok(())
}

fn generate(root: &Path, spec: &SchemaSpec) -> Result<GeneratedMigration> {
    MigrationGenerator::new(root)
        .generate(spec)
        .with_context(|| format!("failed to generate migration for {}", spec.namespace()))
}
